pub mod downloader;
pub mod fetcher;
pub mod naming;
pub mod resolver;

pub use downloader::{DedupDownloader, SyncOutcome};
pub use fetcher::{HttpFetcher, MediaFetcher};
