pub mod classifier;
pub mod discovery;

pub use classifier::{ClassifiedPost, ContentKind, PostClassifier};
pub use discovery::{DiscoveredPost, PostDiscovery};
