//! End-to-end run: for every tracked author, walk the media feed, classify
//! each unseen post and download whatever is missing.
//!
//! Everything runs sequentially on one page. A failure is contained to the
//! post (or, for discovery, the author) it happened in.

use tracing::{error, info, warn};

use crate::config::Config;
use crate::db::Store;
use crate::error::{AppError, Result};
use crate::media::{DedupDownloader, MediaFetcher, SyncOutcome};
use crate::models::{Author, NewAuthor};
use crate::page::{PageCapability, WaitPolicy};
use crate::scrape::{PostClassifier, PostDiscovery};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    pub authors: usize,
    pub posts_processed: usize,
    pub posts_failed: usize,
    pub media_downloaded: usize,
}

pub struct Pipeline<'a> {
    page: &'a dyn PageCapability,
    store: &'a dyn Store,
    fetcher: &'a dyn MediaFetcher,
    config: &'a Config,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        page: &'a dyn PageCapability,
        store: &'a dyn Store,
        fetcher: &'a dyn MediaFetcher,
        config: &'a Config,
    ) -> Self {
        Self {
            page,
            store,
            fetcher,
            config,
        }
    }

    /// Seed the Author table from the configured list. Existing rows are
    /// left untouched.
    pub async fn register_authors(&self) {
        for tracked in &self.config.authors {
            let author = NewAuthor {
                id: tracked.id.clone(),
                name: tracked.name.clone(),
                url: self.config.author_url(&tracked.id),
            };
            match self.store.insert_author_if_absent(author).await {
                Ok(true) => info!("Tracking new author {}", tracked.id),
                Ok(false) => {}
                Err(e) => error!("Failed to register author {}: {}", tracked.id, e),
            }
        }
    }

    pub async fn run(&self) -> RunReport {
        self.register_authors().await;

        let mut report = RunReport::default();
        for tracked in &self.config.authors {
            let author = match self.store.get_author(&tracked.id).await {
                Ok(Some(author)) => author,
                Ok(None) => {
                    warn!("Author {} is not in the store, skipping", tracked.id);
                    continue;
                }
                Err(e) => {
                    error!("Failed to load author {}: {}", tracked.id, e);
                    continue;
                }
            };

            report.authors += 1;
            self.run_author(&author, &mut report).await;
        }

        report
    }

    async fn run_author(&self, author: &Author, report: &mut RunReport) {
        info!("Processing {} ({})", author.name, author.id);

        let discovery = PostDiscovery::new(self.page, self.store, self.config);
        let posts = match discovery.discover(author).await {
            Ok(posts) => posts,
            Err(e) => {
                error!("Discovery failed for {}: {}", author.id, e);
                return;
            }
        };

        for post in posts {
            match self.process_post(author, &post.url).await {
                Ok(outcome) => {
                    report.posts_processed += 1;
                    report.media_downloaded += outcome.downloaded;
                }
                Err(e) => {
                    report.posts_failed += 1;
                    error!("Aborted {}: {}", post.url, e);
                }
            }
        }
    }

    /// Render one post, classify it and bring its media up to date.
    pub async fn process_post(&self, author: &Author, post_url: &str) -> Result<SyncOutcome> {
        info!("Scraping {}...", post_url);

        self.page
            .navigate(post_url, WaitPolicy::DomContentLoaded)
            .await?;
        if !self
            .page
            .wait_for_element(&self.config.selectors.post_wrapper, self.config.timing.page_ready())
            .await?
        {
            return Err(AppError::Page(format!("Post did not render: {}", post_url)));
        }

        let classifier = PostClassifier::new(self.page, &self.config.selectors, &self.config.timing);
        let classified = classifier.classify(post_url).await?;

        let downloader = DedupDownloader::new(self.store, self.fetcher, &self.config.downloads_dir);
        let outcome = downloader.sync_post(author, post_url, &classified).await?;

        if outcome.downloaded > 0 {
            info!(
                "Saved {} new file(s) for {} ({} already stored)",
                outcome.downloaded, post_url, outcome.already_present
            );
        }
        Ok(outcome)
    }
}
