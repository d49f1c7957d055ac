use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::db::Store;
use crate::error::{AppError, Result};
use crate::models::{Author, Post};
use crate::page::{script, PageCapability, WaitPolicy};

static POST_ID_RE: OnceLock<Option<Regex>> = OnceLock::new();

/// A feed entry that still needs to be scraped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredPost {
    pub post_id: String,
    pub url: String,
}

/// Whether a post seen in the feed has to be (re)processed, given what the
/// store knows about it.
///
/// Unknown posts are always selected. A known post is retried only if it is
/// unlocked and nothing was ever downloaded for it.
pub fn needs_processing(existing: Option<&Post>) -> bool {
    existing.map_or(true, Post::is_incomplete)
}

/// Extract the post number from a feed element id such as `postId_12345`.
pub fn parse_post_id(element_id: &str) -> Option<&str> {
    let re = POST_ID_RE
        .get_or_init(|| Regex::new(r"(?i)postId_(.+)").ok())
        .as_ref()?;
    re.captures(element_id)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().trim())
        .filter(|id| !id.is_empty())
}

pub struct PostDiscovery<'a> {
    page: &'a dyn PageCapability,
    store: &'a dyn Store,
    config: &'a Config,
}

impl<'a> PostDiscovery<'a> {
    pub fn new(page: &'a dyn PageCapability, store: &'a dyn Store, config: &'a Config) -> Self {
        Self {
            page,
            store,
            config,
        }
    }

    /// Posts of `author` that need processing, oldest first.
    pub async fn discover(&self, author: &Author) -> Result<Vec<DiscoveredPost>> {
        let feed_url = self.config.media_feed_url(&author.id);
        info!("Loading media feed {}", feed_url);

        self.page.navigate(&feed_url, WaitPolicy::NetworkIdle).await?;
        let selectors = &self.config.selectors;
        if !self
            .page
            .wait_for_element(&selectors.feed_container, self.config.timing.page_ready())
            .await?
        {
            return Err(AppError::Page(format!("Media feed did not render for {}", author.id)));
        }

        self.scroll_to_end().await?;

        let ids = self.page.evaluate(&script::element_ids(&selectors.feed_post)).await?;
        let post_ids = collect_post_ids(ids);
        debug!("Feed for {} lists {} posts", author.id, post_ids.len());

        let mut selected = Vec::new();
        for post_id in post_ids {
            let url = self.config.post_url(&post_id, &author.id);
            match self.store.get_post_by_url(&url).await {
                Ok(existing) => {
                    if needs_processing(existing.as_ref()) {
                        selected.push(DiscoveredPost { post_id, url });
                    }
                }
                Err(e) => {
                    warn!("Skipping {}: lookup failed: {}", url, e);
                }
            }
        }

        info!("{} unseen post(s) for {}", selected.len(), author.id);
        Ok(selected)
    }

    /// Keep scrolling until the document stops growing.
    async fn scroll_to_end(&self) -> Result<()> {
        let interval = self.config.timing.scroll_poll();
        let mut last_height = self.scroll_once().await?;

        for _ in 0..self.config.timing.max_scroll_rounds {
            tokio::time::sleep(interval).await;
            let height = self.scroll_once().await?;
            if height <= last_height {
                return Ok(());
            }
            last_height = height;
        }

        warn!("Gave up scrolling after {} rounds", self.config.timing.max_scroll_rounds);
        Ok(())
    }

    async fn scroll_once(&self) -> Result<u64> {
        let value = self.page.evaluate(&script::scroll_and_measure()).await?;
        Ok(value.as_f64().map(|h| h.max(0.0) as u64).unwrap_or(0))
    }
}

/// Post ids from the evaluated list of element ids, in order, without repeats.
fn collect_post_ids(value: Value) -> Vec<String> {
    let Value::Array(items) = value else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    items
        .iter()
        .filter_map(Value::as_str)
        .filter_map(parse_post_id)
        .filter(|id| seen.insert(id.to_string()))
        .map(str::to_string)
        .collect()
}
