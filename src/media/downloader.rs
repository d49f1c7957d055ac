use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::models::{Author, NewMedia, NewPost};
use crate::scrape::ClassifiedPost;

use super::fetcher::MediaFetcher;
use super::naming::media_path;
use super::resolver::canonicalize;

/// A source that has no Media row yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingMedia {
    /// Position in the post's full source list.
    pub index: usize,
    pub source: String,
    pub canonical: String,
}

/// What a post still needs, and how much of it is already on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaPlan {
    pub missing: Vec<MissingMedia>,
    pub present: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    pub post_id: i64,
    pub already_present: usize,
    pub downloaded: usize,
}

/// Brings a post's persisted media in line with its classified sources.
pub struct DedupDownloader<'a> {
    store: &'a dyn Store,
    fetcher: &'a dyn MediaFetcher,
    downloads_dir: &'a Path,
}

impl<'a> DedupDownloader<'a> {
    pub fn new(store: &'a dyn Store, fetcher: &'a dyn MediaFetcher, downloads_dir: &'a Path) -> Self {
        Self {
            store,
            fetcher,
            downloads_dir,
        }
    }

    /// Record the post if needed, then download every source that has no
    /// Media row, one at a time.
    ///
    /// A counter left behind its Media rows by an earlier run is caught up
    /// first. Each success is persisted (Media row, then counter) before the
    /// next fetch starts. The first failed fetch aborts the post; items saved
    /// before it stay saved.
    pub async fn sync_post(
        &self,
        author: &Author,
        post_url: &str,
        classified: &ClassifiedPost,
    ) -> Result<SyncOutcome> {
        let post_id = self.ensure_post(author, post_url, classified).await?;
        let plan = self.plan(post_id, &classified.sources).await?;

        // A Media row whose increment never landed leaves the counter behind.
        if self.store.catch_up_cached_media_count(post_id).await? {
            warn!("Media count for {} lagged behind its rows, caught up", post_url);
        }

        let mut outcome = SyncOutcome {
            post_id,
            already_present: plan.present,
            downloaded: 0,
        };

        if plan.missing.is_empty() {
            debug!("Nothing missing for {}", post_url);
            return Ok(outcome);
        }

        for item in &plan.missing {
            let path = media_path(
                self.downloads_dir,
                &author.id,
                &classified.description,
                &item.source,
                item.index,
            );
            self.download(&item.source, &path).await?;

            self.store
                .insert_media(NewMedia {
                    post_id,
                    url: item.canonical.clone(),
                    file_path: path.to_string_lossy().to_string(),
                })
                .await?;
            self.store.increment_cached_media_count(post_id).await?;

            outcome.downloaded += 1;
        }

        Ok(outcome)
    }

    async fn ensure_post(
        &self,
        author: &Author,
        post_url: &str,
        classified: &ClassifiedPost,
    ) -> Result<i64> {
        if let Some(post) = self.store.get_post_by_url(post_url).await? {
            return Ok(post.id);
        }

        let id = self
            .store
            .insert_post(NewPost {
                author_id: author.id.clone(),
                url: post_url.to_string(),
                description: classified.description.clone(),
                timestamp: classified.timestamp.clone(),
                locked: classified.locked,
            })
            .await?;
        debug!("Recorded post {} as #{}", post_url, id);
        Ok(id)
    }

    /// Split `sources` into those without a Media row for `post_id` (in
    /// source order) and a count of those already stored.
    pub async fn plan(&self, post_id: i64, sources: &[String]) -> Result<MediaPlan> {
        let mut seen = HashSet::new();
        let mut plan = MediaPlan::default();

        for (index, source) in sources.iter().enumerate() {
            let canonical = match canonicalize(source) {
                Ok(canonical) => canonical,
                Err(e) => {
                    warn!("Skipping unusable source {:?}: {}", source, e);
                    continue;
                }
            };

            if !seen.insert(canonical.clone()) {
                continue;
            }

            if self.store.get_media(post_id, &canonical).await?.is_some() {
                plan.present += 1;
                continue;
            }

            plan.missing.push(MissingMedia {
                index,
                source: source.clone(),
                canonical,
            });
        }

        Ok(plan)
    }

    async fn download(&self, source: &str, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        info!(
            "Downloading to {:?}...",
            path.file_name().unwrap_or_default()
        );

        if let Err(e) = self.fetcher.fetch(source, path).await {
            if let Err(rm) = tokio::fs::remove_file(path).await {
                if rm.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to remove partial file {}: {}", path.display(), rm);
                }
            }
            return Err(AppError::Download(format!("{}: {}", source, e)));
        }

        Ok(())
    }
}
