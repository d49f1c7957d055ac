use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Author, Media, NewAuthor, NewMedia, NewPost, Post};

/// Durable state shared by discovery, dedup and the downloader.
///
/// Lookups return `Ok(None)` when nothing matches; `Err` is reserved for
/// store failures. Implementations must apply writes in the order they are
/// issued.
#[async_trait]
pub trait Store: Send + Sync {
    /// Returns `true` when a new row was written.
    async fn insert_author_if_absent(&self, author: NewAuthor) -> Result<bool>;

    async fn get_author(&self, id: &str) -> Result<Option<Author>>;

    async fn get_post_by_url(&self, url: &str) -> Result<Option<Post>>;

    async fn get_post(&self, id: i64) -> Result<Option<Post>>;

    /// Inserts with a zero media count and returns the assigned id.
    async fn insert_post(&self, post: NewPost) -> Result<i64>;

    async fn get_media(&self, post_id: i64, url: &str) -> Result<Option<Media>>;

    async fn count_media(&self, post_id: i64) -> Result<i64>;

    async fn insert_media(&self, media: NewMedia) -> Result<i64>;

    async fn increment_cached_media_count(&self, post_id: i64) -> Result<()>;

    /// Raise the post's media count to its number of Media rows if it lags
    /// behind. Never lowers it. Returns `true` when the count changed.
    async fn catch_up_cached_media_count(&self, post_id: i64) -> Result<bool>;
}
