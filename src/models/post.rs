use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub author_id: String,
    pub url: String,
    pub description: Option<String>,
    pub timestamp: Option<String>,
    /// Paywalled; carries no extractable media.
    pub locked: bool,
    /// Media rows persisted for this post. Only ever grows.
    pub cached_media_count: i64,
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// A prior run recorded the post but never downloaded anything from it.
    pub fn is_incomplete(&self) -> bool {
        !self.locked && self.cached_media_count == 0
    }
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub author_id: String,
    pub url: String,
    pub description: String,
    pub timestamp: Option<String>,
    pub locked: bool,
}
