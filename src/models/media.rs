use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Media {
    pub id: i64,
    pub post_id: i64,
    /// Canonical source URL, the dedup key within a post.
    pub url: String,
    pub file_path: String,
    pub downloaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMedia {
    pub post_id: i64,
    pub url: String,
    pub file_path: String,
}
