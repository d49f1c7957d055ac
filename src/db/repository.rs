use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::{Author, Media, NewAuthor, NewMedia, NewPost, Post};

use super::schema::SCHEMA;
use super::store::Store;

/// SQLite-backed [`Store`].
///
/// All statements go through one `tokio_rusqlite` connection, which runs
/// them on a single background thread in submission order.
pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;
        Self::with_connection(conn).await
    }

    #[cfg(test)]
    pub async fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::with_connection(conn).await
    }

    async fn with_connection(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }
}

#[async_trait]
impl Store for Repository {
    // Author operations

    async fn insert_author_if_absent(&self, author: NewAuthor) -> Result<bool> {
        let inserted = self
            .conn
            .call(move |conn| {
                let changed = conn.execute(
                    "INSERT OR IGNORE INTO Author (id, name, url) VALUES (?1, ?2, ?3)",
                    params![author.id, author.name, author.url],
                )?;
                Ok(changed > 0)
            })
            .await?;
        Ok(inserted)
    }

    async fn get_author(&self, id: &str) -> Result<Option<Author>> {
        let id = id.to_string();
        let author = self
            .conn
            .call(move |conn| {
                let author = conn
                    .query_row(
                        "SELECT id, name, url FROM Author WHERE id = ?1",
                        params![id],
                        author_from_row,
                    )
                    .optional()?;
                Ok(author)
            })
            .await?;
        Ok(author)
    }

    // Post operations

    async fn get_post_by_url(&self, url: &str) -> Result<Option<Post>> {
        let url = url.to_string();
        let post = self
            .conn
            .call(move |conn| {
                let post = conn
                    .query_row(
                        r#"SELECT id, author_id, url, description, timestamp, locked,
                                  cache_media_count, created_at
                           FROM Post WHERE url = ?1"#,
                        params![url],
                        post_from_row,
                    )
                    .optional()?;
                Ok(post)
            })
            .await?;
        Ok(post)
    }

    async fn get_post(&self, id: i64) -> Result<Option<Post>> {
        let post = self
            .conn
            .call(move |conn| {
                let post = conn
                    .query_row(
                        r#"SELECT id, author_id, url, description, timestamp, locked,
                                  cache_media_count, created_at
                           FROM Post WHERE id = ?1"#,
                        params![id],
                        post_from_row,
                    )
                    .optional()?;
                Ok(post)
            })
            .await?;
        Ok(post)
    }

    async fn insert_post(&self, post: NewPost) -> Result<i64> {
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO Post (author_id, url, description, timestamp, locked, cache_media_count)
                       VALUES (?1, ?2, ?3, ?4, ?5, 0)"#,
                    params![
                        post.author_id,
                        post.url,
                        post.description,
                        post.timestamp,
                        post.locked,
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }

    async fn increment_cached_media_count(&self, post_id: i64) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE Post SET cache_media_count = cache_media_count + 1 WHERE id = ?1",
                    params![post_id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn catch_up_cached_media_count(&self, post_id: i64) -> Result<bool> {
        let changed = self
            .conn
            .call(move |conn| {
                let changed = conn.execute(
                    r#"UPDATE Post
                       SET cache_media_count = (SELECT COUNT(*) FROM Media WHERE post_id = ?1)
                       WHERE id = ?1
                         AND cache_media_count < (SELECT COUNT(*) FROM Media WHERE post_id = ?1)"#,
                    params![post_id],
                )?;
                Ok(changed > 0)
            })
            .await?;
        Ok(changed)
    }

    // Media operations

    async fn get_media(&self, post_id: i64, url: &str) -> Result<Option<Media>> {
        let url = url.to_string();
        let media = self
            .conn
            .call(move |conn| {
                let media = conn
                    .query_row(
                        r#"SELECT id, post_id, url, file_path, downloaded_at
                           FROM Media WHERE post_id = ?1 AND url = ?2"#,
                        params![post_id, url],
                        media_from_row,
                    )
                    .optional()?;
                Ok(media)
            })
            .await?;
        Ok(media)
    }

    async fn count_media(&self, post_id: i64) -> Result<i64> {
        let count = self
            .conn
            .call(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM Media WHERE post_id = ?1",
                    params![post_id],
                    |row| row.get(0),
                )?;
                Ok(count)
            })
            .await?;
        Ok(count)
    }

    async fn insert_media(&self, media: NewMedia) -> Result<i64> {
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO Media (post_id, url, file_path) VALUES (?1, ?2, ?3)",
                    params![media.post_id, media.url, media.file_path],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // Try RFC3339 first (e.g., "2026-01-11T12:34:56+00:00")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Try SQLite datetime format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn author_from_row(row: &Row) -> rusqlite::Result<Author> {
    Ok(Author {
        id: row.get(0)?,
        name: row.get(1)?,
        url: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
    })
}

fn post_from_row(row: &Row) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        author_id: row.get(1)?,
        url: row.get(2)?,
        description: row.get(3)?,
        timestamp: row.get(4)?,
        locked: row.get::<_, i64>(5)? != 0,
        cached_media_count: row.get(6)?,
        created_at: row
            .get::<_, String>(7)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
    })
}

fn media_from_row(row: &Row) -> rusqlite::Result<Media> {
    Ok(Media {
        id: row.get(0)?,
        post_id: row.get(1)?,
        url: row.get(2)?,
        file_path: row.get(3)?,
        downloaded_at: row
            .get::<_, String>(4)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
    })
}
