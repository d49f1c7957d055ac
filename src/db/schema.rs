pub const SCHEMA: &str = r#"
-- tracked authors, seeded from the config file
CREATE TABLE IF NOT EXISTS Author (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    url TEXT
);

-- posts encountered while walking an author's media feed
CREATE TABLE IF NOT EXISTS Post (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    author_id TEXT NOT NULL,
    url TEXT NOT NULL UNIQUE,
    description TEXT,
    timestamp TEXT,
    locked INTEGER NOT NULL DEFAULT 0,
    cache_media_count INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_post_author_id ON Post(author_id);

-- one row per downloaded file; (post_id, url) is unique by construction
CREATE TABLE IF NOT EXISTS Media (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    post_id INTEGER NOT NULL,
    url TEXT NOT NULL,
    file_path TEXT NOT NULL,
    downloaded_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_media_post_url ON Media(post_id, url);
"#;
