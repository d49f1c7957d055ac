use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AppError, Result};

const APP_DIR: &str = "creator-archiver";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_downloads_dir")]
    pub downloads_dir: PathBuf,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub authors: Vec<TrackedAuthor>,

    pub credentials: Option<Credentials>,

    #[serde(default)]
    pub browser: BrowserSettings,

    #[serde(default)]
    pub timing: Timing,

    #[serde(default)]
    pub selectors: Selectors,
}

/// An entry of the static author list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedAuthor {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub headless: bool,
    pub chrome_path: Option<String>,
    pub user_agent: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            // The CAPTCHA during login has to be solved by hand.
            headless: false,
            chrome_path: None,
            user_agent:
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:90.0) Gecko/20100101 Firefox/90.0"
                    .to_string(),
            viewport_width: 1280,
            viewport_height: 720,
        }
    }
}

/// Timeouts and intervals, all in milliseconds except the login deadline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    pub locked_probe_ms: u64,
    pub video_probe_ms: u64,
    pub video_source_ms: u64,
    pub image_probe_ms: u64,
    pub page_ready_ms: u64,
    pub scroll_poll_ms: u64,
    pub max_scroll_rounds: u32,
    pub download_timeout_secs: u64,
    pub login_timeout_secs: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            locked_probe_ms: 100,
            video_probe_ms: 100,
            video_source_ms: 2000,
            image_probe_ms: 0,
            page_ready_ms: 30_000,
            scroll_poll_ms: 1000,
            max_scroll_rounds: 10_000,
            download_timeout_secs: 600,
            login_timeout_secs: 4 * 60,
        }
    }
}

impl Timing {
    pub fn locked_probe(&self) -> Duration {
        Duration::from_millis(self.locked_probe_ms)
    }

    pub fn video_probe(&self) -> Duration {
        Duration::from_millis(self.video_probe_ms)
    }

    pub fn video_source(&self) -> Duration {
        Duration::from_millis(self.video_source_ms)
    }

    pub fn image_probe(&self) -> Duration {
        Duration::from_millis(self.image_probe_ms)
    }

    pub fn page_ready(&self) -> Duration {
        Duration::from_millis(self.page_ready_ms)
    }

    pub fn scroll_poll(&self) -> Duration {
        Duration::from_millis(self.scroll_poll_ms)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.login_timeout_secs)
    }
}

/// CSS selectors for the site's markup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Selectors {
    pub login_form: String,
    pub login_username: String,
    pub login_password: String,
    pub login_submit: String,
    pub feed_container: String,
    pub feed_post: String,
    pub post_wrapper: String,
    pub locked_marker: String,
    pub video_play: String,
    pub video_source: String,
    pub gallery: String,
    pub gallery_image: String,
    pub single_image: String,
    pub description: String,
    pub timestamp: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            login_form: "form.b-loginreg__form".to_string(),
            login_username: r#"input[name="email"]"#.to_string(),
            login_password: r#"input[name="password"]"#.to_string(),
            login_submit: r#"button[type="submit"]"#.to_string(),
            feed_container: ".user_posts".to_string(),
            feed_post: ".user_posts .b-post".to_string(),
            post_wrapper: ".b-post__wrapper".to_string(),
            locked_marker: ".post-purchase".to_string(),
            video_play: ".video-js button".to_string(),
            video_source: r#"video > source[label="720"]"#.to_string(),
            gallery: ".swiper-wrapper".to_string(),
            gallery_image: r#"img[draggable="false"]"#.to_string(),
            single_image: ".img-responsive".to_string(),
            description: ".b-post__text-el".to_string(),
            timestamp: ".b-post__date > span".to_string(),
        }
    }
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR);
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("storage.db").to_string_lossy().to_string()
}

fn default_downloads_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_base_url() -> String {
    "https://onlyfans.com".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            downloads_dir: default_downloads_dir(),
            base_url: default_base_url(),
            authors: Vec::new(),
            credentials: None,
            browser: BrowserSettings::default(),
            timing: Timing::default(),
            selectors: Selectors::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.toml")
    }

    fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn author_url(&self, author_id: &str) -> String {
        format!("{}/{}", self.base(), author_id)
    }

    /// The author's media feed, oldest post first.
    pub fn media_feed_url(&self, author_id: &str) -> String {
        format!("{}/{}/media?order=publish_date_asc", self.base(), author_id)
    }

    pub fn post_url(&self, post_id: &str, author_id: &str) -> String {
        format!("{}/{}/{}", self.base(), post_id, author_id)
    }

    pub fn login_url(&self) -> String {
        self.base().to_string()
    }
}
