//! [`PageCapability`] backed by a Chromium instance driven over CDP.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::BrowserSettings;
use crate::error::{AppError, Result};

use super::{script, PageCapability, WaitPolicy};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Extra settle time after navigation when the caller asked for an idle network.
const NETWORK_IDLE_SETTLE: Duration = Duration::from_millis(500);

pub struct ChromePage {
    browser: Mutex<Browser>,
    page: Page,
    handler: JoinHandle<()>,
}

impl ChromePage {
    pub async fn launch(settings: &BrowserSettings) -> Result<Self> {
        info!("Launching browser (headless: {})", settings.headless);

        let mut builder = BrowserConfig::builder()
            .window_size(settings.viewport_width, settings.viewport_height)
            .arg(format!("--user-agent={}", settings.user_agent))
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check");

        if !settings.headless {
            builder = builder.with_head();
        }

        if let Some(ref chrome_path) = settings.chrome_path {
            builder = builder.chrome_executable(chrome_path);
        }

        let browser_config = builder
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(browser_config).await?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler error: {e}");
                }
            }
        });

        let page = browser.new_page("about:blank").await?;

        Ok(Self {
            browser: Mutex::new(browser),
            page,
            handler,
        })
    }

    pub async fn close(self) {
        let mut browser = self.browser.into_inner();
        if let Err(e) = browser.close().await {
            warn!("Failed to close browser: {e}");
        }
        self.handler.abort();
    }
}

#[async_trait]
impl PageCapability for ChromePage {
    async fn navigate(&self, url: &str, wait: WaitPolicy) -> Result<()> {
        debug!(url = %url, ?wait, "Navigating");
        self.page.goto(url).await?;

        if wait == WaitPolicy::NetworkIdle {
            self.page.wait_for_navigation().await?;
            tokio::time::sleep(NETWORK_IDLE_SETTLE).await;
        }

        Ok(())
    }

    /// A missing node reads as `false`; CDP failures are returned as `Err`.
    async fn wait_for_element(&self, selector: &str, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        let probe = script::exists(selector);

        loop {
            if self.evaluate(&probe).await?.as_bool().unwrap_or(false) {
                return Ok(true);
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    async fn evaluate(&self, script: &str) -> Result<Value> {
        let result = self.page.evaluate(script).await?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|e| AppError::Page(format!("No element to click for {selector}: {e}")))?;
        element.click().await?;
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|e| AppError::Page(format!("No input for {selector}: {e}")))?;
        element.click().await?;
        element.type_str(text).await?;
        Ok(())
    }
}
