//! The rendering capability the scraper drives.
//!
//! Discovery, classification and login only talk to [`PageCapability`]; the
//! Chromium adapter in [`chrome`] is one implementation and the test suite
//! provides a scripted one.

pub mod chrome;
pub mod script;

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

pub use chrome::ChromePage;

/// How long `navigate` waits before returning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPolicy {
    DomContentLoaded,
    /// Wait until the page has stopped loading resources.
    NetworkIdle,
}

#[async_trait]
pub trait PageCapability: Send + Sync {
    async fn navigate(&self, url: &str, wait: WaitPolicy) -> Result<()>;

    /// Wait up to `timeout` for `selector` to match.
    ///
    /// `Ok(false)` means the element never showed up, which is an ordinary
    /// outcome; `Err` is reserved for the page itself failing.
    async fn wait_for_element(&self, selector: &str, timeout: Duration) -> Result<bool>;

    /// Evaluate a JavaScript expression and return its JSON value
    /// (`Value::Null` for `null`/`undefined`).
    async fn evaluate(&self, script: &str) -> Result<Value>;

    async fn click(&self, selector: &str) -> Result<()>;

    async fn type_text(&self, selector: &str, text: &str) -> Result<()>;
}
