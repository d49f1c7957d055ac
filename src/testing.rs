//! In-process stand-ins for the browser, the network and a misbehaving store.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::Selectors;
use crate::db::Store;
use crate::error::{AppError, Result};
use crate::media::MediaFetcher;
use crate::models::{Author, Media, NewAuthor, NewMedia, NewPost, Post};
use crate::page::{script, PageCapability, WaitPolicy};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    Navigate(String),
    Probe(String),
    Evaluate(String),
    Click(String),
    Type(String, String),
}

/// A rendered page: which selectors match and what each script evaluates to.
#[derive(Debug, Clone, Default)]
pub struct FakeDocument {
    elements: HashSet<String>,
    values: HashMap<String, Value>,
    reveals: HashMap<String, Vec<String>>,
}

impl FakeDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_element(mut self, selector: &str) -> Self {
        self.elements.insert(selector.to_string());
        self
    }

    pub fn with_value(mut self, script: String, value: Value) -> Self {
        self.values.insert(script, value);
        self
    }

    /// Clicking `clicked` makes `appears` match.
    pub fn revealing(mut self, clicked: &str, appears: &str) -> Self {
        self.reveals
            .entry(clicked.to_string())
            .or_default()
            .push(appears.to_string());
        self
    }

    pub fn post(sel: &Selectors, description: &str) -> Self {
        Self::new()
            .with_element(&sel.post_wrapper)
            .with_value(script::inner_text(&sel.description), json!(description))
            .with_value(script::inner_text(&sel.timestamp), json!("Jan 1"))
    }

    pub fn locked(sel: &Selectors, description: &str) -> Self {
        Self::post(sel, description).with_element(&sel.locked_marker)
    }

    pub fn gallery(sel: &Selectors, description: &str, sources: &[&str]) -> Self {
        Self::post(sel, description)
            .with_element(&sel.gallery)
            .with_value(
                script::attributes_within(&sel.gallery, &sel.gallery_image, "src"),
                json!(sources),
            )
    }

    pub fn single_image(sel: &Selectors, description: &str, source: &str) -> Self {
        Self::post(sel, description)
            .with_element(&sel.single_image)
            .with_value(script::attribute(&sel.single_image, "src"), json!(source))
    }

    pub fn video(sel: &Selectors, description: &str, source: &str) -> Self {
        Self::post(sel, description)
            .with_element(&sel.video_play)
            .revealing(&sel.video_play, &sel.video_source)
            .with_value(script::attribute(&sel.video_source, "src"), json!(source))
    }

    pub fn feed(sel: &Selectors, post_ids: &[&str], height: u64) -> Self {
        let ids: Vec<String> = post_ids.iter().map(|id| format!("postId_{id}")).collect();
        Self::new()
            .with_element(&sel.feed_container)
            .with_value(script::element_ids(&sel.feed_post), json!(ids))
            .with_value(script::scroll_and_measure(), json!(height))
    }
}

/// Scripted [`PageCapability`]. Unknown URLs render as an empty document.
#[derive(Default)]
pub struct FakePage {
    documents: Mutex<HashMap<String, FakeDocument>>,
    current: Mutex<String>,
    events: Mutex<Vec<PageEvent>>,
    scroll_heights: Mutex<VecDeque<u64>>,
    disconnected: Mutex<HashSet<String>>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(self, url: &str, doc: FakeDocument) -> Self {
        self.set_document(url, doc);
        self
    }

    /// Successive answers to the scroll script; the last one repeats.
    pub fn with_scroll_heights(self, heights: &[u64]) -> Self {
        self.scroll_heights.lock().unwrap().extend(heights);
        self
    }

    pub fn set_document(&self, url: &str, doc: FakeDocument) {
        self.documents.lock().unwrap().insert(url.to_string(), doc);
    }

    /// Every probe and script on `url` fails as if the browser went away.
    pub fn disconnect_at(&self, url: &str) {
        self.disconnected.lock().unwrap().insert(url.to_string());
    }

    pub fn reconnect(&self) {
        self.disconnected.lock().unwrap().clear();
    }

    fn check_connected(&self) -> Result<()> {
        let url = self.current_url();
        if self.disconnected.lock().unwrap().contains(&url) {
            return Err(AppError::Page(format!("connection closed while on {url}")));
        }
        Ok(())
    }

    pub fn events(&self) -> Vec<PageEvent> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, event: PageEvent) {
        self.events.lock().unwrap().push(event);
    }

    fn current_url(&self) -> String {
        self.current.lock().unwrap().clone()
    }

    fn has_element(&self, selector: &str) -> bool {
        let url = self.current_url();
        self.documents
            .lock()
            .unwrap()
            .get(&url)
            .map_or(false, |doc| doc.elements.contains(selector))
    }
}

#[async_trait]
impl PageCapability for FakePage {
    async fn navigate(&self, url: &str, _wait: WaitPolicy) -> Result<()> {
        self.record(PageEvent::Navigate(url.to_string()));
        *self.current.lock().unwrap() = url.to_string();
        Ok(())
    }

    async fn wait_for_element(&self, selector: &str, _timeout: Duration) -> Result<bool> {
        self.record(PageEvent::Probe(selector.to_string()));
        self.check_connected()?;
        Ok(self.has_element(selector))
    }

    async fn evaluate(&self, script: &str) -> Result<Value> {
        self.record(PageEvent::Evaluate(script.to_string()));
        self.check_connected()?;

        if script == script::scroll_and_measure() {
            let mut heights = self.scroll_heights.lock().unwrap();
            let next = if heights.len() > 1 {
                heights.pop_front()
            } else {
                heights.front().copied()
            };
            if let Some(height) = next {
                return Ok(json!(height));
            }
        }

        let url = self.current_url();
        Ok(self
            .documents
            .lock()
            .unwrap()
            .get(&url)
            .and_then(|doc| doc.values.get(script).cloned())
            .unwrap_or(Value::Null))
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.record(PageEvent::Click(selector.to_string()));
        let url = self.current_url();
        let mut documents = self.documents.lock().unwrap();
        let doc = documents
            .get_mut(&url)
            .filter(|doc| doc.elements.contains(selector))
            .ok_or_else(|| AppError::Page(format!("nothing to click at {selector}")))?;
        if let Some(revealed) = doc.reveals.get(selector).cloned() {
            doc.elements.extend(revealed);
        }
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<()> {
        if !self.has_element(selector) {
            return Err(AppError::Page(format!("no input at {selector}")));
        }
        self.record(PageEvent::Type(selector.to_string(), text.to_string()));
        Ok(())
    }
}

/// Writes the URL itself as the file body, or fails for chosen URLs after
/// leaving a partial file behind.
#[derive(Default)]
pub struct FakeFetcher {
    failing: HashSet<String>,
    fetched: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaFetcher for FakeFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        self.fetched.lock().unwrap().push(url.to_string());
        if self.failing.contains(url) {
            tokio::fs::write(dest, b"partial").await?;
            return Err(AppError::Download("connection reset".to_string()));
        }
        tokio::fs::write(dest, url.as_bytes()).await?;
        Ok(())
    }
}

/// Delegates to a real store but fails selected operations.
pub struct FlakyStore<S> {
    inner: S,
    failing_post_insert: HashSet<String>,
    failing_lookup: HashSet<String>,
    failing_increment: bool,
}

impl<S: Store> FlakyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            failing_post_insert: HashSet::new(),
            failing_lookup: HashSet::new(),
            failing_increment: false,
        }
    }

    pub fn failing_post_insert(mut self, url: &str) -> Self {
        self.failing_post_insert.insert(url.to_string());
        self
    }

    pub fn failing_lookup(mut self, url: &str) -> Self {
        self.failing_lookup.insert(url.to_string());
        self
    }

    /// Fail every counter increment, as if the process died right after
    /// the Media row was written.
    pub fn failing_increment(mut self) -> Self {
        self.failing_increment = true;
        self
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

fn injected_failure() -> AppError {
    AppError::Database(rusqlite::Error::InvalidQuery)
}

#[async_trait]
impl<S: Store> Store for FlakyStore<S> {
    async fn insert_author_if_absent(&self, author: NewAuthor) -> Result<bool> {
        self.inner.insert_author_if_absent(author).await
    }

    async fn get_author(&self, id: &str) -> Result<Option<Author>> {
        self.inner.get_author(id).await
    }

    async fn get_post_by_url(&self, url: &str) -> Result<Option<Post>> {
        if self.failing_lookup.contains(url) {
            return Err(injected_failure());
        }
        self.inner.get_post_by_url(url).await
    }

    async fn get_post(&self, id: i64) -> Result<Option<Post>> {
        self.inner.get_post(id).await
    }

    async fn insert_post(&self, post: NewPost) -> Result<i64> {
        if self.failing_post_insert.contains(&post.url) {
            return Err(injected_failure());
        }
        self.inner.insert_post(post).await
    }

    async fn get_media(&self, post_id: i64, url: &str) -> Result<Option<Media>> {
        self.inner.get_media(post_id, url).await
    }

    async fn count_media(&self, post_id: i64) -> Result<i64> {
        self.inner.count_media(post_id).await
    }

    async fn insert_media(&self, media: NewMedia) -> Result<i64> {
        self.inner.insert_media(media).await
    }

    async fn increment_cached_media_count(&self, post_id: i64) -> Result<()> {
        if self.failing_increment {
            return Err(injected_failure());
        }
        self.inner.increment_cached_media_count(post_id).await
    }

    async fn catch_up_cached_media_count(&self, post_id: i64) -> Result<bool> {
        self.inner.catch_up_cached_media_count(post_id).await
    }
}
