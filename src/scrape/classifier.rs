use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{Selectors, Timing};
use crate::error::Result;
use crate::page::{script, PageCapability};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Locked,
    Video,
    Gallery,
    SingleImage,
    Empty,
}

/// Everything extracted from one rendered post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedPost {
    pub kind: ContentKind,
    /// Raw source references in the order they appear on the page.
    pub sources: Vec<String>,
    pub description: String,
    pub timestamp: Option<String>,
    pub locked: bool,
}

/// One row of the decision table: the category wins if `selector` shows up
/// within `timeout`.
struct Rule<'a> {
    kind: ContentKind,
    selector: &'a str,
    timeout: Duration,
}

pub struct PostClassifier<'a> {
    page: &'a dyn PageCapability,
    selectors: &'a Selectors,
    timing: &'a Timing,
}

impl<'a> PostClassifier<'a> {
    pub fn new(page: &'a dyn PageCapability, selectors: &'a Selectors, timing: &'a Timing) -> Self {
        Self {
            page,
            selectors,
            timing,
        }
    }

    /// Rules in priority order; the first probe that succeeds decides.
    fn rules(&self) -> [Rule<'a>; 4] {
        let sel: &'a Selectors = self.selectors;
        [
            Rule {
                kind: ContentKind::Locked,
                selector: &sel.locked_marker,
                timeout: self.timing.locked_probe(),
            },
            Rule {
                kind: ContentKind::Video,
                selector: &sel.video_play,
                timeout: self.timing.video_probe(),
            },
            Rule {
                kind: ContentKind::Gallery,
                selector: &sel.gallery,
                timeout: self.timing.image_probe(),
            },
            Rule {
                kind: ContentKind::SingleImage,
                selector: &sel.single_image,
                timeout: self.timing.image_probe(),
            },
        ]
    }

    /// Classify the post currently rendered in the page.
    pub async fn classify(&self, post_url: &str) -> Result<ClassifiedPost> {
        let kind = self.detect_kind().await?;
        let sources = self.extract_sources(kind).await?;

        let description = self
            .text_of(&self.selectors.description)
            .await?
            .unwrap_or_else(|| post_url.to_string());
        let timestamp = self.text_of(&self.selectors.timestamp).await?;

        match kind {
            ContentKind::Locked => info!("Post is locked."),
            ContentKind::Empty => info!("No media found."),
            _ => info!("Found {:?} with {} source(s).", kind, sources.len()),
        }

        Ok(ClassifiedPost {
            kind,
            sources,
            description,
            timestamp,
            locked: kind == ContentKind::Locked,
        })
    }

    async fn detect_kind(&self) -> Result<ContentKind> {
        for rule in self.rules() {
            if self.page.wait_for_element(rule.selector, rule.timeout).await? {
                debug!("Probe {} matched {:?}", rule.selector, rule.kind);
                return Ok(rule.kind);
            }
        }
        Ok(ContentKind::Empty)
    }

    async fn extract_sources(&self, kind: ContentKind) -> Result<Vec<String>> {
        let sel = self.selectors;
        match kind {
            ContentKind::Locked | ContentKind::Empty => Ok(Vec::new()),
            ContentKind::Video => {
                self.page.click(&sel.video_play).await?;
                if !self
                    .page
                    .wait_for_element(&sel.video_source, self.timing.video_source())
                    .await?
                {
                    warn!("Video source {} never appeared", sel.video_source);
                    return Ok(Vec::new());
                }
                let value = self.page.evaluate(&script::attribute(&sel.video_source, "src")).await?;
                Ok(non_empty_string(value).into_iter().collect())
            }
            ContentKind::Gallery => {
                let value = self
                    .page
                    .evaluate(&script::attributes_within(&sel.gallery, &sel.gallery_image, "src"))
                    .await?;
                Ok(string_list(value))
            }
            ContentKind::SingleImage => {
                let value = self.page.evaluate(&script::attribute(&sel.single_image, "src")).await?;
                Ok(non_empty_string(value).into_iter().collect())
            }
        }
    }

    async fn text_of(&self, selector: &str) -> Result<Option<String>> {
        let value = self.page.evaluate(&script::inner_text(selector)).await?;
        Ok(non_empty_string(value))
    }
}

fn non_empty_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        _ => None,
    }
}

fn string_list(value: Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.into_iter().filter_map(non_empty_string).collect(),
        _ => Vec::new(),
    }
}
