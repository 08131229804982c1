use crate::BrowserError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A renderable piece of a page, in document order. The display layer decides
/// how each block is drawn; this crate only produces them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "value")]
pub enum ContentBlock {
    Markdown(String),
    Image(PathBuf),
    Divider,
}

/// Page content in exactly one of two shapes: a single markdown string (the
/// generic handler) or an ordered block list (site handlers that need images
/// or per-post structure).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Document {
    Markdown(String),
    Blocks(Vec<ContentBlock>),
}

impl Default for Document {
    fn default() -> Self {
        Document::Markdown(String::new())
    }
}

impl Document {
    pub fn is_empty(&self) -> bool {
        match self {
            Document::Markdown(md) => md.is_empty(),
            Document::Blocks(blocks) => blocks.is_empty(),
        }
    }

    /// Flatten the document into plain text, one block per paragraph. Images
    /// render as a bracketed path reference.
    pub fn to_text(&self) -> String {
        match self {
            Document::Markdown(md) => md.clone(),
            Document::Blocks(blocks) => blocks
                .iter()
                .map(|block| match block {
                    ContentBlock::Markdown(md) => md.clone(),
                    ContentBlock::Image(path) => format!("[image: {}]", path.display()),
                    ContentBlock::Divider => "—".to_string(),
                })
                .collect::<Vec<_>>()
                .join("\n\n"),
        }
    }
}

/// The result of processing one page fetch.
///
/// `status` is 0 when the request never reached the network, otherwise the
/// HTTP status code. `error` is set exactly when the fetch or parse failed,
/// and in that case the document is empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    pub url: String,
    pub status: u16,
    pub document: Document,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PageResult {
    pub fn markdown(url: impl Into<String>, status: u16, markdown: String) -> Self {
        Self {
            url: url.into(),
            status,
            document: Document::Markdown(markdown),
            title: String::new(),
            summary: String::new(),
            error: None,
        }
    }

    pub fn blocks(url: impl Into<String>, status: u16, blocks: Vec<ContentBlock>) -> Self {
        Self {
            url: url.into(),
            status,
            document: Document::Blocks(blocks),
            title: String::new(),
            summary: String::new(),
            error: None,
        }
    }

    /// Build the terminal error result for a fetch. `status` carries the
    /// furthest stage reached: 0 before/without a response, otherwise the
    /// HTTP code.
    pub fn failure(url: impl Into<String>, status: u16, error: &BrowserError) -> Self {
        Self {
            url: url.into(),
            status,
            document: Document::default(),
            title: String::new(),
            summary: String::new(),
            error: Some(error.to_string()),
        }
    }

    pub fn with_metadata(mut self, title: String, summary: String) -> Self {
        self.title = title;
        self.summary = summary;
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

impl crate::output::OutputFormatter for PageResult {
    fn format_text(&self) -> String {
        use crate::output::text;

        match &self.error {
            Some(error) => format!(
                "{}\n{}",
                text::error(error),
                text::key_value("Status", &self.status.to_string())
            ),
            None => format!(
                "{}\n\n{}\n{}",
                self.document.to_text(),
                text::key_value("URL", &self.url),
                text::key_value("Status", &self.status.to_string())
            ),
        }
    }

    fn format_json(&self, pretty: bool) -> crate::Result<String> {
        crate::output::to_json(self, pretty)
    }
}
