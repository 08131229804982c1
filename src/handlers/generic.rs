use crate::{
    BrowserError,
    handlers::{ContentHandler, FetchContext},
    page::PageResult,
};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").expect("static selector"));
static META_DESCRIPTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[name="description"]"#).expect("static selector"));
static OG_DESCRIPTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[property="og:description"]"#).expect("static selector"));

/// Default handler for any site without a registered one: fetch, sniff the
/// content type, and convert HTML to markdown. Non-HTML bodies are shown
/// verbatim in a fenced block so nothing is silently dropped.
pub struct GenericHandler;

impl GenericHandler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GenericHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ContentHandler for GenericHandler {
    async fn fetch(&self, url: &Url, ctx: &FetchContext) -> PageResult {
        let response = match ctx.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                let err = BrowserError::Network(e.to_string());
                return PageResult::failure(url.as_str(), 0, &err);
            }
        };

        // Redirects were followed by the client; report where we landed.
        let final_url = response.url().to_string();
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                let err = BrowserError::Network(e.to_string());
                return PageResult::failure(&final_url, status, &err);
            }
        };

        if content_type.contains("html") {
            let (title, summary) = extract_metadata(&body, &final_url);
            match to_markdown(&body) {
                Ok(markdown) => {
                    PageResult::markdown(&final_url, status, markdown).with_metadata(title, summary)
                }
                Err(err) => PageResult::failure(&final_url, status, &err),
            }
        } else {
            // Not HTML: show the raw text rather than losing it.
            let markdown = format!("```\n{}\n```", body);
            PageResult::markdown(&final_url, status, markdown)
        }
    }
}

fn to_markdown(html: &str) -> Result<String, BrowserError> {
    htmd::HtmlToMarkdown::builder()
        .skip_tags(vec!["script", "style"])
        .build()
        .convert(html)
        .map_err(|e| BrowserError::Decode(format!("HTML conversion failed: {}", e)))
}

/// Best-effort `<title>` and description extraction. The summary combines
/// `meta[name=description]` and `meta[property=og:description]`: both present
/// and different joins them with a newline, otherwise whichever exists wins.
fn extract_metadata(html: &str, fallback_title: &str) -> (String, String) {
    let document = Html::parse_document(html);

    let title = document
        .select(&TITLE)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| fallback_title.to_string());

    let meta_content = select_content(&document, &META_DESCRIPTION);
    let og_content = select_content(&document, &OG_DESCRIPTION);

    let summary = match (meta_content, og_content) {
        (Some(meta), Some(og)) if meta != og => format!("{}\n{}", meta, og),
        (Some(meta), Some(_)) => meta,
        (Some(meta), None) => meta,
        (None, Some(og)) => og,
        (None, None) => String::new(),
    };

    (title, summary)
}

fn select_content(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(String::from)
}

fn collapse_whitespace(s: &str) -> String {
    WHITESPACE.replace_all(s.trim(), " ").into_owned()
}
