use crate::{
    BrowserError,
    handlers::{ContentHandler, FetchContext},
    media::ThumbnailCache,
    page::{ContentBlock, PageResult},
};
use futures::future::join_all;
use serde::Deserialize;
use std::path::PathBuf;
use url::Url;

/// Canonical host for the JSON API. old.reddit serves the same listings
/// without the redesign's gateway redirects.
const API_BASE: &str = "https://old.reddit.com";

/// Placeholder values Reddit puts in the thumbnail field when there is no
/// real image to show.
const THUMBNAIL_SENTINELS: [&str; 5] = ["self", "default", "nsfw", "spoiler", "image"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedditPathKind {
    Home,
    Subreddit,
    Post,
    Unknown,
}

/// What a Reddit URL's path points at. Computed fresh per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedditPathComponents {
    pub subreddit: Option<String>,
    pub post_id: Option<String>,
    pub kind: RedditPathKind,
}

impl RedditPathComponents {
    fn new(subreddit: Option<String>, post_id: Option<String>, kind: RedditPathKind) -> Self {
        Self {
            subreddit,
            post_id,
            kind,
        }
    }
}

/// Classify a Reddit URL by its path segments.
///
/// Handles `/`, `/r/<sub>`, `/r/<sub>/comments/<id>/...`, and the bare
/// `/comments/<id>/...` route. Anything else is `Unknown`.
pub fn classify_path(url: &Url) -> RedditPathComponents {
    let parts: Vec<&str> = url
        .path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();

    if parts.is_empty() {
        return RedditPathComponents::new(None, None, RedditPathKind::Home);
    }

    if parts[0] == "r" {
        let Some(subreddit) = parts.get(1) else {
            return RedditPathComponents::new(None, None, RedditPathKind::Unknown);
        };
        let subreddit = subreddit.to_string();

        if parts.get(2) == Some(&"comments") {
            if let Some(post_id) = parts.get(3) {
                return RedditPathComponents::new(
                    Some(subreddit),
                    Some(post_id.to_string()),
                    RedditPathKind::Post,
                );
            }
            // "comments" without an id falls back to the subreddit view.
            return RedditPathComponents::new(Some(subreddit), None, RedditPathKind::Subreddit);
        }

        return RedditPathComponents::new(Some(subreddit), None, RedditPathKind::Subreddit);
    }

    if parts[0] == "comments" {
        return match parts.get(1) {
            Some(post_id) => {
                RedditPathComponents::new(None, Some(post_id.to_string()), RedditPathKind::Post)
            }
            None => RedditPathComponents::new(None, None, RedditPathKind::Unknown),
        };
    }

    RedditPathComponents::new(None, None, RedditPathKind::Unknown)
}

/// The JSON API URL for classified components, or `None` when no endpoint
/// can be derived (and no network call should be made).
pub fn json_endpoint(comps: &RedditPathComponents) -> Option<String> {
    endpoint_with_base(API_BASE, comps)
}

fn endpoint_with_base(base: &str, comps: &RedditPathComponents) -> Option<String> {
    match comps.kind {
        RedditPathKind::Home => Some(format!("{}/.json", base)),
        RedditPathKind::Subreddit => comps
            .subreddit
            .as_ref()
            .map(|sub| format!("{}/r/{}.json", base, sub)),
        RedditPathKind::Post => comps.post_id.as_ref().map(|id| match &comps.subreddit {
            Some(sub) => format!("{}/r/{}/comments/{}.json", base, sub, id),
            None => format!("{}/comments/{}.json", base, id),
        }),
        RedditPathKind::Unknown => None,
    }
}

/// Reddit's `edited` field is `false` for untouched posts and an epoch
/// timestamp once edited.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Edited {
    Timestamp(f64),
    Flag(bool),
}

impl Default for Edited {
    fn default() -> Self {
        Edited::Flag(false)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub author: String,
    pub subreddit: String,
    pub score: i64,
    pub num_comments: u64,
    pub permalink: String,
    pub url: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub selftext: String,
    /// Self posts carry their content in `selftext`; link posts point off-site.
    #[serde(default)]
    pub is_self: bool,
    #[serde(default)]
    pub over_18: bool,
    #[serde(default)]
    pub created_utc: f64,
    #[serde(default)]
    pub edited: Edited,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostWrapper {
    pub kind: String,
    pub data: Post,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListingData {
    #[serde(default)]
    pub after: Option<String>,
    #[serde(default)]
    pub before: Option<String>,
    pub children: Vec<PostWrapper>,
}

/// Reddit's paginated collection-of-posts shape. Extra fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct Listing {
    pub kind: String,
    pub data: ListingData,
}

/// Site handler for reddit.com: rewrites browsable URLs to the JSON API,
/// validates the listing shape, and renders posts as content blocks.
pub struct RedditHandler {
    api_base: String,
}

impl RedditHandler {
    pub fn new() -> Self {
        Self {
            api_base: API_BASE.to_string(),
        }
    }

    /// Point the handler at a different API host. Exists for tests against a
    /// mock server.
    pub fn with_api_base(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
        }
    }
}

impl Default for RedditHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ContentHandler for RedditHandler {
    async fn fetch(&self, url: &Url, ctx: &FetchContext) -> PageResult {
        let comps = classify_path(url);
        let Some(endpoint) = endpoint_with_base(&self.api_base, &comps) else {
            return PageResult::failure(url.as_str(), 0, &BrowserError::UnresolvableEndpoint);
        };

        tracing::debug!(url = %url, endpoint = %endpoint, "reddit dispatch");

        let response = match ctx.client.get(&endpoint).send().await {
            Ok(response) => response,
            Err(e) => {
                let err = BrowserError::Network(e.to_string());
                return PageResult::failure(url.as_str(), 0, &err);
            }
        };

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let err = BrowserError::Http {
                status,
                message: format!("Reddit API returned status {}", status),
            };
            return PageResult::failure(url.as_str(), status, &err);
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                let err = BrowserError::Network(e.to_string());
                return PageResult::failure(url.as_str(), status, &err);
            }
        };

        // Two decode stages with distinct failures: bad JSON text vs valid
        // JSON that is not a listing.
        let value: serde_json::Value = match serde_json::from_str(&body) {
            Ok(value) => value,
            Err(e) => {
                let err = BrowserError::Decode(format!("Reddit API returned invalid JSON: {}", e));
                return PageResult::failure(url.as_str(), status, &err);
            }
        };

        match comps.kind {
            RedditPathKind::Home | RedditPathKind::Subreddit => {
                let listing: Listing = match serde_json::from_value(value) {
                    Ok(listing) => listing,
                    Err(e) => {
                        let err = BrowserError::SchemaMismatch(format!(
                            "Failed to validate subreddit listing: {}",
                            e
                        ));
                        return PageResult::failure(url.as_str(), status, &err);
                    }
                };

                let header = listing_header(&listing, comps.subreddit.as_deref());
                let blocks =
                    render_listing(&listing, header.as_deref(), ctx.thumbnails.as_ref()).await;
                let title = header.map(|sub| format!("r/{}", sub)).unwrap_or_default();
                PageResult::blocks(url.as_str(), status, blocks)
                    .with_metadata(title, String::new())
            }
            RedditPathKind::Post => match extract_submission(value) {
                Ok(post) => {
                    let thumbnail = match ctx.thumbnails.as_ref() {
                        Some(cache) => fetch_thumbnail(&post, cache).await,
                        None => None,
                    };
                    let blocks = render_post(&post, thumbnail);
                    let title = post.title.clone();
                    PageResult::blocks(url.as_str(), status, blocks)
                        .with_metadata(title, String::new())
                }
                Err(err) => PageResult::failure(url.as_str(), status, &err),
            },
            // Unreachable: Unknown never produces an endpoint.
            RedditPathKind::Unknown => {
                PageResult::failure(url.as_str(), 0, &BrowserError::UnresolvableEndpoint)
            }
        }
    }
}

/// A post page's payload is an array of listings whose first element is a
/// one-post listing holding the submission itself.
fn extract_submission(value: serde_json::Value) -> Result<Post, BrowserError> {
    let serde_json::Value::Array(mut listings) = value else {
        return Err(BrowserError::SchemaMismatch(
            "post response is not an array of listings".into(),
        ));
    };
    if listings.is_empty() {
        return Err(BrowserError::SchemaMismatch(
            "post response array is empty".into(),
        ));
    }

    let listing: Listing = serde_json::from_value(listings.swap_remove(0))
        .map_err(|e| BrowserError::SchemaMismatch(format!("Failed to validate post listing: {}", e)))?;

    listing
        .data
        .children
        .into_iter()
        .next()
        .map(|wrapper| wrapper.data)
        .ok_or_else(|| BrowserError::SchemaMismatch("post listing has no children".into()))
}

/// The subreddit to show in the listing header: the one from the URL, or the
/// first post's when browsing the front page.
fn listing_header(listing: &Listing, explicit: Option<&str>) -> Option<String> {
    explicit.map(str::to_string).or_else(|| {
        listing
            .data
            .children
            .first()
            .map(|post| post.data.subreddit.clone())
    })
}

async fn render_listing(
    listing: &Listing,
    header_subreddit: Option<&str>,
    thumbnails: Option<&ThumbnailCache>,
) -> Vec<ContentBlock> {
    let mut blocks = Vec::new();

    if let Some(sub) = header_subreddit {
        blocks.push(ContentBlock::Markdown(format!("# r/{}", sub)));
    }

    // All thumbnail downloads for the page run concurrently; each is
    // independently best-effort.
    let thumb_paths: Vec<Option<PathBuf>> = match thumbnails {
        Some(cache) => {
            join_all(
                listing
                    .data
                    .children
                    .iter()
                    .map(|post| fetch_thumbnail(&post.data, cache)),
            )
            .await
        }
        None => vec![None; listing.data.children.len()],
    };

    for (post, thumbnail) in listing.data.children.iter().zip(thumb_paths) {
        blocks.extend(render_post(&post.data, thumbnail));
    }

    blocks
}

fn render_post(post: &Post, thumbnail: Option<PathBuf>) -> Vec<ContentBlock> {
    let mut blocks = Vec::new();

    blocks.push(ContentBlock::Markdown(format!(
        "## [{}]({})\n*By /u/{} in /r/{}*",
        post.title, post.url, post.author, post.subreddit
    )));

    if let Some(path) = thumbnail {
        blocks.push(ContentBlock::Image(path));
    }

    blocks.push(ContentBlock::Markdown(format!(
        "👍 {} | [{} Comments](https://reddit.com{})",
        post.score, post.num_comments, post.permalink
    )));
    blocks.push(ContentBlock::Divider);

    blocks
}

async fn fetch_thumbnail(post: &Post, cache: &ThumbnailCache) -> Option<PathBuf> {
    let url = thumbnail_url(post)?;
    cache.fetch(url).await
}

/// A usable thumbnail is a real absolute URL, not one of Reddit's sentinel
/// placeholders.
fn thumbnail_url(post: &Post) -> Option<&str> {
    let thumb = post.thumbnail.as_str();
    if thumb.starts_with("http") && !THUMBNAIL_SENTINELS.contains(&thumb) {
        Some(thumb)
    } else {
        None
    }
}
