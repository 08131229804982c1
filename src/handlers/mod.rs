pub mod generic;
pub mod reddit;

use crate::{BrowserError, Result, config::Config, media::ThumbnailCache, page::PageResult};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub use generic::GenericHandler;
pub use reddit::RedditHandler;

/// Turn free-form user input into an absolute URL string.
///
/// Whitespace is trimmed and a missing scheme gets the configured default
/// prepended. This is deliberately a thin syntactic step; full parsing
/// happens at dispatch time.
pub fn normalize_input(raw: &str, default_scheme: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(BrowserError::EmptyInput);
    }

    if trimmed.contains("://") {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{}://{}", default_scheme, trimmed))
    }
}

/// Everything a content handler needs besides the URL itself: the shared
/// HTTP client (identity + timeout baked in) and the optional thumbnail
/// cache. Built once per session and shared read-only across fetches.
pub struct FetchContext {
    pub client: reqwest::Client,
    pub timeout: Duration,
    pub thumbnails: Option<ThumbnailCache>,
}

impl FetchContext {
    pub fn new(config: &Config) -> Result<Self> {
        let timeout = Duration::from_secs(config.network.request_timeout_seconds);
        let client = reqwest::Client::builder()
            .user_agent(config.network.user_agent.clone())
            .connect_timeout(Duration::from_secs(crate::timeouts::secs::CONNECT))
            .timeout(timeout)
            .build()
            .map_err(|e| BrowserError::Network(format!("Failed to build HTTP client: {}", e)))?;

        let thumbnails = if config.media.thumbnails {
            let dir = match &config.media.cache_dir {
                Some(dir) => dir.clone(),
                None => crate::config::default_cache_dir()?.join("thumbnails"),
            };
            Some(ThumbnailCache::new(dir, client.clone()))
        } else {
            None
        };

        Ok(Self {
            client,
            timeout,
            thumbnails,
        })
    }
}

/// A content handler turns a normalized URL into a [`PageResult`].
///
/// Implementations are total: every failure mode is folded into the result's
/// `error` field, never raised to the caller.
#[async_trait::async_trait]
pub trait ContentHandler: Send + Sync {
    async fn fetch(&self, url: &Url, ctx: &FetchContext) -> PageResult;
}

/// Domain → handler table, populated once at startup in a fixed order and
/// read-only afterwards.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn ContentHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a domain. Registering the same domain twice
    /// replaces the earlier handler.
    pub fn register(&mut self, domain: impl Into<String>, handler: Arc<dyn ContentHandler>) {
        let domain = domain.into();
        tracing::debug!(domain = %domain, "registering content handler");
        self.handlers.insert(domain, handler);
    }

    /// Look up a handler for a lower-cased domain. Falls back to stripping
    /// the leftmost label once (`old.reddit.com` → `reddit.com`) when the
    /// domain has more than two labels; the strip is never recursive.
    pub fn lookup(&self, domain: &str) -> Option<&Arc<dyn ContentHandler>> {
        if let Some(handler) = self.handlers.get(domain) {
            return Some(handler);
        }

        if domain.matches('.').count() >= 2
            && let Some((_, parent)) = domain.split_once('.')
        {
            return self.handlers.get(parent);
        }

        None
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// The fixed startup registration. Order is deterministic and enumerable;
/// domains without an entry take the generic path at dispatch time.
pub fn default_registry() -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    registry.register("reddit.com", Arc::new(RedditHandler::new()));
    registry
}
