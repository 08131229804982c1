use crate::{
    BrowserError, Result,
    config::Config,
    handlers::{self, ContentHandler, FetchContext, GenericHandler, HandlerRegistry},
    history::{HistoryStore, RecentUrls},
    page::PageResult,
    tabs::{TabId, TabStore},
};
use serde::Serialize;
use std::path::Path;
use tokio::sync::{Mutex, RwLock};
use url::Url;

/// One autocomplete candidate from the history store.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryHit {
    pub url: String,
    pub title: String,
}

/// The single entry point the display layer talks to: it owns the handler
/// registry, the per-tab results, and the visit history, and turns raw typed
/// input into a stored [`PageResult`].
///
/// Fetches for different tabs may run concurrently; the tab map and the
/// recent list are the only mutable state and each sits behind its own lock.
pub struct Browser {
    config: Config,
    registry: HandlerRegistry,
    generic: GenericHandler,
    ctx: FetchContext,
    tabs: RwLock<TabStore>,
    history: HistoryStore,
    recent: Mutex<RecentUrls>,
}

impl Browser {
    pub fn new(config: Config) -> Result<Self> {
        let db_path = match &config.history.db_path {
            Some(path) => path.clone(),
            None => crate::config::default_data_dir()?.join("history.db"),
        };
        Self::with_history_path(config, &db_path)
    }

    /// Like [`Browser::new`] but with an explicit history database location.
    pub fn with_history_path(config: Config, db_path: &Path) -> Result<Self> {
        config.validate()?;
        let ctx = FetchContext::new(&config)?;
        let history = HistoryStore::open(db_path, config.history.retention_days)?;
        let recent = Mutex::new(RecentUrls::new(config.history.recent_limit));

        Ok(Self {
            registry: handlers::default_registry(),
            generic: GenericHandler::new(),
            ctx,
            tabs: RwLock::new(TabStore::new()),
            history,
            recent,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn open_tab(&self) -> TabId {
        self.tabs.write().await.open()
    }

    pub async fn close_tab(&self, id: TabId) -> bool {
        self.tabs.write().await.close(id)
    }

    pub async fn tab_content(&self, id: TabId) -> Option<PageResult> {
        self.tabs.read().await.get(id).cloned()
    }

    pub async fn tab_count(&self) -> usize {
        self.tabs.read().await.len()
    }

    /// Normalize the input, dispatch it to a content handler, store the
    /// result in the given tab, and on success record the visit. Always
    /// returns a result; failures land in the tab like any other page.
    pub async fn resolve_and_fetch(&self, raw_input: &str, tab: TabId) -> PageResult {
        let result = self.dispatch(raw_input).await;

        self.tabs.write().await.set(tab, result.clone());

        if !result.is_error() {
            if let Err(e) = self
                .history
                .record(&result.url, &result.title, &result.summary)
            {
                // A broken history store must not fail the fetch.
                tracing::warn!(url = %result.url, error = %e, "failed to record history");
            }
            self.recent.lock().await.record(&result.url);
        }

        result
    }

    async fn dispatch(&self, raw_input: &str) -> PageResult {
        let normalized =
            match handlers::normalize_input(raw_input, &self.config.network.default_scheme) {
                Ok(normalized) => normalized,
                Err(e) => return PageResult::failure(raw_input.trim(), 0, &e),
            };

        let url = match Url::parse(&normalized) {
            Ok(url) => url,
            Err(e) => {
                let err = BrowserError::InvalidUrl(format!("{}: {}", normalized, e));
                return PageResult::failure(&normalized, 0, &err);
            }
        };

        let domain = url
            .host_str()
            .map(|host| host.to_ascii_lowercase())
            .unwrap_or_default();

        // No registered handler is not an error; it selects the generic path.
        let handler: &dyn ContentHandler = match self.registry.lookup(&domain) {
            Some(handler) => {
                tracing::debug!(domain = %domain, "dispatching to site handler");
                handler.as_ref()
            }
            None => &self.generic,
        };

        handler.fetch(&url, &self.ctx).await
    }

    pub fn search_history(&self, query: &str, limit: usize) -> Result<Vec<HistoryHit>> {
        let entries = self.history.matching(query, limit)?;
        Ok(entries
            .into_iter()
            .map(|entry| HistoryHit {
                url: entry.url,
                title: entry.title,
            })
            .collect())
    }

    pub fn prune_history(&self) -> Result<usize> {
        self.history.prune()
    }

    /// URLs visited this session, most recent first.
    pub async fn recent_urls(&self) -> Vec<String> {
        self.recent
            .lock()
            .await
            .iter()
            .map(str::to_string)
            .collect()
    }
}
