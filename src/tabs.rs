use crate::page::PageResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Opaque identifier for one browsing context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TabId(Uuid);

impl TabId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for TabId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// What each open tab currently shows. Purely in-memory and scoped to the
/// process: a freshly opened tab holds nothing (the display layer shows its
/// home placeholder), and this store never decides which tab is active.
#[derive(Debug, Default)]
pub struct TabStore {
    tabs: HashMap<TabId, Option<PageResult>>,
}

impl TabStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self) -> TabId {
        let id = TabId::new();
        self.tabs.insert(id, None);
        id
    }

    /// Store a fetch result for a tab. Also (re)creates the slot, so storing
    /// into an unknown id behaves like storing into a fresh tab.
    pub fn set(&mut self, id: TabId, result: PageResult) {
        self.tabs.insert(id, Some(result));
    }

    pub fn get(&self, id: TabId) -> Option<&PageResult> {
        self.tabs.get(&id).and_then(|slot| slot.as_ref())
    }

    pub fn contains(&self, id: TabId) -> bool {
        self.tabs.contains_key(&id)
    }

    pub fn close(&mut self, id: TabId) -> bool {
        self.tabs.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }
}
