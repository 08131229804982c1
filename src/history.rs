use crate::{BrowserError, Result};
use chrono::Utc;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{OptionalExtension, params};
use serde::Serialize;
use std::collections::VecDeque;
use std::path::Path;

type SqlitePool = Pool<SqliteConnectionManager>;

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// A visited URL on record. `visits` is append-only and non-decreasing;
/// `url` is unique across the table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub summary: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub visits: Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favicon: Option<Vec<u8>>,
}

/// Durable visit history, deduplicated by exact URL and self-trimming to the
/// configured retention window after every record.
pub struct HistoryStore {
    pool: SqlitePool,
    retention_days: u64,
}

impl HistoryStore {
    pub fn open(path: &Path, retention_days: u64) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                     PRAGMA synchronous = NORMAL;
                     PRAGMA busy_timeout = 5000;",
            )?;
            Ok(())
        });

        let pool = Pool::builder()
            .max_size(4)
            .build(manager)
            .map_err(|e| BrowserError::Storage(format!("Failed to create pool: {}", e)))?;

        let conn = pool
            .get()
            .map_err(|e| BrowserError::Storage(format!("Failed to get connection: {}", e)))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL DEFAULT '',
                summary TEXT NOT NULL DEFAULT '',
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                visits TEXT NOT NULL DEFAULT '[]',
                screenshot BLOB,
                favicon BLOB
            )",
            [],
        )
        .map_err(|e| BrowserError::Storage(format!("Failed to create table: {}", e)))?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_history_updated ON history(updated_at)",
            [],
        )
        .ok();

        Ok(Self {
            pool,
            retention_days,
        })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        self.pool
            .get()
            .map_err(|e| BrowserError::Storage(format!("Pool error: {}", e)))
    }

    /// Upsert keyed on exact URL equality: an existing entry gains a visit
    /// timestamp and fresh metadata, a new one starts with a single visit.
    /// Prunes expired entries afterwards so history maintains itself.
    pub fn record(&self, url: &str, title: &str, summary: &str) -> Result<()> {
        let now = Utc::now().timestamp_millis();
        let conn = self.conn()?;

        let existing: Option<(i64, String)> = conn
            .query_row(
                "SELECT id, visits FROM history WHERE url = ?1",
                params![url],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(|e| BrowserError::Storage(format!("Query error: {}", e)))?;

        match existing {
            Some((id, visits_json)) => {
                let mut visits: Vec<i64> = serde_json::from_str(&visits_json).unwrap_or_default();
                visits.push(now);
                let visits_json = serde_json::to_string(&visits)?;
                conn.execute(
                    "UPDATE history SET visits = ?1, updated_at = ?2, title = ?3, summary = ?4
                     WHERE id = ?5",
                    params![visits_json, now, title, summary, id],
                )
                .map_err(|e| BrowserError::Storage(format!("Update error: {}", e)))?;
            }
            None => {
                let visits_json = serde_json::to_string(&[now])?;
                conn.execute(
                    "INSERT INTO history (url, title, summary, created_at, updated_at, visits)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![url, title, summary, now, now, visits_json],
                )
                .map_err(|e| BrowserError::Storage(format!("Insert error: {}", e)))?;
            }
        }
        drop(conn);

        self.prune()?;
        Ok(())
    }

    /// Delete every entry untouched for longer than the retention window.
    pub fn prune(&self) -> Result<usize> {
        let cutoff = Utc::now().timestamp_millis() - self.retention_days as i64 * MS_PER_DAY;
        self.prune_older_than(cutoff)
    }

    fn prune_older_than(&self, cutoff_ms: i64) -> Result<usize> {
        let conn = self.conn()?;
        let removed = conn
            .execute(
                "DELETE FROM history WHERE updated_at < ?1",
                params![cutoff_ms],
            )
            .map_err(|e| BrowserError::Storage(format!("Delete error: {}", e)))?;
        if removed > 0 {
            tracing::debug!(removed, "pruned expired history entries");
        }
        Ok(removed)
    }

    /// Case-insensitive substring match against URL and title, newest first.
    /// An empty query matches everything.
    pub fn matching(&self, query: &str, limit: usize) -> Result<Vec<HistoryEntry>> {
        let conn = self.conn()?;
        let needle = query.to_lowercase();

        let mut stmt = conn
            .prepare(
                "SELECT id, url, title, summary, created_at, updated_at, visits,
                        screenshot, favicon
                 FROM history
                 WHERE ?1 = '' OR instr(lower(url), ?1) > 0 OR instr(lower(title), ?1) > 0
                 ORDER BY updated_at DESC
                 LIMIT ?2",
            )
            .map_err(|e| BrowserError::Storage(format!("Prepare error: {}", e)))?;

        let rows = stmt
            .query_map(params![needle, limit as i64], row_to_entry)
            .map_err(|e| BrowserError::Storage(format!("Query error: {}", e)))?;

        let mut entries = Vec::new();
        for row in rows {
            match row {
                Ok(entry) => entries.push(entry),
                Err(e) => tracing::warn!("Failed to read history row: {}", e),
            }
        }
        Ok(entries)
    }

    pub fn get(&self, url: &str) -> Result<Option<HistoryEntry>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, url, title, summary, created_at, updated_at, visits,
                    screenshot, favicon
             FROM history WHERE url = ?1",
            params![url],
            row_to_entry,
        )
        .optional()
        .map_err(|e| BrowserError::Storage(format!("Query error: {}", e)))
    }

    pub fn len(&self) -> Result<usize> {
        let conn = self.conn()?;
        conn.query_row("SELECT COUNT(*) FROM history", [], |row| {
            row.get::<_, i64>(0)
        })
        .map(|n| n as usize)
        .map_err(|e| BrowserError::Storage(format!("Query error: {}", e)))
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<HistoryEntry> {
    let visits_json: String = row.get(6)?;
    Ok(HistoryEntry {
        id: row.get(0)?,
        url: row.get(1)?,
        title: row.get(2)?,
        summary: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
        visits: serde_json::from_str(&visits_json).unwrap_or_default(),
        screenshot: row.get(7)?,
        favicon: row.get(8)?,
    })
}

/// The lightweight companion to [`HistoryStore`]: an in-memory recency list
/// capped at a fixed size. The most recently recorded URL is always first
/// and a URL never appears twice.
#[derive(Debug)]
pub struct RecentUrls {
    cap: usize,
    urls: VecDeque<String>,
}

impl RecentUrls {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            urls: VecDeque::new(),
        }
    }

    pub fn record(&mut self, url: &str) {
        if let Some(pos) = self.urls.iter().position(|u| u == url) {
            self.urls.remove(pos);
        }
        self.urls.push_front(url.to_string());
        self.urls.truncate(self.cap);
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.urls.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}
