// src/store.rs
//! Durable `items` table keyed by `unique_id`.
//!
//! Every write call runs in a single transaction, so a crash never leaves a
//! half-applied batch behind.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::StoreError;
use crate::ingest::types::Item;

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS items (
    unique_id    TEXT PRIMARY KEY,
    id           INTEGER,
    name         TEXT,
    price        REAL,
    size         TEXT,
    category     TEXT,
    url          TEXT,
    image_url    TEXT,
    availability TEXT
)";

const UPSERT_SQL: &str = "
INSERT INTO items (unique_id, id, name, price, size, category, url, image_url, availability)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
ON CONFLICT(unique_id) DO UPDATE SET
    id = excluded.id,
    name = excluded.name,
    price = excluded.price,
    size = excluded.size,
    category = excluded.category,
    url = excluded.url,
    image_url = excluded.image_url,
    availability = excluded.availability";

const SELECT_COLUMNS: &str = "unique_id, CAST(id AS TEXT), name, price, size, category, url, image_url, availability";

/// Keyed item table with upsert-by-key semantics.
pub trait ItemStore: Send + Sync {
    /// Insert or fully overwrite each item. Returns the number of rows written.
    fn upsert_many(&self, items: &[Item]) -> Result<usize, StoreError>;

    fn all_keys(&self) -> Result<HashSet<String>, StoreError>;

    /// Remove exactly these keys; absent keys are ignored. Returns rows removed.
    fn delete_many(&self, keys: &HashSet<String>) -> Result<usize, StoreError>;
}

#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open (or create) the file-backed store.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        // WAL is best-effort; some filesystems refuse it.
        if let Err(e) = conn.pragma_update(None, "journal_mode", "WAL") {
            tracing::debug!(target: "sync", error = %e, "journal_mode=WAL not applied");
        }
        conn.execute_batch(SCHEMA_SQL)?;
        tracing::info!(target: "sync", path = %path.display(), "opened item store");
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    /// Ephemeral store; contents vanish with the process.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM items", [], |r| r.get(0))?;
        Ok(n.max(0) as usize)
    }

    /// Read one row back. `source_id` comes from the INTEGER `id` column, so
    /// numeric ids lose leading zeros (`"0970818001"` reads back as
    /// `"970818001"`). Use `unique_key` for identity.
    pub fn get(&self, key: &str) -> Result<Option<Item>, StoreError> {
        let conn = self.lock()?;
        let sql = format!("SELECT {SELECT_COLUMNS} FROM items WHERE unique_id = ?1");
        Ok(conn.query_row(&sql, params![key], row_to_item).optional()?)
    }

    /// First `limit` rows in key order.
    pub fn sample(&self, limit: usize) -> Result<Vec<Item>, StoreError> {
        let conn = self.lock()?;
        let sql = format!("SELECT {SELECT_COLUMNS} FROM items ORDER BY unique_id LIMIT ?1");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![limit as i64], row_to_item)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

fn row_to_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<Item> {
    Ok(Item {
        unique_key: row.get(0)?,
        source_id: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        name: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        price: row.get(3)?,
        size: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        category: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
        url: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
        image_url: row.get(7)?,
        availability: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
    })
}

impl ItemStore for SqliteStore {
    fn upsert_many(&self, items: &[Item]) -> Result<usize, StoreError> {
        if items.is_empty() {
            return Ok(0);
        }
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(UPSERT_SQL)?;
            for it in items {
                stmt.execute(params![
                    it.unique_key,
                    it.source_id,
                    it.name,
                    it.price,
                    it.size,
                    it.category,
                    it.url,
                    it.image_url,
                    it.availability,
                ])?;
            }
        }
        tx.commit()?;
        Ok(items.len())
    }

    fn all_keys(&self) -> Result<HashSet<String>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT unique_id FROM items")?;
        let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;
        let mut keys = HashSet::new();
        for k in rows {
            keys.insert(k?);
        }
        Ok(keys)
    }

    fn delete_many(&self, keys: &HashSet<String>) -> Result<usize, StoreError> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut removed = 0usize;
        {
            let mut stmt = tx.prepare_cached("DELETE FROM items WHERE unique_id = ?1")?;
            for k in keys {
                removed += stmt.execute(params![k])?;
            }
        }
        tx.commit()?;
        Ok(removed)
    }
}
