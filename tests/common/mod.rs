// tests/common/mod.rs
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use catalog_sync::error::{StoreError, SyncError};
use catalog_sync::ingest::fetcher::PagedFetcher;
use catalog_sync::ingest::pacing::{NoPause, Pacer};
use catalog_sync::ingest::providers::AdapterSet;
use catalog_sync::ingest::types::{
    unique_key, CatalogMapping, Item, Page, PageToken, RawRecord, SourceAdapter,
};
use catalog_sync::store::{ItemStore, SqliteStore};
use serde_json::{json, Value};

/// One scripted response for a page request.
#[derive(Clone, Debug)]
pub enum Step {
    Records(Vec<Value>),
    Fail,
}

/// Adapter with scripted pages per size code. Tokens are page numbers from 1;
/// pages past the end of a script come back empty.
pub struct StubAdapter {
    name: &'static str,
    mapping: CatalogMapping,
    script: HashMap<String, Vec<Step>>,
    stuck_token: bool,
    pub calls: Mutex<Vec<(String, PageToken)>>,
}

impl StubAdapter {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            mapping: CatalogMapping::from_pairs(
                &[("Jumpers", "c-jumpers"), ("Jeans", "c-jeans")],
                &[("2XL", "s-2xl"), ("3XL", "s-3xl")],
            ),
            script: HashMap::new(),
            stuck_token: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Script pages for a size label (mapped through the stub's size table).
    pub fn with_pages(mut self, size_label: &str, steps: Vec<Step>) -> Self {
        let code = self
            .mapping
            .sizes
            .get(size_label)
            .cloned()
            .unwrap_or_else(|| size_label.to_string());
        self.script.insert(code, steps);
        self
    }

    /// Hand back the request token as the next token, like an API that
    /// never advances its cursor.
    pub fn with_stuck_token(mut self) -> Self {
        self.stuck_token = true;
        self
    }

    pub fn calls(&self) -> Vec<(String, PageToken)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SourceAdapter for StubAdapter {
    fn name(&self) -> &'static str {
        self.name
    }

    fn mapping(&self) -> &CatalogMapping {
        &self.mapping
    }

    fn initial_token(&self) -> PageToken {
        PageToken::Number(1)
    }

    async fn fetch_page(
        &self,
        _category_code: &str,
        size_code: &str,
        token: &PageToken,
    ) -> Result<Page, SyncError> {
        self.calls
            .lock()
            .unwrap()
            .push((size_code.to_string(), token.clone()));
        let PageToken::Number(n) = token else {
            panic!("stub only hands out numeric tokens");
        };
        let step = self
            .script
            .get(size_code)
            .and_then(|steps| steps.get((*n - 1) as usize));
        let next = if self.stuck_token { *n } else { n + 1 };
        match step {
            Some(Step::Records(r)) => Ok(Page {
                records: r.clone(),
                next: Some(PageToken::Number(next)),
            }),
            Some(Step::Fail) => Err(SyncError::transport(self.name, "503 Service Unavailable")),
            None => Ok(Page {
                records: vec![],
                next: Some(PageToken::Number(n + 1)),
            }),
        }
    }

    fn normalize(
        &self,
        raw: &RawRecord,
        size_label: &str,
        category_name: &str,
    ) -> Result<Item, SyncError> {
        let id = raw
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| SyncError::malformed(self.name, "missing `id`"))?;
        let price = raw
            .get("price")
            .and_then(Value::as_f64)
            .ok_or_else(|| SyncError::malformed(self.name, "missing `price`"))?;
        Ok(Item {
            unique_key: unique_key(id, size_label),
            source_id: id.to_string(),
            name: raw
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or("Stub item")
                .to_string(),
            price: Some(price),
            size: size_label.to_string(),
            category: category_name.to_string(),
            url: format!("https://shop.example/{id}"),
            image_url: None,
            availability: "In Stock".into(),
        })
    }
}

pub fn rec(id: &str, price: f64) -> Value {
    json!({"id": id, "name": format!("Item {id}"), "price": price})
}

pub fn rec_without_price(id: &str) -> Value {
    json!({"id": id, "name": format!("Item {id}")})
}

pub fn records(ids: &[&str]) -> Step {
    Step::Records(ids.iter().map(|id| rec(id, 10.0)).collect())
}

pub fn stored_item(key_id: &str, size: &str) -> Item {
    Item {
        unique_key: unique_key(key_id, size),
        source_id: key_id.to_string(),
        name: format!("Old {key_id}"),
        price: Some(1.0),
        size: size.to_string(),
        category: "Jumpers".into(),
        url: format!("https://shop.example/{key_id}"),
        image_url: None,
        availability: "In Stock".into(),
    }
}

pub fn shared(a: StubAdapter) -> Arc<dyn SourceAdapter> {
    Arc::new(a)
}

pub fn adapter_set(adapters: Vec<Arc<dyn SourceAdapter>>) -> AdapterSet {
    adapters
        .into_iter()
        .map(|a| (a.name().to_string(), a))
        .collect()
}

pub fn no_pause_fetcher() -> PagedFetcher {
    PagedFetcher::new(Arc::new(NoPause))
}

pub fn memory_store() -> Arc<SqliteStore> {
    Arc::new(SqliteStore::in_memory().unwrap())
}

/// Counts pauses instead of sleeping.
#[derive(Default)]
pub struct CountingPacer {
    pub pauses: AtomicUsize,
}

#[async_trait]
impl Pacer for CountingPacer {
    async fn pause(&self) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
    }
}

/// Wraps a real store and starts failing upserts after `ok_upserts` calls.
pub struct FlakyStore {
    pub inner: Arc<SqliteStore>,
    ok_upserts: usize,
    upserts: AtomicUsize,
    pub deletes: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: Arc<SqliteStore>, ok_upserts: usize) -> Self {
        Self {
            inner,
            ok_upserts,
            upserts: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
        }
    }
}

impl ItemStore for FlakyStore {
    fn upsert_many(&self, items: &[Item]) -> Result<usize, StoreError> {
        if self.upserts.fetch_add(1, Ordering::SeqCst) >= self.ok_upserts {
            return Err(StoreError::Sqlite(rusqlite_full_error()));
        }
        self.inner.upsert_many(items)
    }

    fn all_keys(&self) -> Result<HashSet<String>, StoreError> {
        self.inner.all_keys()
    }

    fn delete_many(&self, keys: &HashSet<String>) -> Result<usize, StoreError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_many(keys)
    }
}

fn rusqlite_full_error() -> rusqlite::Error {
    rusqlite::Error::SqliteFailure(
        rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_FULL),
        Some("database or disk is full".into()),
    )
}
