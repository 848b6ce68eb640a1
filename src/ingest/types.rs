// src/ingest/types.rs
use std::collections::BTreeMap;

use crate::error::SyncError;

/// One product-size listing, normalized across retailers.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct Item {
    pub unique_key: String, // "{source_id}-{size}"
    pub source_id: String,
    pub name: String,
    pub price: Option<f64>,
    pub size: String,     // human-readable label, not the API code
    pub category: String, // human-readable label
    pub url: String,
    pub image_url: Option<String>,
    pub availability: String,
}

/// Stable identity of a listing across runs.
pub fn unique_key(source_id: &str, size_label: &str) -> String {
    format!("{source_id}-{size_label}")
}

/// What to fetch: one retailer, one category, any number of sizes.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Query {
    pub source: String,
    pub category: String,
    #[serde(default)]
    pub sizes: Vec<String>,
}

impl Query {
    pub fn new(source: &str, category: &str, sizes: &[&str]) -> Self {
        Self {
            source: source.to_string(),
            category: category.to_string(),
            sizes: sizes.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Untyped product record as returned by a catalog API.
pub type RawRecord = serde_json::Value;

/// Pagination cursor. Offset-style catalogs count records, cursor-style
/// catalogs hand back whatever the API calls its next page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageToken {
    Number(u64),
    Opaque(String),
}

impl std::fmt::Display for PageToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PageToken::Number(n) => write!(f, "{n}"),
            PageToken::Opaque(s) => f.write_str(s),
        }
    }
}

/// One response worth of records. `next == None` means the source is exhausted.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub records: Vec<RawRecord>,
    pub next: Option<PageToken>,
}

/// Label -> API code lookup tables for one retailer. Immutable once an
/// adapter is built.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
pub struct CatalogMapping {
    #[serde(default)]
    pub categories: BTreeMap<String, String>,
    #[serde(default)]
    pub sizes: BTreeMap<String, String>,
}

impl CatalogMapping {
    pub fn from_pairs(categories: &[(&str, &str)], sizes: &[(&str, &str)]) -> Self {
        let own = |pairs: &[(&str, &str)]| {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>()
        };
        Self {
            categories: own(categories),
            sizes: own(sizes),
        }
    }

    /// Entries from `other` win over built-in ones.
    pub fn merged(mut self, other: &CatalogMapping) -> Self {
        self.categories
            .extend(other.categories.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.sizes
            .extend(other.sizes.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn category_code(&self, provider: &str, category: &str) -> Result<&str, SyncError> {
        self.categories
            .get(category)
            .map(String::as_str)
            .ok_or_else(|| SyncError::UnknownCategory {
                provider: provider.to_string(),
                category: category.to_string(),
            })
    }

    pub fn size_code(&self, provider: &str, size: &str) -> Result<&str, SyncError> {
        self.sizes
            .get(size)
            .map(String::as_str)
            .ok_or_else(|| SyncError::UnknownSize {
                provider: provider.to_string(),
                size: size.to_string(),
            })
    }
}

/// Retailer-specific translation between query labels, API pages and Items.
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    fn mapping(&self) -> &CatalogMapping;

    fn initial_token(&self) -> PageToken;

    async fn fetch_page(
        &self,
        category_code: &str,
        size_code: &str,
        token: &PageToken,
    ) -> Result<Page, SyncError>;

    /// Pure mapping, no I/O.
    fn normalize(
        &self,
        raw: &RawRecord,
        size_label: &str,
        category_name: &str,
    ) -> Result<Item, SyncError>;

    fn category_code(&self, category: &str) -> Result<&str, SyncError> {
        self.mapping().category_code(self.name(), category)
    }

    fn size_code(&self, size: &str) -> Result<&str, SyncError> {
        self.mapping().size_code(self.name(), size)
    }
}
