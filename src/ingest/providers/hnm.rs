// src/ingest/providers/hnm.rs
use async_trait::async_trait;
use serde_json::Value;

use crate::error::SyncError;
use crate::ingest::config::SourceCfg;
use crate::ingest::normalize_text;
use crate::ingest::providers::{
    absolute_image_url, absolute_url, get_json, pluck, required_id, required_price, required_str,
};
use crate::ingest::types::{unique_key, CatalogMapping, Item, Page, PageToken, RawRecord, SourceAdapter};

pub const NAME: &str = "hnm";
pub const DEFAULT_BASE_URL: &str = "https://api.hm.com";
pub const DEFAULT_PAGE_SIZE: u64 = 36;
const SITE_ROOT: &str = "https://www2.hm.com";

pub fn default_mapping() -> CatalogMapping {
    CatalogMapping::from_pairs(
        &[
            ("View All", "men_viewall"),
            ("Hoodies and Sweatshirts", "men_hoodiessweatshirts"),
            ("Jeans", "men_jeans"),
            ("Jumpers", "men_cardigansjumpers"),
        ],
        &[
            ("2XL", "menswear;NO_FORMAT[SML];XXL"),
            ("3XL", "menswear;NO_FORMAT[SML];3XL"),
            ("W38 L34", "waist;NO_FORMAT[Numeric/Numeric];38/34"),
            ("W38 L38", "waist;NO_FORMAT[Numeric/Numeric];38/38"),
        ],
    )
}

pub struct HnmAdapter {
    client: reqwest::Client,
    base_url: String,
    page_size: u64,
    mapping: CatalogMapping,
}

impl HnmAdapter {
    pub fn new(client: reqwest::Client, mapping: CatalogMapping) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            mapping,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_page_size(mut self, n: u64) -> Self {
        self.page_size = n.max(1);
        self
    }

    pub fn with_overrides(mut self, o: &SourceCfg) -> Self {
        if let Some(url) = &o.base_url {
            self = self.with_base_url(url.clone());
        }
        if let Some(n) = o.page_size {
            self = self.with_page_size(n);
        }
        self.mapping = self.mapping.merged(&o.mapping);
        self
    }

    /// Records live under `plpList.productList`; the API names the next page
    /// explicitly and omits it (or sends 0) on the last one.
    pub fn parse_page(body: &Value) -> Page {
        let records: Vec<RawRecord> = pluck(body, &["plpList", "productList"])
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        if records.is_empty() {
            return Page::default();
        }
        let next = match pluck(body, &["pagination", "nextPageNum"]) {
            Some(Value::Number(n)) => n.as_u64().filter(|&n| n > 0).map(PageToken::Number),
            Some(Value::String(s)) => match s.trim() {
                "" => None,
                t => match t.parse::<u64>() {
                    Ok(0) => None,
                    Ok(n) => Some(PageToken::Number(n)),
                    Err(_) => Some(PageToken::Opaque(t.to_string())),
                },
            },
            _ => None,
        };
        Page { records, next }
    }
}

#[async_trait]
impl SourceAdapter for HnmAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn mapping(&self) -> &CatalogMapping {
        &self.mapping
    }

    fn initial_token(&self) -> PageToken {
        PageToken::Number(1)
    }

    async fn fetch_page(
        &self,
        category_code: &str,
        size_code: &str,
        token: &PageToken,
    ) -> Result<Page, SyncError> {
        let url = format!("{}/search-services/v1/en_GB/listing/resultpage", self.base_url);
        let page_s = token.to_string();
        let page_size_s = self.page_size.to_string();
        let page_id = format!("/men/shop-by-product/{category_code}");
        let facets = format!("sizes:{size_code}");
        let params = [
            ("pageSource", "PLP"),
            ("page", page_s.as_str()),
            ("sort", "RELEVANCE"),
            ("pageId", page_id.as_str()),
            ("page-size", page_size_s.as_str()),
            ("categoryId", category_code),
            ("filters", "sale:false||oldSale:false"),
            ("touchPoint", "DESKTOP"),
            ("skipStockCheck", "false"),
            ("facets", facets.as_str()),
        ];
        let body = get_json(NAME, self.client.get(&url).query(&params)).await?;
        Ok(Self::parse_page(&body))
    }

    fn normalize(
        &self,
        raw: &RawRecord,
        size_label: &str,
        category_name: &str,
    ) -> Result<Item, SyncError> {
        let source_id = required_id(NAME, raw, "id")?;
        let name = normalize_text(required_str(NAME, raw, &["productName"])?);
        if name.is_empty() {
            return Err(SyncError::malformed(NAME, "blank `productName`"));
        }
        let price = required_price(NAME, raw, &["prices", "0", "price"])?;
        let url = absolute_url(NAME, SITE_ROOT, required_str(NAME, raw, &["url"])?)?;
        let image_url = pluck(raw, &["swatches", "0", "productImage"])
            .and_then(Value::as_str)
            .and_then(absolute_image_url);
        let availability = pluck(raw, &["availability", "stockState"])
            .and_then(Value::as_str)
            .unwrap_or("Unknown")
            .to_string();

        Ok(Item {
            unique_key: unique_key(&source_id, size_label),
            source_id,
            name,
            price: Some(price),
            size: size_label.to_string(),
            category: category_name.to_string(),
            url,
            image_url,
            availability,
        })
    }
}
