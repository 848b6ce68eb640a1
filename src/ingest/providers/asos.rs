// src/ingest/providers/asos.rs
//! ASOS category search. Offset pagination; an empty `products` list (or
//! reaching `itemCount`) ends the size.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::SyncError;
use crate::ingest::config::SourceCfg;
use crate::ingest::normalize_text;
use crate::ingest::providers::{
    absolute_image_url, absolute_url, get_json, required_id, required_price, required_str,
};
use crate::ingest::types::{unique_key, CatalogMapping, Item, Page, PageToken, RawRecord, SourceAdapter};

pub const NAME: &str = "asos";
pub const DEFAULT_BASE_URL: &str = "https://www.asos.com";
pub const DEFAULT_PAGE_SIZE: u64 = 72;
const SITE_ROOT: &str = "https://www.asos.com/";

pub fn default_mapping() -> CatalogMapping {
    CatalogMapping::from_pairs(
        &[
            ("Tall", "20753"),
            ("Jeans", "4208"),
            ("Trousers", "4910"),
            ("Shoes", "4209"),
            ("Jumpers", "7617"),
        ],
        &[
            ("2XL", "4529"),
            ("3XL", "4531"),
            ("W38 L36", "1584"),
            ("Size 14", "112"),
        ],
    )
}

pub struct AsosAdapter {
    client: reqwest::Client,
    base_url: String,
    page_size: u64,
    mapping: CatalogMapping,
}

impl AsosAdapter {
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

    /// Split a search response into records and the next offset.
    pub fn parse_page(body: &Value, offset: u64, page_size: u64) -> Page {
        let records: Vec<RawRecord> = body
            .get("products")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        if records.is_empty() {
            return Page::default();
        }
        let next_offset = offset + page_size;
        let exhausted = body
            .get("itemCount")
            .and_then(Value::as_u64)
            .is_some_and(|total| offset + records.len() as u64 >= total);
        Page {
            records,
            next: (!exhausted).then_some(PageToken::Number(next_offset)),
        }
    }
}

fn offset_of(token: &PageToken) -> Result<u64, SyncError> {
    match token {
        PageToken::Number(n) => Ok(*n),
        PageToken::Opaque(s) => s
            .parse()
            .map_err(|_| SyncError::transport(NAME, format!("offset token `{s}` is not numeric"))),
    }
}

#[async_trait]
impl SourceAdapter for AsosAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn mapping(&self) -> &CatalogMapping {
        &self.mapping
    }

    fn initial_token(&self) -> PageToken {
        PageToken::Number(0)
    }

    async fn fetch_page(
        &self,
        category_code: &str,
        size_code: &str,
        token: &PageToken,
    ) -> Result<Page, SyncError> {
        let offset = offset_of(token)?;
        let url = format!(
            "{}/api/product/search/v2/categories/{category_code}",
            self.base_url
        );
        let offset_s = offset.to_string();
        let limit_s = self.page_size.to_string();
        let params = [
            ("offset", offset_s.as_str()),
            ("includeNonPurchasableTypes", "restocking"),
            ("store", "COM"),
            ("lang", "en-GB"),
            ("currency", "GBP"),
            ("rowlength", "2"),
            ("channel", "mobile-web"),
            ("country", "GB"),
            ("keyStoreDataversion", "mhabj1f-41"),
            ("advertisementsPartnerId", "100712"),
            ("advertisementsOptInConsent", "false"),
            ("limit", limit_s.as_str()),
            ("size", size_code),
        ];
        let body = get_json(NAME, self.client.get(&url).query(&params)).await?;
        Ok(Self::parse_page(&body, offset, self.page_size))
    }

    fn normalize(
        &self,
        raw: &RawRecord,
        size_label: &str,
        category_name: &str,
    ) -> Result<Item, SyncError> {
        let source_id = required_id(NAME, raw, "id")?;
        let name = normalize_text(required_str(NAME, raw, &["name"])?);
        if name.is_empty() {
            return Err(SyncError::malformed(NAME, "blank `name`"));
        }
        let price = required_price(NAME, raw, &["price", "current", "value"])?;
        let url = absolute_url(NAME, SITE_ROOT, required_str(NAME, raw, &["url"])?)?;
        let image_url = raw
            .get("imageUrl")
            .and_then(Value::as_str)
            .and_then(absolute_image_url);

        Ok(Item {
            unique_key: unique_key(&source_id, size_label),
            source_id,
            name,
            price: Some(price),
            size: size_label.to_string(),
            category: category_name.to_string(),
            url,
            image_url,
            availability: "In Stock".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn adapter() -> AsosAdapter {
        AsosAdapter::new(reqwest::Client::new(), default_mapping())
    }

    #[test]
    fn normalizes_a_search_product() {
        let raw = json!({
            "id": 205_512_345,
            "name": "ASOS DESIGN  oversized knitted jumper",
            "price": {"current": {"value": 32.0, "text": "£32.00"}},
            "url": "asos-design/asos-design-oversized-knitted-jumper/prd/205512345",
            "imageUrl": "images.asos-media.com/products/x/205512345-1"
        });
        let item = adapter().normalize(&raw, "3XL", "Jumpers").unwrap();
        assert_eq!(item.unique_key, "205512345-3XL");
        assert_eq!(item.name, "ASOS DESIGN oversized knitted jumper");
        assert_eq!(item.price, Some(32.0));
        assert_eq!(
            item.url,
            "https://www.asos.com/asos-design/asos-design-oversized-knitted-jumper/prd/205512345"
        );
        assert_eq!(
            item.image_url.as_deref(),
            Some("https://images.asos-media.com/products/x/205512345-1")
        );
        assert_eq!(item.availability, "In Stock");
    }

    #[test]
    fn missing_price_is_malformed() {
        let raw = json!({"id": 1, "name": "x", "url": "a/prd/1", "price": {"current": {}}});
        assert!(matches!(
            adapter().normalize(&raw, "3XL", "Jumpers"),
            Err(SyncError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn item_count_stops_pagination_early() {
        let body = json!({"itemCount": 74, "products": [{"id": 1}, {"id": 2}]});
        let page = AsosAdapter::parse_page(&body, 72, 72);
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.next, None);

        let body = json!({"itemCount": 500, "products": [{"id": 1}]});
        let page = AsosAdapter::parse_page(&body, 0, 72);
        assert_eq!(page.next, Some(PageToken::Number(72)));
    }

    #[test]
    fn empty_products_is_exhausted() {
        let page = AsosAdapter::parse_page(&json!({"products": []}), 144, 72);
        assert!(page.records.is_empty());
        assert!(page.next.is_none());
    }
}
