// src/ingest/providers/mod.rs
pub mod asos;
pub mod hnm;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::error::SyncError;
use crate::ingest::config::{HttpCfg, SyncConfig};
use crate::ingest::types::SourceAdapter;

/// Adapters keyed by the source name used in queries.
pub type AdapterSet = BTreeMap<String, Arc<dyn SourceAdapter>>;

pub fn build_client(http: &HttpCfg) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(http.user_agent.clone())
        .timeout(Duration::from_secs(http.timeout_secs))
        .build()
}

/// Build every known adapter, layering `[sources.<name>]` overrides on top of
/// the built-in mapping tables.
pub fn build_adapters(cfg: &SyncConfig) -> Result<AdapterSet> {
    let client = build_client(&cfg.http).context("building http client")?;
    let mut set = AdapterSet::new();

    let mut asos = asos::AsosAdapter::new(client.clone(), asos::default_mapping());
    if let Some(o) = cfg.sources.get(asos::NAME) {
        asos = asos.with_overrides(o);
    }
    set.insert(asos::NAME.to_string(), Arc::new(asos));

    let mut hnm = hnm::HnmAdapter::new(client, hnm::default_mapping());
    if let Some(o) = cfg.sources.get(hnm::NAME) {
        hnm = hnm.with_overrides(o);
    }
    set.insert(hnm::NAME.to_string(), Arc::new(hnm));

    for name in cfg.sources.keys() {
        if !set.contains_key(name) {
            tracing::warn!(target: "sync", source = %name, "config has overrides for unknown source");
        }
    }
    Ok(set)
}

// --- JSON field helpers shared by adapters ---

/// Follow a path of object keys / array indexes.
pub(crate) fn pluck<'a>(v: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(v, |cur, key| match key.parse::<usize>() {
        Ok(i) if cur.is_array() => cur.get(i),
        _ => cur.get(*key),
    })
}

/// Ids come back as numbers from one API and strings from the other.
pub(crate) fn required_id(source: &str, v: &Value, field: &str) -> Result<String, SyncError> {
    match v.get(field) {
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(SyncError::malformed(source, format!("missing `{field}`"))),
    }
}

pub(crate) fn required_str<'a>(
    source: &str,
    v: &'a Value,
    path: &[&str],
) -> Result<&'a str, SyncError> {
    pluck(v, path)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| SyncError::malformed(source, format!("missing `{}`", path.join("."))))
}

pub(crate) fn required_price(source: &str, v: &Value, path: &[&str]) -> Result<f64, SyncError> {
    let raw = pluck(v, path);
    raw.and_then(|p| match p {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
    .ok_or_else(|| SyncError::malformed(source, format!("missing `{}`", path.join("."))))
}

/// Resolve a catalog-relative link against the retailer's site root.
pub(crate) fn absolute_url(source: &str, base: &str, link: &str) -> Result<String, SyncError> {
    url::Url::parse(base)
        .and_then(|b| b.join(link.trim()))
        .map(String::from)
        .map_err(|e| SyncError::malformed(source, format!("bad url `{link}`: {e}")))
}

/// Image hosts often come back scheme-less (`images.example.com/...`).
pub(crate) fn absolute_image_url(link: &str) -> Option<String> {
    let link = link.trim();
    if link.is_empty() {
        return None;
    }
    if let Some(rest) = link.strip_prefix("//") {
        return Some(format!("https://{rest}"));
    }
    match url::Url::parse(link) {
        Ok(u) => Some(u.into()),
        Err(_) => url::Url::parse(&format!("https://{link}")).ok().map(Into::into),
    }
}

/// Map a reqwest failure (send, status or body decode) to a transport error.
pub(crate) async fn get_json(
    source: &str,
    req: reqwest::RequestBuilder,
) -> Result<Value, SyncError> {
    let resp = req
        .send()
        .await
        .map_err(|e| SyncError::transport(source, e))?
        .error_for_status()
        .map_err(|e| SyncError::transport(source, e))?;
    resp.json::<Value>()
        .await
        .map_err(|e| SyncError::transport(source, format!("decoding body: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pluck_walks_objects_and_arrays() {
        let v = json!({"prices": [{"price": 19.99}]});
        assert_eq!(pluck(&v, &["prices", "0", "price"]), Some(&json!(19.99)));
        assert_eq!(pluck(&v, &["prices", "1", "price"]), None);
    }

    #[test]
    fn ids_accept_numbers_and_strings() {
        assert_eq!(required_id("t", &json!({"id": 42}), "id").unwrap(), "42");
        assert_eq!(required_id("t", &json!({"id": "0970818"}), "id").unwrap(), "0970818");
        assert!(required_id("t", &json!({"id": null}), "id").is_err());
    }

    #[test]
    fn image_links_become_absolute() {
        assert_eq!(
            absolute_image_url("images.asos-media.com/products/x/1").as_deref(),
            Some("https://images.asos-media.com/products/x/1")
        );
        assert_eq!(
            absolute_image_url("//lp2.hm.com/img.jpg").as_deref(),
            Some("https://lp2.hm.com/img.jpg")
        );
        assert_eq!(absolute_image_url(""), None);
    }

    #[test]
    fn product_links_join_site_root() {
        let u = absolute_url("t", "https://www2.hm.com", "/en_gb/productpage.1.html").unwrap();
        assert_eq!(u, "https://www2.hm.com/en_gb/productpage.1.html");
    }
}
