// src/research/encyclopedia.rs
//! Title canonicalization for brand/category names before they go into
//! search queries. Every failure falls back to the raw string.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::error::EvidenceError;

const ENDPOINT: &str = "https://en.wikipedia.org/w/api.php";

#[async_trait]
pub trait Encyclopedia: Send + Sync {
    /// Best matching article title, or `None` when the lookup found nothing.
    async fn canonical_title(&self, name: &str) -> Result<Option<String>, EvidenceError>;
}

/// Wikipedia `opensearch` with `limit=1`.
pub struct WikipediaOpenSearch {
    client: reqwest::Client,
    timeout: Duration,
}

impl WikipediaOpenSearch {
    pub fn new(timeout: Duration, user_agent: &str) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client, timeout }
    }
}

/// Opensearch returns `[query, [titles], [descriptions], [urls]]`.
pub fn parse_opensearch(body: &str) -> Result<Option<String>, EvidenceError> {
    let v: Value = serde_json::from_str(body)
        .map_err(|e| EvidenceError::ProviderUnavailable(format!("encyclopedia: bad json: {e}")))?;
    Ok(v.get(1)
        .and_then(Value::as_array)
        .and_then(|titles| titles.first())
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string))
}

#[async_trait]
impl Encyclopedia for WikipediaOpenSearch {
    async fn canonical_title(&self, name: &str) -> Result<Option<String>, EvidenceError> {
        let req = self.client.get(ENDPOINT).query(&[
            ("action", "opensearch"),
            ("search", name),
            ("limit", "1"),
            ("namespace", "0"),
            ("format", "json"),
        ]);
        let fut = async {
            let resp = req
                .send()
                .await
                .map_err(|e| EvidenceError::ProviderUnavailable(format!("encyclopedia: {e}")))?;
            resp.text()
                .await
                .map_err(|e| EvidenceError::ProviderUnavailable(format!("encyclopedia: {e}")))
        };
        let body = tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| EvidenceError::FetchTimeout {
                url: ENDPOINT.to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            })??;
        parse_opensearch(&body)
    }
}

/// Accept a looked-up title only when it plausibly names the same thing.
pub fn is_plausible_title(raw: &str, title: &str) -> bool {
    let r = raw.trim().to_lowercase();
    let t = title.trim().to_lowercase();
    if r.is_empty() || t.is_empty() {
        return false;
    }
    t.contains(&r) || r.contains(&t) || strsim::jaro_winkler(&r, &t) >= 0.85
}

/// "Dyson (company)" -> "Dyson".
fn strip_qualifier(title: &str) -> &str {
    match title.find(" (") {
        Some(i) if title.ends_with(')') => title[..i].trim(),
        _ => title.trim(),
    }
}

/// Canonical name for `raw`, or `raw` itself on any failure.
pub async fn canonicalize(enc: Option<&dyn Encyclopedia>, raw: &str) -> String {
    let raw_t = raw.trim();
    let Some(enc) = enc else {
        return raw_t.to_string();
    };
    if raw_t.is_empty() {
        return String::new();
    }
    match enc.canonical_title(raw_t).await {
        Ok(Some(t)) => {
            let t = strip_qualifier(&t);
            if is_plausible_title(raw_t, t) {
                t.to_string()
            } else {
                raw_t.to_string()
            }
        }
        Ok(None) => raw_t.to_string(),
        Err(e) => {
            tracing::debug!(target: "research", kind = e.kind(), error = %e, "encyclopedia lookup failed");
            raw_t.to_string()
        }
    }
}
