// src/research/providers/google_cse.rs
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::config::ResearchConfig;
use crate::error::EvidenceError;
use crate::research::types::{Locale, SearchProvider, SearchResult};

const ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

#[derive(Debug, Deserialize)]
struct CseResponse {
    #[serde(default)]
    items: Vec<CseItem>,
}

#[derive(Debug, Deserialize)]
struct CseItem {
    title: Option<String>,
    link: Option<String>,
    snippet: Option<String>,
}

/// Parse a Custom Search JSON body. Items without a link are skipped;
/// a body without `items` is a valid empty result.
pub fn parse_cse_response(body: &str) -> Result<Vec<SearchResult>, EvidenceError> {
    let resp: CseResponse = serde_json::from_str(body)
        .map_err(|e| EvidenceError::ProviderUnavailable(format!("google_cse: bad json: {e}")))?;
    Ok(resp
        .items
        .into_iter()
        .filter_map(|it| {
            let url = it.link?.trim().to_string();
            if url.is_empty() {
                return None;
            }
            Some(SearchResult {
                title: crate::extract::page_text(it.title.as_deref().unwrap_or_default()),
                url,
                snippet: crate::extract::page_text(it.snippet.as_deref().unwrap_or_default()),
            })
        })
        .collect())
}

enum Mode {
    Fixture(String),
    Http {
        client: reqwest::Client,
        key: String,
        cx: String,
        num: u32,
        timeout: Duration,
    },
    Unconfigured,
}

/// Google Custom Search JSON API. First in the default provider chain.
pub struct GoogleCseProvider {
    mode: Mode,
}

impl GoogleCseProvider {
    /// Live provider; without a key and engine id every call reports
    /// `ProviderUnavailable` so the chain moves on.
    pub fn from_config(cfg: &ResearchConfig) -> Self {
        let resolved = |v: &Option<String>| v.clone().filter(|s| !s.trim().eq_ignore_ascii_case("env"));
        let mode = match (resolved(&cfg.google_cse_key), resolved(&cfg.google_cse_cx)) {
            (Some(key), Some(cx)) => Mode::Http {
                client: reqwest::Client::new(),
                key,
                cx,
                num: cfg.results_per_query,
                timeout: cfg.search_timeout(),
            },
            _ => Mode::Unconfigured,
        };
        Self { mode }
    }

    /// Canned JSON body, returned for every query.
    pub fn from_fixture(body: &str) -> Self {
        Self {
            mode: Mode::Fixture(body.to_string()),
        }
    }

    pub fn is_configured(&self) -> bool {
        !matches!(self.mode, Mode::Unconfigured)
    }
}

#[async_trait]
impl SearchProvider for GoogleCseProvider {
    async fn search(&self, query: &str, locale: &Locale) -> Result<Vec<SearchResult>, EvidenceError> {
        match &self.mode {
            Mode::Fixture(s) => parse_cse_response(s),
            Mode::Unconfigured => Err(EvidenceError::ProviderUnavailable(
                "google_cse: missing api key or engine id".into(),
            )),
            Mode::Http {
                client,
                key,
                cx,
                num,
                timeout,
            } => {
                let num = num.to_string();
                let req = client.get(ENDPOINT).query(&[
                    ("key", key.as_str()),
                    ("cx", cx.as_str()),
                    ("q", query),
                    ("gl", locale.gl.as_str()),
                    ("hl", locale.hl.as_str()),
                    ("num", num.as_str()),
                ]);
                let fut = async {
                    let resp = req.send().await.map_err(|e| {
                        tracing::warn!(target: "research", error = ?e, provider = "google_cse", "provider http error");
                        EvidenceError::ProviderUnavailable(format!("google_cse: {e}"))
                    })?;
                    if !resp.status().is_success() {
                        return Err(EvidenceError::ProviderUnavailable(format!(
                            "google_cse: http {}",
                            resp.status().as_u16()
                        )));
                    }
                    resp.text()
                        .await
                        .map_err(|e| EvidenceError::ProviderUnavailable(format!("google_cse: {e}")))
                };
                let body = tokio::time::timeout(*timeout, fut)
                    .await
                    .map_err(|_| EvidenceError::FetchTimeout {
                        url: ENDPOINT.to_string(),
                        timeout_ms: timeout.as_millis() as u64,
                    })??;
                parse_cse_response(&body)
            }
        }
    }

    fn name(&self) -> &'static str {
        "google_cse"
    }
}
