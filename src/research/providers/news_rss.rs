// src/research/providers/news_rss.rs
use async_trait::async_trait;
use once_cell::sync::Lazy;
use quick_xml::de::from_str;
use regex::{Captures, Regex};
use serde::Deserialize;
use std::borrow::Cow;
use std::time::Duration;

use crate::config::ResearchConfig;
use crate::error::EvidenceError;
use crate::research::types::{Locale, SearchProvider, SearchResult};

const ENDPOINT: &str = "https://news.google.com/rss/search";

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
}

/// Parse a news RSS search feed into search results, at most `limit` of them.
pub fn parse_news_rss(xml: &str, limit: usize) -> Result<Vec<SearchResult>, EvidenceError> {
    let xml_clean = decode_html_named_entities(xml);
    let rss: Rss = from_str(&xml_clean)
        .map_err(|e| EvidenceError::ProviderUnavailable(format!("news_rss: bad xml: {e}")))?;

    let mut out = Vec::with_capacity(rss.channel.item.len().min(limit));
    for it in rss.channel.item {
        let Some(url) = it.link.map(|l| l.trim().to_string()).filter(|l| !l.is_empty()) else {
            continue;
        };
        out.push(SearchResult {
            title: crate::extract::page_text(it.title.as_deref().unwrap_or_default()),
            url,
            snippet: crate::extract::page_text(it.description.as_deref().unwrap_or_default()),
        });
        if out.len() >= limit {
            break;
        }
    }
    Ok(out)
}

/// `hl`, `gl` and `ceid` query values for a locale, e.g. ("en-AU", "AU", "AU:en").
fn feed_locale(locale: &Locale) -> (String, String, String) {
    let gl = locale.gl.to_ascii_uppercase();
    let hl = format!("{}-{}", locale.hl, gl);
    let ceid = format!("{}:{}", gl, locale.hl);
    (hl, gl, ceid)
}

enum Mode {
    Fixture(String),
    Http {
        client: reqwest::Client,
        timeout: Duration,
    },
}

/// Google News RSS search. Needs no credentials, so it backs up the JSON API.
pub struct NewsRssProvider {
    mode: Mode,
    limit: usize,
}

impl NewsRssProvider {
    pub fn from_config(cfg: &ResearchConfig) -> Self {
        Self {
            mode: Mode::Http {
                client: reqwest::Client::new(),
                timeout: cfg.search_timeout(),
            },
            limit: cfg.results_per_query as usize,
        }
    }

    pub fn from_fixture(xml: &str) -> Self {
        Self {
            mode: Mode::Fixture(xml.to_string()),
            limit: 10,
        }
    }
}

#[async_trait]
impl SearchProvider for NewsRssProvider {
    async fn search(&self, query: &str, locale: &Locale) -> Result<Vec<SearchResult>, EvidenceError> {
        match &self.mode {
            Mode::Fixture(s) => parse_news_rss(s, self.limit),
            Mode::Http { client, timeout } => {
                let (hl, gl, ceid) = feed_locale(locale);
                let req = client.get(ENDPOINT).query(&[
                    ("q", query),
                    ("hl", hl.as_str()),
                    ("gl", gl.as_str()),
                    ("ceid", ceid.as_str()),
                ]);
                let fut = async {
                    let resp = req.send().await.map_err(|e| {
                        tracing::warn!(target: "research", error = ?e, provider = "news_rss", "provider http error");
                        EvidenceError::ProviderUnavailable(format!("news_rss: {e}"))
                    })?;
                    resp.text()
                        .await
                        .map_err(|e| EvidenceError::ProviderUnavailable(format!("news_rss: {e}")))
                };
                let body = tokio::time::timeout(*timeout, fut)
                    .await
                    .map_err(|_| EvidenceError::FetchTimeout {
                        url: ENDPOINT.to_string(),
                        timeout_ms: timeout.as_millis() as u64,
                    })??;
                parse_news_rss(&body, self.limit)
            }
        }
    }

    fn name(&self) -> &'static str {
        "news_rss"
    }
}

/// News feeds carry HTML named entities (`&ndash;`, `&nbsp;`, `&eacute;`) that
/// XML does not define. Decode those up front and leave the five XML ones to
/// the parser; names HTML does not know either are kept as literal text.
fn decode_html_named_entities(xml: &str) -> Cow<'_, str> {
    static NAMED: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"&([A-Za-z][A-Za-z0-9]{1,31});").expect("entity regex"));
    NAMED.replace_all(xml, |c: &Captures<'_>| {
        let (whole, name) = (&c[0], &c[1]);
        if matches!(name, "amp" | "lt" | "gt" | "quot" | "apos") {
            return whole.to_string();
        }
        let decoded = html_escape::decode_html_entities(whole);
        if decoded == whole {
            format!("&amp;{name};")
        } else {
            html_escape::encode_text(&decoded).into_owned()
        }
    })
}
