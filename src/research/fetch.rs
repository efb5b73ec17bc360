// src/research/fetch.rs
//! Page fetch: one trait seam, one reqwest-backed implementation, and a
//! bounded pool that keeps input order.

use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt};
use metrics::{counter, histogram};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use super::types::Locale;
use crate::config::research::clamp_concurrency;
use crate::config::ResearchConfig;
use crate::error::EvidenceError;
use crate::metrics as m;

/// A page body, already truncated to the configured byte cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub url: String,
    pub body: String,
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// One GET. `deadline` stops retries once passed; an attempt already in
    /// flight still runs to its own timeout.
    async fn fetch(
        &self,
        url: &str,
        locale: &Locale,
        deadline: Option<Instant>,
    ) -> Result<FetchedPage, EvidenceError>;
}

pub struct HttpPageFetcher {
    client: reqwest::Client,
    user_agent: String,
    timeout: Duration,
    retries: u32,
    max_body_bytes: usize,
}

impl HttpPageFetcher {
    pub fn new(cfg: &ResearchConfig) -> Self {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            user_agent: cfg.user_agent.clone(),
            timeout: cfg.fetch_timeout(),
            retries: cfg.fetch_retries,
            max_body_bytes: cfg.max_body_bytes,
        }
    }

    async fn attempt(&self, url: &str, locale: &Locale) -> Result<String, EvidenceError> {
        let req = self
            .client
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8")
            .header(ACCEPT_LANGUAGE, &locale.accept_language);

        let fut = async {
            let resp = req.send().await.map_err(|e| EvidenceError::FetchFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
            let status = resp.status();
            if !status.is_success() {
                return Err(EvidenceError::FetchFailed {
                    url: url.to_string(),
                    reason: format!("http {}", status.as_u16()),
                });
            }
            let chunks = stream::unfold(resp, |mut r| async move {
                match r.chunk().await {
                    Ok(Some(c)) => Some((Ok(c), r)),
                    Ok(None) => None,
                    Err(e) => Some((Err(e), r)),
                }
            });
            read_capped(chunks, self.max_body_bytes)
                .await
                .map_err(|e| EvidenceError::FetchFailed {
                    url: url.to_string(),
                    reason: e.to_string(),
                })
        };

        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(bytes)) => Ok(truncate_body(&bytes, self.max_body_bytes)),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(EvidenceError::FetchTimeout {
                url: url.to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        }
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(
        &self,
        url: &str,
        locale: &Locale,
        deadline: Option<Instant>,
    ) -> Result<FetchedPage, EvidenceError> {
        let mut last = None;
        for attempt in 0..=self.retries {
            if attempt > 0 && deadline.is_some_and(|d| Instant::now() >= d) {
                tracing::debug!(target: "research", url, "deadline passed, not retrying");
                break;
            }
            match self.attempt(url, locale).await {
                Ok(body) => {
                    return Ok(FetchedPage {
                        url: url.to_string(),
                        body,
                    })
                }
                Err(e) => {
                    tracing::debug!(target: "research", url, attempt, error = %e, "fetch attempt failed");
                    last = Some(e);
                }
            }
        }
        Err(last.unwrap_or_else(|| EvidenceError::FetchFailed {
            url: url.to_string(),
            reason: "no attempt made".into(),
        }))
    }
}

/// Pull body chunks until `cap` bytes are buffered or the body ends. The rest
/// of the response is never read.
pub async fn read_capped<S, B, E>(chunks: S, cap: usize) -> Result<Vec<u8>, E>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    let mut chunks = std::pin::pin!(chunks);
    let mut buf = Vec::with_capacity(cap.min(64 * 1024));
    while buf.len() < cap {
        match chunks.next().await {
            Some(chunk) => buf.extend_from_slice(chunk?.as_ref()),
            None => break,
        }
    }
    Ok(buf)
}

/// Lossy UTF-8 decode of at most `cap` bytes.
pub fn truncate_body(bytes: &[u8], cap: usize) -> String {
    let end = bytes.len().min(cap);
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Fetch every target with at most `limit` requests in flight.
///
/// Results come back in input order, one per target. A failure only affects
/// its own slot; `limit` is clamped to the allowed pool size.
pub async fn fetch_all(
    fetcher: Arc<dyn PageFetcher>,
    targets: Vec<String>,
    locale: &Locale,
    limit: usize,
    deadline: Option<Instant>,
) -> Vec<(String, Result<FetchedPage, EvidenceError>)> {
    m::ensure_metrics_described();
    let limit = clamp_concurrency(limit);

    stream::iter(targets.into_iter().map(|url| {
        let fetcher = Arc::clone(&fetcher);
        let locale = locale.clone();
        async move {
            let t0 = std::time::Instant::now();
            let res = fetcher.fetch(&url, &locale, deadline).await;
            histogram!(m::FETCH_MS).record(t0.elapsed().as_secs_f64() * 1_000.0);
            match &res {
                Ok(_) => counter!(m::PAGES_FETCHED_TOTAL).increment(1),
                Err(e) => {
                    tracing::warn!(target: "research", url = %url, kind = e.kind(), "page fetch dropped");
                    counter!(m::FETCH_ERRORS_TOTAL).increment(1);
                }
            }
            (url, res)
        }
    }))
    .buffered(limit)
    .collect::<Vec<_>>()
    .await
}
