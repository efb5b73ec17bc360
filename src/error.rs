//! Evidence error taxonomy.
//!
//! None of these abort an evaluation. They explain why a piece of evidence was
//! dropped (or why a brief value was coerced to `None`), so callers and tests can
//! assert on the reason instead of guessing.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvidenceError {
    /// No search provider configured, or every provider in the chain failed.
    #[error("search provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// A page fetch (or search call) exceeded its per-request timeout.
    #[error("fetch timed out after {timeout_ms}ms: {url}")]
    FetchTimeout { url: String, timeout_ms: u64 },

    /// Network/HTTP failure for a single URL.
    #[error("fetch failed for {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    /// The page was fetched but yielded no promotion signal.
    #[error("no promotion signal found at {0}")]
    ParseEmpty(String),

    /// Cache persistence failed on read or write.
    #[error("research cache unavailable: {0}")]
    CacheUnavailable(String),

    /// A numeric/band value in the brief could not be parsed.
    #[error("malformed brief value for `{field}`: {raw:?}")]
    MalformedBriefValue { field: String, raw: String },
}

impl EvidenceError {
    /// Short machine label, used for metrics and `meta.dropped` bookkeeping.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ProviderUnavailable(_) => "provider_unavailable",
            Self::FetchTimeout { .. } => "fetch_timeout",
            Self::FetchFailed { .. } => "fetch_failed",
            Self::ParseEmpty(_) => "parse_empty",
            Self::CacheUnavailable(_) => "cache_unavailable",
            Self::MalformedBriefValue { .. } => "malformed_brief_value",
        }
    }
}
