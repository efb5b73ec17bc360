// src/metrics.rs
//! Metric names and one-time descriptions for the research pipeline.
//! The crate never installs a recorder; the host application does.

use ::metrics::{describe_counter, describe_histogram};
use once_cell::sync::OnceCell;

pub const QUERIES_TOTAL: &str = "research_queries_total";
pub const PROVIDER_FALLBACKS_TOTAL: &str = "research_provider_fallbacks_total";
pub const PAGES_FETCHED_TOTAL: &str = "research_pages_fetched_total";
pub const FETCH_ERRORS_TOTAL: &str = "research_fetch_errors_total";
pub const PROMOS_KEPT_TOTAL: &str = "research_promos_kept_total";
pub const CACHE_HITS_TOTAL: &str = "research_cache_hits_total";
pub const CACHE_MISSES_TOTAL: &str = "research_cache_misses_total";
pub const FETCH_MS: &str = "research_fetch_ms";

/// One-time metrics registration (so series carry help text on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(QUERIES_TOTAL, "Search queries issued through the provider chain.");
        describe_counter!(
            PROVIDER_FALLBACKS_TOTAL,
            "Queries where a provider failed or returned nothing and the next was tried."
        );
        describe_counter!(PAGES_FETCHED_TOTAL, "Competitor pages fetched successfully.");
        describe_counter!(
            FETCH_ERRORS_TOTAL,
            "Page fetches that failed or timed out."
        );
        describe_counter!(
            PROMOS_KEPT_TOTAL,
            "Competitor promotions kept after signal extraction."
        );
        describe_counter!(CACHE_HITS_TOTAL, "Research cache hits.");
        describe_counter!(
            CACHE_MISSES_TOTAL,
            "Research cache misses (absent, stale, bypassed or unreadable)."
        );
        describe_histogram!(FETCH_MS, "Page fetch time in milliseconds.");
    });
}
