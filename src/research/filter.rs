// src/research/filter.rs
//! Result hygiene: hard blocklist, sensitive-category filter, dedup.

use std::collections::HashSet;
use url::Url;

use super::types::SearchResult;

/// Social and low-credibility hosts. Matched on the host or any parent domain.
pub const BLOCKED_HOSTS: &[&str] = &[
    "facebook.com",
    "instagram.com",
    "tiktok.com",
    "twitter.com",
    "x.com",
    "pinterest.com",
    "pinterest.com.au",
    "reddit.com",
    "youtube.com",
    "linkedin.com",
    "quora.com",
    "scribd.com",
    "slideshare.net",
    "threads.net",
];

/// Ordering-intent hosts (delivery apps, marketplaces).
pub const ORDERING_HOSTS: &[&str] = &[
    "ubereats.com",
    "doordash.com",
    "menulog.com.au",
    "deliveroo.com.au",
    "deliveroo.co.uk",
    "amazon.com",
    "amazon.com.au",
    "ebay.com",
    "ebay.com.au",
];

/// Liquor retailers: product/price pages rather than promotion evidence.
pub const LIQUOR_RETAILER_HOSTS: &[&str] = &[
    "danmurphys.com.au",
    "bws.com.au",
    "liquorland.com.au",
    "firstchoiceliquor.com.au",
    "vintagecellars.com.au",
    "liquorbarons.com.au",
    "boozebud.com",
    "jimmybrings.com.au",
];

/// Whole path segments that mark a shopping or ordering page.
const ORDERING_SEGMENTS: &[&str] = &[
    "cart", "checkout", "order", "orders", "product", "products", "shop", "buy", "buy-now",
];

/// Lower-cased host with `www.` stripped.
pub fn host_of(url: &str) -> Option<String> {
    let u = Url::parse(url).ok()?;
    let h = u.host_str()?.to_ascii_lowercase();
    Some(h.strip_prefix("www.").unwrap_or(&h).to_string())
}

fn host_matches(host: &str, list: &[&str]) -> bool {
    list.iter()
        .any(|d| host == *d || host.ends_with(&format!(".{d}")))
}

pub fn is_blocked(host: &str) -> bool {
    host_matches(host, BLOCKED_HOSTS)
}

/// Drop results whose host is blocklisted or whose URL does not parse.
/// Returns (kept, dropped_count).
pub fn apply_blocklist(results: Vec<SearchResult>) -> (Vec<SearchResult>, usize) {
    let before = results.len();
    let kept: Vec<SearchResult> = results
        .into_iter()
        .filter(|r| host_of(&r.url).is_some_and(|h| !is_blocked(&h)))
        .collect();
    let dropped = before - kept.len();
    (kept, dropped)
}

fn has_ordering_intent(url: &str) -> bool {
    let Ok(u) = Url::parse(url) else {
        return false;
    };
    let host = u.host_str().unwrap_or_default().to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    if host_matches(host, ORDERING_HOSTS) || host_matches(host, LIQUOR_RETAILER_HOSTS) {
        return true;
    }
    u.path_segments().is_some_and(|mut segs| {
        segs.any(|seg| ORDERING_SEGMENTS.iter().any(|o| seg.eq_ignore_ascii_case(o)))
    })
}

/// Extra filter for legally sensitive categories and on-premise activations.
///
/// Drops ordering-intent and liquor-retailer URLs. When that would leave
/// nothing, the unfiltered set is returned instead.
/// Returns (results, dropped_count, fell_back).
pub fn sensitive_filter(results: Vec<SearchResult>, apply: bool) -> (Vec<SearchResult>, usize, bool) {
    if !apply || results.is_empty() {
        return (results, 0, false);
    }
    let kept: Vec<SearchResult> = results
        .iter()
        .filter(|r| !has_ordering_intent(&r.url))
        .cloned()
        .collect();
    if kept.is_empty() {
        return (results, 0, true);
    }
    let dropped = results.len() - kept.len();
    (kept, dropped, false)
}

/// Normalized `host+path` key: host lower-cased without `www.`, path without
/// trailing slash. Query and fragment are ignored.
pub fn dedup_key(url: &str) -> Option<String> {
    let u = Url::parse(url).ok()?;
    let h = u.host_str()?.to_ascii_lowercase();
    let h = h.strip_prefix("www.").unwrap_or(&h);
    let path = u.path().trim_end_matches('/');
    Some(format!("{h}{path}"))
}

/// First occurrence wins. Returns (kept, dropped_count).
pub fn dedup_results(results: Vec<SearchResult>) -> (Vec<SearchResult>, usize) {
    let mut seen: HashSet<String> = HashSet::new();
    let mut keep = Vec::with_capacity(results.len());
    let mut dropped = 0usize;
    for r in results {
        let key = dedup_key(&r.url).unwrap_or_else(|| r.url.clone());
        if !seen.insert(key) {
            dropped += 1;
            continue;
        }
        keep.push(r);
    }
    (keep, dropped)
}
