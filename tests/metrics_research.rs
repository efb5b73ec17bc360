// tests/metrics_research.rs
#![cfg(feature = "strict-metrics")]
use async_trait::async_trait;
use metrics_exporter_prometheus::PrometheusBuilder;
use offer_iq::cache::{MemoryCacheStore, ResearchCache};
use offer_iq::config::ResearchConfig;
use offer_iq::error::EvidenceError;
use offer_iq::research::fetch::{FetchedPage, PageFetcher};
use offer_iq::research::providers::{GoogleCseProvider, ProviderChain};
use offer_iq::research::types::{DepthLevel, Locale, SearchProvider, SearchResult};
use offer_iq::research::ResearchCollector;
use offer_iq::{CampaignContext, Evaluator};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

struct Down;

#[async_trait]
impl SearchProvider for Down {
    async fn search(&self, _q: &str, _l: &Locale) -> Result<Vec<SearchResult>, EvidenceError> {
        Err(EvidenceError::ProviderUnavailable("down".into()))
    }
    fn name(&self) -> &'static str {
        "down"
    }
}

/// Serves the cashback page for the Samsung URL, fails everything else.
struct OnePage;

#[async_trait]
impl PageFetcher for OnePage {
    async fn fetch(
        &self,
        url: &str,
        _locale: &Locale,
        _deadline: Option<Instant>,
    ) -> Result<FetchedPage, EvidenceError> {
        if url.contains("samsung.com") {
            Ok(FetchedPage {
                url: url.into(),
                body: include_str!("fixtures/pages/samsung_cashback.html").into(),
            })
        } else {
            Err(EvidenceError::FetchFailed {
                url: url.into(),
                reason: "http 500".into(),
            })
        }
    }
}

#[tokio::test]
async fn research_series_are_exposed() {
    let handle = PrometheusBuilder::new().install_recorder().expect("recorder");

    let chain = ProviderChain::new(vec![
        Box::new(Down),
        Box::new(GoogleCseProvider::from_fixture(include_str!(
            "fixtures/cse_appliances.json"
        ))),
    ]);
    let collector = ResearchCollector::new(chain, Arc::new(OnePage), ResearchConfig::default());
    let cache = ResearchCache::new(Arc::new(MemoryCacheStore::new()), Duration::from_secs(600));
    let evaluator = Evaluator::new(collector).with_cache(cache);

    let campaign =
        CampaignContext::from_json(include_str!("fixtures/brief_appliances_cashback_10.json"))
            .expect("brief");
    let _ = evaluator.evaluate(&campaign, DepthLevel::Deep).await;
    let _ = evaluator.evaluate(&campaign, DepthLevel::Deep).await;

    let out = handle.render();
    for name in [
        "research_queries_total",
        "research_provider_fallbacks_total",
        "research_pages_fetched_total",
        "research_fetch_errors_total",
        "research_promos_kept_total",
        "research_cache_hits_total",
        "research_cache_misses_total",
        "research_fetch_ms",
    ] {
        assert!(out.contains(name), "missing {name} in:\n{out}");
    }
}
