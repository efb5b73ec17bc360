// tests/pipeline_e2e.rs
use async_trait::async_trait;
use offer_iq::cache::{MemoryCacheStore, ResearchCache};
use offer_iq::config::ResearchConfig;
use offer_iq::error::EvidenceError;
use offer_iq::research::fetch::{FetchedPage, PageFetcher};
use offer_iq::research::providers::{GoogleCseProvider, ProviderChain};
use offer_iq::research::types::{DepthLevel, Locale};
use offer_iq::research::ResearchCollector;
use offer_iq::scoreboard::Status;
use offer_iq::{CampaignContext, Category, Evaluator, Verdict};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

struct Pages {
    bodies: HashMap<&'static str, &'static str>,
    calls: AtomicUsize,
}

impl Pages {
    fn fixtures() -> Self {
        let mut bodies = HashMap::new();
        bodies.insert(
            "https://www.samsung.com/au/offer/bespoke-cashback/",
            include_str!("fixtures/pages/samsung_cashback.html"),
        );
        bodies.insert(
            "https://www.lg.com/au/promotions/win-your-kitchen/",
            include_str!("fixtures/pages/lg_competition.html"),
        );
        bodies.insert(
            "https://www.bosch-home.com.au/promotions/bonus-gift",
            include_str!("fixtures/pages/bosch_gift.html"),
        );
        Self {
            bodies,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PageFetcher for Pages {
    async fn fetch(
        &self,
        url: &str,
        _locale: &Locale,
        _deadline: Option<Instant>,
    ) -> Result<FetchedPage, EvidenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.bodies
            .get(url)
            .map(|b| FetchedPage {
                url: url.into(),
                body: (*b).into(),
            })
            .ok_or_else(|| EvidenceError::FetchFailed {
                url: url.into(),
                reason: "http 404".into(),
            })
    }
}

fn evaluator(pages: Arc<Pages>) -> Evaluator {
    let chain = ProviderChain::new(vec![Box::new(GoogleCseProvider::from_fixture(include_str!(
        "fixtures/cse_appliances.json"
    )))]);
    let collector = ResearchCollector::new(chain, pages, ResearchConfig::default());
    let cache = ResearchCache::new(Arc::new(MemoryCacheStore::new()), Duration::from_secs(3600));
    Evaluator::new(collector).with_cache(cache)
}

fn brief() -> CampaignContext {
    CampaignContext::from_json(include_str!("fixtures/brief_appliances_cashback_10.json"))
        .expect("brief")
}

#[tokio::test]
async fn lite_evaluation_of_a_thin_cashback() {
    let pages = Arc::new(Pages::fixtures());
    let ev = evaluator(Arc::clone(&pages));

    let out = ev.evaluate(&brief(), DepthLevel::Lite).await;

    assert_eq!(pages.calls.load(Ordering::SeqCst), 0);
    assert_eq!(out.profile.category, Category::Appliances);
    assert_eq!(out.offer_iq.verdict, Verdict::NoGo);
    assert_eq!(out.scoreboard.decision, Verdict::NoGo);
    assert!(out.scoreboard.overridden);
    assert_eq!(out.scoreboard.cells.reward_shape.status, Status::Red);

    let json = serde_json::to_value(&out).unwrap();
    assert_eq!(json["scoreboard"]["decision"], "NO-GO");
    assert_eq!(json["pack"]["meta"]["level"], "LITE");
}

#[tokio::test]
async fn second_deep_run_is_served_from_cache() {
    let pages = Arc::new(Pages::fixtures());
    let ev = evaluator(Arc::clone(&pages));
    let c = brief();

    let first = ev.evaluate(&c, DepthLevel::Deep).await;
    let fetched = pages.calls.load(Ordering::SeqCst);
    assert_eq!(fetched, 3);
    assert!(first.pack.meta.cached_at.is_none());
    assert_eq!(first.pack.benchmarks.cashback.typical_abs, Some(300.0));

    let second = ev.evaluate(&c, DepthLevel::Deep).await;
    assert_eq!(pages.calls.load(Ordering::SeqCst), fetched);
    assert!(second.pack.meta.cached_at.is_some());
    assert_eq!(second.pack.competitors, first.pack.competitors);
    assert_eq!(second.offer_iq, first.offer_iq);
    assert_eq!(second.scoreboard, first.scoreboard);
}

#[tokio::test]
async fn market_evidence_moves_confidence_not_the_floor() {
    let pages = Arc::new(Pages::fixtures());
    let ev = evaluator(pages);
    let c = brief();

    let lite = ev.evaluate(&c, DepthLevel::Lite).await;
    let deep = ev.evaluate(&c, DepthLevel::Deep).await;

    assert!(deep.offer_iq.confidence >= lite.offer_iq.confidence);
    assert_eq!(
        deep.offer_iq.diagnostics.representative_value,
        lite.offer_iq.diagnostics.representative_value
    );
    assert_eq!(deep.offer_iq.verdict, Verdict::NoGo);
}
