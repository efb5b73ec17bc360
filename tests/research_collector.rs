// tests/research_collector.rs
use async_trait::async_trait;
use offer_iq::category::classify_campaign;
use offer_iq::config::ResearchConfig;
use offer_iq::error::EvidenceError;
use offer_iq::research::fetch::{FetchedPage, PageFetcher};
use offer_iq::research::providers::{GoogleCseProvider, ProviderChain};
use offer_iq::research::types::{
    DepthLevel, FactOrigin, Locale, PromoType, SearchProvider, SearchResult,
};
use offer_iq::research::ResearchCollector;
use offer_iq::CampaignContext;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::time::Instant;

const CSE_JSON: &str = include_str!("fixtures/cse_appliances.json");
const BRIEF: &str = include_str!("fixtures/brief_appliances_cashback_10.json");

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

struct Fixed(Vec<SearchResult>);

#[async_trait]
impl SearchProvider for Fixed {
    async fn search(&self, _q: &str, _l: &Locale) -> Result<Vec<SearchResult>, EvidenceError> {
        Ok(self.0.clone())
    }
    fn name(&self) -> &'static str {
        "fixed"
    }
}

/// Serves fixture pages by URL; anything else fails.
#[derive(Default)]
struct Pages {
    bodies: HashMap<String, String>,
    timeouts: Vec<String>,
    calls: AtomicUsize,
}

impl Pages {
    fn with(mut self, url: &str, body: &str) -> Self {
        self.bodies.insert(url.to_string(), body.to_string());
        self
    }

    fn timing_out(mut self, url: &str) -> Self {
        self.timeouts.push(url.to_string());
        self
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
        if self.timeouts.iter().any(|u| u == url) {
            return Err(EvidenceError::FetchTimeout {
                url: url.into(),
                timeout_ms: 50,
            });
        }
        match self.bodies.get(url) {
            Some(b) => Ok(FetchedPage {
                url: url.into(),
                body: b.clone(),
            }),
            None => Err(EvidenceError::FetchFailed {
                url: url.into(),
                reason: "http 404".into(),
            }),
        }
    }
}

const SAMSUNG_URL: &str = "https://www.samsung.com/au/offer/bespoke-cashback/";
const LG_URL: &str = "https://www.lg.com/au/promotions/win-your-kitchen/";
const BOSCH_URL: &str = "https://www.bosch-home.com.au/promotions/bonus-gift";

fn all_pages() -> Pages {
    Pages::default()
        .with(SAMSUNG_URL, include_str!("fixtures/pages/samsung_cashback.html"))
        .with(LG_URL, include_str!("fixtures/pages/lg_competition.html"))
        .with(BOSCH_URL, include_str!("fixtures/pages/bosch_gift.html"))
}

fn brief() -> CampaignContext {
    CampaignContext::from_json(BRIEF).expect("brief fixture")
}

fn collector(chain: ProviderChain, pages: Arc<Pages>) -> ResearchCollector {
    ResearchCollector::new(chain, pages, ResearchConfig::default())
}

fn result(title: &str, url: &str, snippet: &str) -> SearchResult {
    SearchResult {
        title: title.into(),
        url: url.into(),
        snippet: snippet.into(),
    }
}

#[tokio::test]
async fn lite_never_touches_the_network() {
    let pages = Arc::new(all_pages());
    let c = collector(ProviderChain::new(vec![Box::new(Down)]), Arc::clone(&pages));
    let campaign = brief();
    let profile = classify_campaign(&campaign);

    let pack = c.collect(&campaign, &profile, DepthLevel::Lite, None).await;

    assert_eq!(pages.calls.load(Ordering::SeqCst), 0);
    assert_eq!(pack.meta.queries_run, 0);
    assert_eq!(pack.meta.level, DepthLevel::Lite);
    assert!(pack.competitors.promos.is_empty());
    assert!(pack.brand.iter().any(|f| f.text == "Brand: Acme"));
    assert!(pack.category.iter().all(|f| f.origin == FactOrigin::Category));
    assert!(pack.season.iter().any(|f| f.text.contains("EOFY")));
    assert!(pack.meta.warnings.is_empty());
}

#[tokio::test]
async fn deep_extracts_competitor_promos_through_fallback() {
    let pages = Arc::new(all_pages());
    let chain = ProviderChain::new(vec![
        Box::new(Down),
        Box::new(GoogleCseProvider::from_fixture(CSE_JSON)),
    ]);
    let c = collector(chain, Arc::clone(&pages));
    let campaign = brief();
    let profile = classify_campaign(&campaign);

    let pack = c.collect(&campaign, &profile, DepthLevel::Deep, None).await;

    assert!(pack.meta.queries_run > 0);
    assert!(pack
        .meta
        .warnings
        .iter()
        .any(|w| w.starts_with("usedFallbacks: down failed")));
    // Facebook result is blocklisted on every query.
    assert!(pack.meta.dropped.filtered >= 1);
    assert!(pack
        .promos()
        .iter()
        .all(|p| !p.url.contains("facebook.com")));

    // Three unique URLs survive dedup and are fetched once each.
    assert_eq!(pack.meta.urls_attempted, 3);
    assert_eq!(pages.calls.load(Ordering::SeqCst), 3);
    assert_eq!(pack.meta.pages_fetched, 3);

    let by_brand: HashMap<&str, _> = pack.promos().iter().map(|p| (p.brand.as_str(), p)).collect();
    let samsung = by_brand["Samsung"];
    assert_eq!(samsung.promo_type, PromoType::Cashback);
    assert_eq!(samsung.value_amount, Some(300.0));
    assert!(samsung.redemption);
    assert!(samsung.gift_card);

    let lg = by_brand["LG"];
    assert_eq!(lg.promo_type, PromoType::Prize);
    assert_eq!(lg.hero_count, Some(3));
    assert_eq!(lg.total_winners, Some(150));

    assert_eq!(by_brand["Bosch"].promo_type, PromoType::Gwp);

    // Assured-value campaign: one cashback promo feeds the cashback benchmark.
    assert_eq!(pack.benchmarks.cashback.sample, 1);
    assert_eq!(pack.benchmarks.cashback.typical_abs, Some(300.0));
    assert_eq!(pack.benchmarks.prize_counts_observed.total, 1);
}

#[tokio::test]
async fn fetch_failures_shrink_evidence_without_failing() {
    let pages = Arc::new(
        Pages::default()
            .with(SAMSUNG_URL, include_str!("fixtures/pages/samsung_cashback.html"))
            .timing_out(BOSCH_URL),
    );
    let chain = ProviderChain::new(vec![Box::new(GoogleCseProvider::from_fixture(CSE_JSON))]);
    let c = collector(chain, Arc::clone(&pages));
    let campaign = brief();
    let profile = classify_campaign(&campaign);

    let pack = c.collect(&campaign, &profile, DepthLevel::Deep, None).await;

    assert_eq!(pack.promos().len(), 1);
    assert_eq!(pack.meta.pages_fetched, 1);
    assert_eq!(pack.meta.dropped.fetch_timeout, 1);
    assert_eq!(pack.meta.dropped.fetch_failed, 1);
}

#[tokio::test]
async fn pages_without_signal_count_as_parse_empty() {
    let about = "https://acme-rival.test/about";
    let pages = Arc::new(
        all_pages().with(about, include_str!("fixtures/pages/about.html")),
    );
    let chain = ProviderChain::new(vec![Box::new(Fixed(vec![
        result("Samsung Bespoke Cashback", SAMSUNG_URL, "Claim up to $300 cashback"),
        result("About us", about, "Our story"),
    ]))]);
    let c = collector(chain, pages);
    let campaign = brief();
    let profile = classify_campaign(&campaign);

    let pack = c.collect(&campaign, &profile, DepthLevel::Deep, None).await;

    assert_eq!(pack.promos().len(), 1);
    assert_eq!(pack.meta.dropped.parse_empty, 1);
    assert_eq!(pack.meta.pages_fetched, 2);
}

#[tokio::test]
async fn own_brand_pages_are_not_competitors() {
    let own = "https://acme.test/offers/dishwasher-cashback";
    let pages = Arc::new(Pages::default().with(
        own,
        "<h1>Acme dishwasher cashback</h1><p>Claim $10 cashback on any Acme dishwasher.</p>",
    ));
    let chain = ProviderChain::new(vec![Box::new(Fixed(vec![result(
        "Acme cashback",
        own,
        "Claim $10 cashback",
    )]))]);
    let c = collector(chain, pages);
    let campaign = CampaignContext {
        competitors: vec!["Acme".into(), "Samsung".into()],
        ..brief()
    };
    let profile = classify_campaign(&campaign);

    let pack = c.collect(&campaign, &profile, DepthLevel::Deep, None).await;

    assert!(pack.promos().is_empty());
    assert_eq!(pack.meta.dropped.filtered, 1);
}

fn beer_brief() -> CampaignContext {
    CampaignContext::from_json(
        r#"{"id":"beer-1","brand":"Hop Co","category":"Craft beer","market":"AU",
            "offer":{"prizes":{"totalWinners":20},"expectedBuyers":40000}}"#,
    )
    .expect("beer brief")
}

const DM_URL: &str = "https://www.danmurphys.com.au/beer/carlton-summer-win";
const BWS_URL: &str = "https://bws.com.au/beer/great-northern-instant-win";
const BRAND_URL: &str = "https://www.carltondry.com.au/promotions/summer";

const PRIZE_PAGE: &str = "<p>Buy a carton for your chance to win 1 of 5 utes. Weekly draws.</p>";

#[tokio::test]
async fn sensitive_filter_drops_liquor_retailers() {
    let pages = Arc::new(
        Pages::default()
            .with(DM_URL, PRIZE_PAGE)
            .with(BRAND_URL, PRIZE_PAGE),
    );
    let chain = ProviderChain::new(vec![Box::new(Fixed(vec![
        result("Carlton summer win", DM_URL, "win a ute"),
        result("Carlton Dry summer", BRAND_URL, "win a ute"),
    ]))]);
    let c = collector(chain, Arc::clone(&pages));
    let campaign = beer_brief();
    let profile = classify_campaign(&campaign);
    assert!(profile.guardrails.legal_sensitive);

    let pack = c.collect(&campaign, &profile, DepthLevel::Deep, None).await;

    assert_eq!(pack.meta.urls_attempted, 1);
    assert_eq!(pack.promos()[0].url, BRAND_URL);
    assert!(pack.meta.dropped.filtered >= 1);
    assert!(!pack.meta.warnings.iter().any(|w| w.contains("sensitive filter")));
}

#[tokio::test]
async fn sensitive_filter_falls_back_when_nothing_survives() {
    let pages = Arc::new(
        Pages::default()
            .with(DM_URL, PRIZE_PAGE)
            .with(BWS_URL, "<p>Instant win! Over 1,000 winners of a slab every day.</p>"),
    );
    let chain = ProviderChain::new(vec![Box::new(Fixed(vec![
        result("Carlton summer win", DM_URL, "win a ute"),
        result("Great Northern instant win", BWS_URL, "instant win"),
    ]))]);
    let c = collector(chain, Arc::clone(&pages));
    let campaign = beer_brief();
    let profile = classify_campaign(&campaign);

    let pack = c.collect(&campaign, &profile, DepthLevel::Deep, None).await;

    assert!(pack
        .meta
        .warnings
        .iter()
        .any(|w| w.contains("sensitive filter removed every result")));
    assert_eq!(pack.promos().len(), 2);
    assert_eq!(pack.benchmarks.many_winners_share, Some(0.5));
}

#[tokio::test]
async fn passed_deadline_runs_nothing() {
    let pages = Arc::new(all_pages());
    let chain = ProviderChain::new(vec![Box::new(GoogleCseProvider::from_fixture(CSE_JSON))]);
    let c = collector(chain, Arc::clone(&pages));
    let campaign = brief();
    let profile = classify_campaign(&campaign);

    let pack = c
        .collect(&campaign, &profile, DepthLevel::Deep, Some(Instant::now()))
        .await;

    assert_eq!(pack.meta.queries_run, 0);
    assert_eq!(pages.calls.load(Ordering::SeqCst), 0);
    assert!(pack.meta.warnings.iter().any(|w| w.starts_with("deadline reached")));
    // Brief facts are still there.
    assert!(!pack.brand.is_empty());
}

/// Records every query and the locale it was issued under.
#[derive(Clone, Default)]
struct Recording(Arc<std::sync::Mutex<Vec<(String, String)>>>);

#[async_trait]
impl SearchProvider for Recording {
    async fn search(&self, q: &str, l: &Locale) -> Result<Vec<SearchResult>, EvidenceError> {
        self.0.lock().unwrap().push((q.to_string(), l.gl.clone()));
        Ok(Vec::new())
    }
    fn name(&self) -> &'static str {
        "recording"
    }
}

#[tokio::test]
async fn unknown_market_uses_configured_locale() {
    let rec = Recording::default();
    let config = ResearchConfig {
        default_gl: "de".into(),
        default_hl: "de".into(),
        ..ResearchConfig::default()
    };
    let chain = ProviderChain::new(vec![Box::new(rec.clone())]);
    let c = ResearchCollector::new(chain, Arc::new(Pages::default()), config);
    let raw = include_str!("fixtures/brief_prize_draw.json");
    let mut campaign = CampaignContext::from_json(raw).expect("prize brief");
    campaign.market = "Bavaria".into();
    campaign.offer.permits_declared = false;
    let profile = classify_campaign(&campaign);

    let pack = c.collect(&campaign, &profile, DepthLevel::Deep, None).await;

    assert_eq!(pack.meta.market, "de");
    assert!(pack.market.iter().any(|f| f.text == "Market: Bavaria"));
    let seen = rec.0.lock().unwrap().clone();
    assert!(!seen.is_empty());
    assert!(seen.iter().all(|(q, gl)| gl == "de" && !q.contains("Australia")));

    // Australian permit rules do not apply outside Australia.
    let iq = offer_iq::score_offer(&campaign, &profile, Some(&pack));
    assert_eq!(iq.diagnostics.market, "de");
    let sb = offer_iq::build_scoreboard(&campaign, &profile, &iq);
    assert_eq!(sb.cells.compliance_risk.status, offer_iq::scoreboard::Status::Green);

    // The same brief in Australia needs permits.
    campaign.market = "AU".into();
    let iq = offer_iq::score_offer(&campaign, &profile, None);
    let sb = offer_iq::build_scoreboard(&campaign, &profile, &iq);
    assert_eq!(sb.cells.compliance_risk.status, offer_iq::scoreboard::Status::Amber);
}
