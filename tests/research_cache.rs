// tests/research_cache.rs
use chrono::{Duration as ChronoDuration, Utc};
use offer_iq::benchmarks::aggregate_for;
use offer_iq::cache::{CacheStore, FileCacheStore, MemoryCacheStore, ResearchCache};
use offer_iq::campaign::{Cadence, CampaignContext};
use offer_iq::category::classify_campaign;
use offer_iq::config::ResearchConfig;
use offer_iq::research::brief_pack;
use offer_iq::research::types::{CompetitorPromo, DepthLevel, PromoType, ResearchPack};
use std::sync::Arc;
use std::time::Duration;

const TTL: Duration = Duration::from_secs(3600);

fn campaign() -> CampaignContext {
    let raw = include_str!("fixtures/brief_appliances_cashback_10.json");
    CampaignContext::from_json(raw).unwrap()
}

fn promo(brand: &str, amount: f64, cadence: Option<Cadence>) -> CompetitorPromo {
    CompetitorPromo {
        brand: brand.into(),
        title: format!("{brand} cashback"),
        headline: format!("Claim ${amount} back"),
        url: format!("https://{}.test/promo", brand.to_lowercase()),
        source: format!("{}.test", brand.to_lowercase()),
        promo_type: PromoType::Cashback,
        hero_count: None,
        total_winners: None,
        cadence,
        prize_items: vec![],
        prize_value_hint: None,
        value_amount: Some(amount),
        value_percent: None,
        redemption: true,
        gift_card: false,
        confidence: 0.6,
    }
}

fn pack(level: DepthLevel) -> ResearchPack {
    let c = campaign();
    let p = classify_campaign(&c);
    let mut pack = brief_pack(&c, &p, level, &ResearchConfig::default().locale_for(&c.market));
    pack.competitors.promos = vec![
        promo("Samsung", 100.0, Some(Cadence::Weekly)),
        promo("LG", 200.0, Some(Cadence::Instant)),
    ];
    pack.benchmarks = aggregate_for(&pack.competitors.promos, &c, &p);
    pack.meta.warnings.push("usedFallbacks: google_cse returned no results".into());
    pack
}

fn file_cache(dir: &std::path::Path, ttl: Duration) -> ResearchCache {
    let store: Arc<dyn CacheStore> = Arc::new(FileCacheStore::new(dir));
    ResearchCache::new(store, ttl)
}

#[tokio::test]
async fn round_trip_equals_except_cached_at() {
    let dir = tempfile::tempdir().unwrap();
    let cache = file_cache(dir.path(), TTL);
    let original = pack(DepthLevel::Deep);
    let now = Utc::now();

    cache.put_at("appl-cb-10", DepthLevel::Deep, &original, now).await;
    let mut got = cache
        .get_at("appl-cb-10", DepthLevel::Deep, now + ChronoDuration::minutes(5))
        .await
        .expect("fresh entry is a hit");

    assert_eq!(got.meta.cached_at, Some(now));
    got.meta.cached_at = None;
    assert_eq!(got, original);
}

#[tokio::test]
async fn entries_expire_after_ttl() {
    let dir = tempfile::tempdir().unwrap();
    let cache = file_cache(dir.path(), TTL);
    let now = Utc::now();
    cache.put_at("c", DepthLevel::Deep, &pack(DepthLevel::Deep), now).await;

    let later = now + ChronoDuration::seconds(3601);
    assert!(cache.get_at("c", DepthLevel::Deep, later).await.is_none());
    let edge = now + ChronoDuration::seconds(3600);
    assert!(cache.get_at("c", DepthLevel::Deep, edge).await.is_some());
}

#[tokio::test]
async fn max_and_zero_ttl_bypass_the_cache() {
    let store = Arc::new(MemoryCacheStore::new());
    let cache = ResearchCache::new(store.clone(), TTL);
    let now = Utc::now();

    cache.put_at("c", DepthLevel::Max, &pack(DepthLevel::Max), now).await;
    assert!(store.load("c").await.unwrap().is_none());
    assert!(cache.get_at("c", DepthLevel::Max, now).await.is_none());

    let off = ResearchCache::new(store.clone(), Duration::ZERO);
    off.put_at("c", DepthLevel::Deep, &pack(DepthLevel::Deep), now).await;
    assert!(store.load("c").await.unwrap().is_none());
}

#[tokio::test]
async fn levels_merge_into_one_envelope() {
    let dir = tempfile::tempdir().unwrap();
    let cache = file_cache(dir.path(), TTL);
    let now = Utc::now();

    cache.put_at("c", DepthLevel::Lite, &pack(DepthLevel::Lite), now).await;
    cache.put_at("c", DepthLevel::Deep, &pack(DepthLevel::Deep), now).await;

    let lite = cache.get_at("c", DepthLevel::Lite, now).await.expect("lite kept");
    let deep = cache.get_at("c", DepthLevel::Deep, now).await.expect("deep stored");
    assert_eq!(lite.meta.level, DepthLevel::Lite);
    assert_eq!(deep.meta.level, DepthLevel::Deep);

    let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(files.len(), 1, "one file per campaign, no tmp leftovers");

    let other = cache.get_at("other-campaign", DepthLevel::Deep, now).await;
    assert!(other.is_none());
}

#[tokio::test]
async fn unreadable_or_old_envelopes_are_misses() {
    let store = Arc::new(MemoryCacheStore::new());
    let cache = ResearchCache::new(store.clone(), TTL);
    let now = Utc::now();

    store.store("c", "{not json").await.unwrap();
    assert!(cache.get_at("c", DepthLevel::Deep, now).await.is_none());

    store.store("c", r#"{"version":0,"values":{}}"#).await.unwrap();
    assert!(cache.get_at("c", DepthLevel::Deep, now).await.is_none());

    // A write over a broken envelope replaces it.
    cache.put_at("c", DepthLevel::Deep, &pack(DepthLevel::Deep), now).await;
    assert!(cache.get_at("c", DepthLevel::Deep, now).await.is_some());
}

#[tokio::test]
async fn unwritable_directory_degrades_to_a_miss() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"file").unwrap();
    let cache = file_cache(&blocker, TTL);
    let now = Utc::now();

    cache.put_at("c", DepthLevel::Deep, &pack(DepthLevel::Deep), now).await;
    assert!(cache.get_at("c", DepthLevel::Deep, now).await.is_none());
}
