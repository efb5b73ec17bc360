// tests/providers_fixtures.rs
use offer_iq::research::locale::market_locale;
use offer_iq::research::providers::{GoogleCseProvider, NewsRssProvider, ProviderChain};
use offer_iq::research::types::SearchProvider;

const CSE_JSON: &str = include_str!("fixtures/cse_appliances.json");
const NEWS_XML: &str = include_str!("fixtures/news_rss_appliances.xml");

#[tokio::test]
async fn cse_fixture_yields_cleaned_results() {
    let p = GoogleCseProvider::from_fixture(CSE_JSON);
    let loc = market_locale("AU", "au", "en");
    let items = p.search("samsung promotion", &loc).await.expect("cse fixture parses");

    assert_eq!(items.len(), 4);
    assert_eq!(items[1].title, "LG Win Your Kitchen & Laundry Competition");
    assert!(items.iter().all(|r| r.url.starts_with("https://")));
    assert_eq!(p.name(), "google_cse");
}

#[tokio::test]
async fn news_fixture_skips_items_without_links() {
    let p = NewsRssProvider::from_fixture(NEWS_XML);
    let loc = market_locale("AU", "au", "en");
    let items = p.search("appliance cashback", &loc).await.expect("rss fixture parses");

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].title, "Electrolux launches winter cashback - up to $200 back");
    assert_eq!(
        items[0].snippet,
        "Electrolux buyers can claim up to $200 cashback on ovens."
    );
    assert_eq!(items[1].title, "Fisher & Paykel instant win promotion");
}

#[tokio::test]
async fn chain_falls_back_from_empty_cse_to_news() {
    let empty_cse = GoogleCseProvider::from_fixture(r#"{"kind":"customsearch#search"}"#);
    let chain = ProviderChain::new(vec![
        Box::new(empty_cse),
        Box::new(NewsRssProvider::from_fixture(NEWS_XML)),
    ]);
    let loc = market_locale("AU", "au", "en");
    let out = chain.search("appliance cashback", &loc).await;

    assert_eq!(out.provider, Some("news_rss"));
    assert_eq!(out.results.len(), 2);
    assert!(out.used_fallbacks());
    assert!(out.warnings[0].starts_with("usedFallbacks: google_cse"));
}
