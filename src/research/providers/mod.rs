// src/research/providers/mod.rs
pub mod google_cse;
pub mod news_rss;

use metrics::counter;

use crate::config::ResearchConfig;
use crate::metrics as m;
use crate::research::types::{Locale, SearchProvider, SearchResult};

pub use google_cse::GoogleCseProvider;
pub use news_rss::NewsRssProvider;

/// Outcome of one query through the chain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChainOutcome {
    pub results: Vec<SearchResult>,
    /// Name of the provider that answered, if any did.
    pub provider: Option<&'static str>,
    /// One line per provider that errored or came back empty.
    pub warnings: Vec<String>,
}

impl ChainOutcome {
    pub fn used_fallbacks(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Try-in-order provider list. Never fails: the worst case is an empty
/// outcome carrying a warning per provider.
pub struct ProviderChain {
    providers: Vec<Box<dyn SearchProvider>>,
}

impl ProviderChain {
    pub fn new(providers: Vec<Box<dyn SearchProvider>>) -> Self {
        Self { providers }
    }

    /// Google CSE first, then news RSS when enabled.
    pub fn from_config(cfg: &ResearchConfig) -> Self {
        let mut providers: Vec<Box<dyn SearchProvider>> =
            vec![Box::new(GoogleCseProvider::from_config(cfg))];
        if cfg.news_rss_enabled {
            providers.push(Box::new(NewsRssProvider::from_config(cfg)));
        }
        Self::new(providers)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub async fn search(&self, query: &str, locale: &Locale) -> ChainOutcome {
        m::ensure_metrics_described();
        counter!(m::QUERIES_TOTAL).increment(1);

        let mut out = ChainOutcome::default();
        for p in &self.providers {
            match p.search(query, locale).await {
                Ok(v) if !v.is_empty() => {
                    out.results = v;
                    out.provider = Some(p.name());
                    break;
                }
                Ok(_) => out
                    .warnings
                    .push(format!("usedFallbacks: {} returned no results", p.name())),
                Err(e) => {
                    tracing::debug!(target: "research", provider = p.name(), kind = e.kind(), error = %e, "provider failed");
                    out.warnings
                        .push(format!("usedFallbacks: {} failed ({})", p.name(), e.kind()));
                }
            }
        }

        if out.provider.is_none() {
            out.warnings
                .push("usedFallbacks: no provider returned results".to_string());
        }
        if out.used_fallbacks() {
            counter!(m::PROVIDER_FALLBACKS_TOTAL).increment(1);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvidenceError;
    use async_trait::async_trait;

    struct Fixed(&'static str, Result<Vec<SearchResult>, EvidenceError>);

    #[async_trait]
    impl SearchProvider for Fixed {
        async fn search(&self, _q: &str, _l: &Locale) -> Result<Vec<SearchResult>, EvidenceError> {
            self.1.clone()
        }
        fn name(&self) -> &'static str {
            self.0
        }
    }

    fn hit(url: &str) -> SearchResult {
        SearchResult {
            title: "t".into(),
            url: url.into(),
            snippet: "s".into(),
        }
    }

    fn loc() -> Locale {
        crate::research::locale::market_locale("AU", "au", "en")
    }

    #[tokio::test]
    async fn first_non_empty_provider_wins() {
        let chain = ProviderChain::new(vec![
            Box::new(Fixed("a", Ok(vec![]))),
            Box::new(Fixed("b", Ok(vec![hit("https://b.test/1")]))),
            Box::new(Fixed("c", Ok(vec![hit("https://c.test/1")]))),
        ]);
        let out = chain.search("q", &loc()).await;
        assert_eq!(out.provider, Some("b"));
        assert_eq!(out.results[0].url, "https://b.test/1");
        assert_eq!(out.warnings.len(), 1);
        assert!(out.used_fallbacks());
    }

    #[tokio::test]
    async fn all_failing_is_empty_with_warnings() {
        let chain = ProviderChain::new(vec![
            Box::new(Fixed("a", Err(EvidenceError::ProviderUnavailable("x".into())))),
            Box::new(Fixed("b", Ok(vec![]))),
        ]);
        let out = chain.search("q", &loc()).await;
        assert!(out.results.is_empty());
        assert_eq!(out.provider, None);
        assert_eq!(out.warnings.len(), 3);

        let none = ProviderChain::new(vec![]).search("q", &loc()).await;
        assert!(none.results.is_empty());
        assert_eq!(none.warnings.len(), 1);
    }

    #[test]
    fn configured_chain_order() {
        let cfg = ResearchConfig::default();
        assert_eq!(ProviderChain::from_config(&cfg).names(), vec!["google_cse", "news_rss"]);

        let cse_only = ResearchConfig {
            news_rss_enabled: false,
            ..cfg
        };
        assert_eq!(ProviderChain::from_config(&cse_only).names(), vec!["google_cse"]);
    }
}
