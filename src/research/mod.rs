//! # Research Collector
//!
//! Builds a [`ResearchPack`] for one campaign at one depth level:
//! brief and category facts always; at DEEP/MAX also search snippets and
//! competitor promotions extracted from fetched pages.
//!
//! Nothing in here fails the caller. Provider outages, blocked or filtered
//! URLs, fetch errors and empty pages only shrink the evidence, and each is
//! counted in `meta.dropped` / `meta.warnings`.

pub mod encyclopedia;
pub mod fetch;
pub mod filter;
pub mod locale;
pub mod providers;
pub mod queries;
pub mod types;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use metrics::counter;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::time::Instant;

use crate::benchmarks;
use crate::campaign::CampaignContext;
use crate::category::CategoryProfile;
use crate::config::research::clamp_concurrency;
use crate::config::ResearchConfig;
use crate::extract;
use crate::metrics as m;

use encyclopedia::{canonicalize, Encyclopedia, WikipediaOpenSearch};
use fetch::{fetch_all, HttpPageFetcher, PageFetcher};
use providers::{ChainOutcome, ProviderChain};
use queries::{plan_queries_with, PlannedQuery};
use types::{
    CompetitorPromo, CompetitorSection, DepthLevel, DropCounts, Fact, PackMeta,
    ResearchPack, SearchResult,
};

/// Facts kept per bucket.
pub const FACTS_PER_BUCKET: usize = 8;
/// Snippets taken from each query's result list.
const SNIPPETS_PER_QUERY: usize = 3;

pub struct ResearchCollector {
    chain: ProviderChain,
    fetcher: Arc<dyn PageFetcher>,
    encyclopedia: Option<Arc<dyn Encyclopedia>>,
    config: ResearchConfig,
}

impl ResearchCollector {
    pub fn new(chain: ProviderChain, fetcher: Arc<dyn PageFetcher>, config: ResearchConfig) -> Self {
        Self {
            chain,
            fetcher,
            encyclopedia: None,
            config,
        }
    }

    pub fn with_encyclopedia(mut self, enc: Arc<dyn Encyclopedia>) -> Self {
        self.encyclopedia = Some(enc);
        self
    }

    /// Live providers, HTTP fetcher and (when enabled) Wikipedia lookups.
    pub fn from_config(config: ResearchConfig) -> Self {
        let chain = ProviderChain::from_config(&config);
        tracing::debug!(target: "research", providers = ?chain.names(), "provider chain ready");
        let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpPageFetcher::new(&config));
        let enc: Option<Arc<dyn Encyclopedia>> = config.encyclopedia_enabled.then(|| {
            Arc::new(WikipediaOpenSearch::new(config.search_timeout(), &config.user_agent))
                as Arc<dyn Encyclopedia>
        });
        let mut c = Self::new(chain, fetcher, config);
        c.encyclopedia = enc;
        c
    }

    pub fn config(&self) -> &ResearchConfig {
        &self.config
    }

    /// Collect research. `deadline` is the caller's outer limit: once passed,
    /// no new queries start and no fetch is retried.
    pub async fn collect(
        &self,
        campaign: &CampaignContext,
        profile: &CategoryProfile,
        level: DepthLevel,
        deadline: Option<Instant>,
    ) -> ResearchPack {
        m::ensure_metrics_described();
        let locale = self.config.locale_for(&campaign.market);
        let mut pack = brief_pack(campaign, profile, level, &locale);
        if level == DepthLevel::Lite {
            pack.benchmarks = benchmarks::aggregate_for(&[], campaign, profile);
            return pack;
        }

        let enc = self.encyclopedia.as_deref();
        let brand = canonicalize(enc, &campaign.brand).await;
        let category = canonicalize(enc, profile.category.label()).await;
        let plan = plan_queries_with(campaign, profile, level, &locale, &brand, &category);

        let limit = clamp_concurrency(self.config.concurrency);
        let outcomes: Vec<(PlannedQuery, Option<ChainOutcome>)> = stream::iter(plan.into_iter().map(|q| {
            let locale = &locale;
            async move {
                if deadline.is_some_and(|d| Instant::now() >= d) {
                    return (q, None);
                }
                let out = self.chain.search(&q.text, locale).await;
                (q, Some(out))
            }
        }))
        .buffered(limit)
        .collect::<Vec<_>>()
        .await;

        let mut warnings: Vec<String> = Vec::new();
        let mut dropped = DropCounts::default();
        let mut candidates: Vec<SearchResult> = Vec::new();
        let mut seen_fact_urls: HashSet<String> = HashSet::new();
        let mut skipped = 0usize;

        for (q, outcome) in outcomes {
            let Some(outcome) = outcome else {
                skipped += 1;
                continue;
            };
            pack.meta.queries_run += 1;
            for w in outcome.warnings {
                push_unique(&mut warnings, w);
            }
            let (results, blocked) = filter::apply_blocklist(outcome.results);
            dropped.filtered += blocked;

            let bucket = pack.bucket_mut(q.bucket);
            for r in results.iter().take(SNIPPETS_PER_QUERY) {
                if bucket.len() >= FACTS_PER_BUCKET || !seen_fact_urls.insert(r.url.clone()) {
                    continue;
                }
                let text = if r.snippet.is_empty() {
                    r.title.clone()
                } else {
                    format!("{}: {}", r.title, r.snippet)
                };
                bucket.push(Fact::search(text, r.url.clone()));
            }
            if q.fetch_pages {
                candidates.extend(results);
            }
        }
        if skipped > 0 {
            warnings.push(format!("deadline reached: {skipped} queries not run"));
        }

        let (candidates, _dupes) = filter::dedup_results(candidates);
        let sensitive = profile.guardrails.legal_sensitive || campaign.is_on_premise();
        let (mut candidates, filtered, fell_back) = filter::sensitive_filter(candidates, sensitive);
        dropped.filtered += filtered;
        if fell_back {
            warnings.push("sensitive filter removed every result; using unfiltered set".to_string());
        }
        candidates.truncate(self.config.url_cap(level));

        let promos = self
            .fetch_promos(campaign, profile, &locale, candidates, deadline, &mut pack.meta, &mut dropped)
            .await;
        counter!(m::PROMOS_KEPT_TOTAL).increment(promos.len() as u64);

        pack.benchmarks = benchmarks::aggregate_for(&promos, campaign, profile);
        pack.competitors.promos = promos;
        pack.meta.warnings.extend(warnings);
        pack.meta.dropped = dropped;

        tracing::info!(
            target: "research",
            id = %crate::cache::anon_hash(&campaign.id),
            level = level.as_str(),
            queries = pack.meta.queries_run,
            urls = pack.meta.urls_attempted,
            pages = pack.meta.pages_fetched,
            promos = pack.competitors.promos.len(),
            warnings = pack.meta.warnings.len(),
            "research collected"
        );
        pack
    }

    #[allow(clippy::too_many_arguments)]
    async fn fetch_promos(
        &self,
        campaign: &CampaignContext,
        profile: &CategoryProfile,
        locale: &types::Locale,
        candidates: Vec<SearchResult>,
        deadline: Option<Instant>,
        meta: &mut PackMeta,
        dropped: &mut DropCounts,
    ) -> Vec<CompetitorPromo> {
        let urls: Vec<String> = candidates.iter().map(|r| r.url.clone()).collect();
        meta.urls_attempted = urls.len();
        let fetched = fetch_all(Arc::clone(&self.fetcher), urls, locale, self.config.concurrency, deadline).await;

        let mut promos = Vec::new();
        for (result, (_, res)) in candidates.iter().zip(fetched) {
            let page = match res {
                Ok(p) => p,
                Err(e) => {
                    dropped.record(&e);
                    continue;
                }
            };
            meta.pages_fetched += 1;
            let text = extract::page_text(&page.body);
            match extract::build_promo(result, &text, &profile.competitors) {
                Ok(p) if p.brand.eq_ignore_ascii_case(campaign.brand.trim()) => {
                    tracing::debug!(target: "research", url = %p.url, "own-brand promotion skipped");
                    dropped.filtered += 1;
                }
                Ok(p) => promos.push(p),
                Err(e) => dropped.record(&e),
            }
        }
        promos
    }
}

fn push_unique(v: &mut Vec<String>, s: String) {
    if !v.contains(&s) {
        v.push(s);
    }
}

/// Facts that need no network: the brief itself plus category knowledge.
pub fn brief_pack(
    campaign: &CampaignContext,
    profile: &CategoryProfile,
    level: DepthLevel,
    loc: &types::Locale,
) -> ResearchPack {
    let market_name = locale::market_name(&loc.gl);
    let d = &profile.defaults;

    let mut brand = vec![Fact::brief(format!("Brand: {}", campaign.brand))];
    if let Some(o) = campaign.objective.as_deref().filter(|s| !s.trim().is_empty()) {
        brand.push(Fact::brief(format!("Objective: {}", o.trim())));
    }
    if let Some(h) = campaign.hook.as_deref().filter(|s| !s.trim().is_empty()) {
        brand.push(Fact::brief(format!("Hook: {}", h.trim())));
    }

    let mut category = vec![
        Fact::category(format!("Category: {}", profile.category.label())),
        Fact::category(format!(
            "Typical ASP ${:.0}; meaningful value starts at ${:.0} or {:.0}% of price",
            d.asp_fallback, d.absolute_floor, d.percent_floor
        )),
    ];
    if let Some(t) = profile.alcohol_type {
        category.push(Fact::category(format!("Alcohol type: {}", format!("{t:?}").to_lowercase())));
    }
    category.extend(profile.guardrails.notes.iter().map(|n| Fact::category(n.clone())));

    let audience = campaign
        .audience
        .iter()
        .filter(|a| !a.trim().is_empty())
        .map(|a| Fact::brief(format!("Audience: {}", a.trim())))
        .collect();

    let competitors = CompetitorSection {
        facts: profile
            .competitors
            .iter()
            .take(FACTS_PER_BUCKET)
            .map(|c| Fact::brief(format!("Competitor: {c}")))
            .collect(),
        promos: Vec::new(),
    };
    let retailers = profile
        .retailers
        .iter()
        .take(FACTS_PER_BUCKET)
        .map(|r| Fact::brief(format!("Retailer: {r}")))
        .collect();

    let mut market = Vec::new();
    if !market_name.is_empty() {
        market.push(Fact::brief(format!("Market: {market_name}")));
    } else if !campaign.market.trim().is_empty() {
        market.push(Fact::brief(format!("Market: {}", campaign.market.trim())));
    }

    let mut season = Vec::new();
    if let Some(s) = campaign.timing.season.as_deref().filter(|s| !s.trim().is_empty()) {
        season.push(Fact::brief(format!("Season: {}", s.trim())));
    }
    if let (Some(a), Some(b)) = (&campaign.timing.start, &campaign.timing.end) {
        season.push(Fact::brief(format!("Runs {a} to {b}")));
    }

    ResearchPack {
        meta: PackMeta {
            campaign_id: campaign.id.clone(),
            level,
            market: loc.gl.clone(),
            category: profile.category.label().to_string(),
            generated_at: Utc::now(),
            cached_at: None,
            queries_run: 0,
            urls_attempted: 0,
            pages_fetched: 0,
            warnings: Vec::new(),
            dropped: DropCounts::default(),
        },
        brand,
        category,
        audience,
        competitors,
        retailers,
        market,
        season,
        benchmarks: Default::default(),
    }
}
