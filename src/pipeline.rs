//! End-to-end evaluation: classify, research (cache first), score, gate.
//! Never fails; missing evidence only lowers confidence.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::cache::{CacheStore, FileCacheStore, ResearchCache};
use crate::campaign::CampaignContext;
use crate::category::{classify_campaign, CategoryProfile};
use crate::config::ResearchConfig;
use crate::offer_iq::{score_offer, OfferIq};
use crate::research::types::{DepthLevel, ResearchPack};
use crate::research::ResearchCollector;
use crate::scoreboard::{build_scoreboard, Scoreboard};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub profile: CategoryProfile,
    pub pack: ResearchPack,
    pub offer_iq: OfferIq,
    pub scoreboard: Scoreboard,
}

pub struct Evaluator {
    collector: ResearchCollector,
    cache: Option<ResearchCache>,
}

impl Evaluator {
    pub fn new(collector: ResearchCollector) -> Self {
        Self { collector, cache: None }
    }

    pub fn with_cache(mut self, cache: ResearchCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Live collector plus a file cache under `config.cache_dir`.
    pub fn from_config(config: ResearchConfig) -> Self {
        let store: Arc<dyn CacheStore> = Arc::new(FileCacheStore::new(&config.cache_dir));
        let cache = ResearchCache::new(store, config.cache_ttl());
        Self::new(ResearchCollector::from_config(config)).with_cache(cache)
    }

    /// Evaluate with the configured overall budget as the research deadline.
    pub async fn evaluate(&self, campaign: &CampaignContext, level: DepthLevel) -> Evaluation {
        let budget = self.collector.config().overall_budget_secs;
        let deadline = (budget > 0).then(|| Instant::now() + Duration::from_secs(budget));
        self.evaluate_until(campaign, level, deadline).await
    }

    pub async fn evaluate_until(
        &self,
        campaign: &CampaignContext,
        level: DepthLevel,
        deadline: Option<Instant>,
    ) -> Evaluation {
        let profile = classify_campaign(campaign);

        let cached = match &self.cache {
            Some(c) => c.get(&campaign.id, level).await,
            None => None,
        };
        let pack = match cached {
            Some(p) => p,
            None => {
                let p = self.collector.collect(campaign, &profile, level, deadline).await;
                if let Some(c) = &self.cache {
                    c.put(&campaign.id, level, &p).await;
                }
                p
            }
        };

        let offer_iq = score_offer(campaign, &profile, Some(&pack));
        let scoreboard = build_scoreboard(campaign, &profile, &offer_iq);

        tracing::info!(
            target: "offer_iq",
            id = %crate::cache::anon_hash(&campaign.id),
            level = level.as_str(),
            category = profile.category.label(),
            cached = pack.meta.cached_at.is_some(),
            score = offer_iq.score,
            decision = scoreboard.decision.as_str(),
            "evaluation complete"
        );

        Evaluation {
            profile,
            pack,
            offer_iq,
            scoreboard,
        }
    }
}
