// src/research/queries.rs
//! Search query planning per fact bucket.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::locale::market_name;
use super::types::{DepthLevel, FactBucket, Locale};
use crate::campaign::CampaignContext;
use crate::category::CategoryProfile;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedQuery {
    pub text: String,
    pub bucket: FactBucket,
    /// Results of this query are fetched and run through signal extraction.
    pub fetch_pages: bool,
}

fn competitor_budget(level: DepthLevel) -> usize {
    match level {
        DepthLevel::Lite => 0,
        DepthLevel::Deep => 4,
        DepthLevel::Max => 8,
    }
}

fn retailer_budget(level: DepthLevel) -> usize {
    match level {
        DepthLevel::Lite => 0,
        DepthLevel::Deep => 2,
        DepthLevel::Max => 4,
    }
}

pub fn plan_queries(
    campaign: &CampaignContext,
    profile: &CategoryProfile,
    level: DepthLevel,
    locale: &Locale,
) -> Vec<PlannedQuery> {
    plan_queries_with(campaign, profile, level, locale, &campaign.brand, profile.category.label())
}

/// Plan with explicit (usually canonicalized) brand and category names.
/// LITE plans nothing.
pub fn plan_queries_with(
    campaign: &CampaignContext,
    profile: &CategoryProfile,
    level: DepthLevel,
    locale: &Locale,
    brand: &str,
    category: &str,
) -> Vec<PlannedQuery> {
    if level == DepthLevel::Lite {
        return Vec::new();
    }
    let market = market_name(&locale.gl);

    let mut plan = Vec::new();
    let mut push = |bucket: FactBucket, fetch_pages: bool, text: String| {
        plan.push(PlannedQuery {
            text,
            bucket,
            fetch_pages,
        })
    };

    if !brand.trim().is_empty() {
        push(FactBucket::Brand, false, format!("{brand} {market}"));
        push(FactBucket::Brand, false, format!("{brand} promotion"));
    }
    push(FactBucket::Category, false, format!("{category} market trends {market}"));
    if let Some(a) = campaign.audience.as_deref().filter(|a| !a.trim().is_empty()) {
        push(FactBucket::Audience, false, format!("{a} {category} shopping behaviour"));
    }

    for comp in profile.competitors.iter().take(competitor_budget(level)) {
        push(
            FactBucket::Competitor,
            true,
            format!("{comp} promotion {market} win OR cashback"),
        );
    }
    push(FactBucket::Category, true, format!("{category} cashback offer {market}"));
    push(FactBucket::Category, true, format!("{category} competition win prizes {market}"));
    if level == DepthLevel::Max {
        push(FactBucket::Category, true, format!("{category} gift with purchase {market}"));
    }

    for r in profile.retailers.iter().take(retailer_budget(level)) {
        push(FactBucket::Retailer, false, format!("{r} {category} promotion"));
    }
    push(FactBucket::Market, false, format!("{category} promotions {market}"));
    if let Some(s) = campaign.timing.season.as_deref().filter(|s| !s.trim().is_empty()) {
        push(FactBucket::Season, false, format!("{s} {category} promotion {market}"));
    }

    let mut seen = HashSet::new();
    plan.into_iter()
        .map(|mut q| {
            q.text = q.text.split_whitespace().collect::<Vec<_>>().join(" ");
            q
        })
        .filter(|q| seen.insert(q.text.to_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::classify_campaign;
    use crate::research::locale::market_locale;

    fn au() -> Locale {
        market_locale("AU", "au", "en")
    }

    fn campaign() -> CampaignContext {
        CampaignContext {
            id: "c1".into(),
            brand: "Acme".into(),
            category: "kitchen appliances".into(),
            market: "AU".into(),
            audience: Some("young families".into()),
            ..Default::default()
        }
    }

    #[test]
    fn lite_plans_nothing() {
        let c = campaign();
        assert!(plan_queries(&c, &classify_campaign(&c), DepthLevel::Lite, &au()).is_empty());
    }

    #[test]
    fn deep_plan_has_promo_queries_per_competitor() {
        let c = campaign();
        let p = classify_campaign(&c);
        let plan = plan_queries(&c, &p, DepthLevel::Deep, &au());
        let comp: Vec<_> = plan
            .iter()
            .filter(|q| q.bucket == FactBucket::Competitor)
            .collect();
        assert_eq!(comp.len(), 4);
        assert!(comp.iter().all(|q| q.fetch_pages));
        assert!(comp[0].text.starts_with("Samsung promotion Australia"));
        assert!(plan.iter().any(|q| q.bucket == FactBucket::Audience));
        assert!(plan
            .iter()
            .filter(|q| q.bucket == FactBucket::Brand)
            .all(|q| !q.fetch_pages));

        let max = plan_queries(&c, &p, DepthLevel::Max, &au());
        assert!(max.len() > plan.len());
    }

    #[test]
    fn unknown_market_uses_the_given_locale() {
        let c = CampaignContext {
            market: "Bavaria".into(),
            ..campaign()
        };
        let p = classify_campaign(&c);
        let de = market_locale(&c.market, "de", "de");
        let plan = plan_queries(&c, &p, DepthLevel::Deep, &de);
        assert!(!plan.is_empty());
        assert!(plan.iter().all(|q| !q.text.contains("Australia")));
    }
}
