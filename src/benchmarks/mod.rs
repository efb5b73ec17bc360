//! # Benchmark Aggregator
//!
//! Reduces competitor promotions into comparison statistics. Always
//! recomputed from the full promo list; nothing here is patched in place.
//! Every numeric output is finite or `None`.

pub mod stats;

use serde::{Deserialize, Serialize};

use crate::campaign::{AssuredValue, Cadence, CampaignContext, OfferMode};
use crate::category::CategoryProfile;
use crate::research::types::{CompetitorPromo, PromoType};

/// Promotions reporting at least this many winners count as "many winners".
pub const MANY_WINNERS: u64 = 100;
/// Dead-band around the typical cashback value.
pub const POSITION_BAND: f64 = 0.15;
pub const DEFAULT_HERO_COUNT: u32 = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroPrize {
    pub median: Option<f64>,
    pub mode: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CadenceShare {
    pub instant: Option<f64>,
    pub weekly: Option<f64>,
    pub daily: Option<f64>,
}

impl CadenceShare {
    pub fn get(&self, c: Cadence) -> Option<f64> {
        match c {
            Cadence::Instant => self.instant,
            Cadence::Weekly => self.weekly,
            Cadence::Daily => self.daily,
        }
    }

    /// Highest-share cadence; ties resolve instant, weekly, daily.
    pub fn dominant(&self) -> Option<(Cadence, f64)> {
        [Cadence::Instant, Cadence::Weekly, Cadence::Daily]
            .into_iter()
            .filter_map(|c| self.get(c).map(|s| (c, s)))
            .fold(None, |best: Option<(Cadence, f64)>, cur| match best {
                Some(b) if b.1 >= cur.1 => Some(b),
                _ => Some(cur),
            })
    }

    /// Share of promotions that announce winners on any cadence.
    pub fn any(&self) -> Option<f64> {
        let parts = [self.instant, self.weekly, self.daily];
        parts.iter().any(Option::is_some).then(|| parts.iter().flatten().sum())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashbackBenchmark {
    pub sample: usize,
    pub typical_abs: Option<f64>,
    pub typical_pct: Option<f64>,
    pub max_abs: Option<f64>,
    pub max_pct: Option<f64>,
    pub p25_abs: Option<f64>,
    pub p75_abs: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrizeCount {
    pub count: u32,
    pub share: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrizeCountsObserved {
    /// Promotions that reported a hero count.
    pub total: usize,
    /// Up to three most frequent hero counts.
    pub common: Vec<PrizeCount>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketPosition {
    AboveTypical,
    AtTypical,
    BelowTypical,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchBenchmarks {
    pub hero_prize: HeroPrize,
    pub cadence_share: CadenceShare,
    pub many_winners_share: Option<f64>,
    pub cashback: CashbackBenchmark,
    pub prize_counts_observed: PrizeCountsObserved,
    pub recommended_hero_count: u32,
    pub position_vs_market: MarketPosition,
}

impl Default for ResearchBenchmarks {
    fn default() -> Self {
        Self {
            hero_prize: HeroPrize::default(),
            cadence_share: CadenceShare::default(),
            many_winners_share: None,
            cashback: CashbackBenchmark::default(),
            prize_counts_observed: PrizeCountsObserved::default(),
            recommended_hero_count: DEFAULT_HERO_COUNT,
            position_vs_market: MarketPosition::Unknown,
        }
    }
}

impl ResearchBenchmarks {
    pub fn is_empty(&self) -> bool {
        self.prize_counts_observed.total == 0
            && self.cashback.sample == 0
            && self.cadence_share.any().is_none()
            && self.many_winners_share.is_none()
    }
}

fn finite(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite())
}

fn recommended_hero_count(common: &[PrizeCount], hero: &HeroPrize) -> u32 {
    if common.iter().any(|c| c.count == 2) {
        return 2;
    }
    if common.iter().any(|c| c.count == 3) {
        return 3;
    }
    hero.mode
        .or_else(|| hero.median.map(|m| m.round().max(1.0) as u32))
        .unwrap_or(DEFAULT_HERO_COUNT)
}

fn cashback_benchmark(promos: &[CompetitorPromo]) -> CashbackBenchmark {
    let cashback: Vec<&CompetitorPromo> = promos
        .iter()
        .filter(|p| p.promo_type == PromoType::Cashback)
        .filter(|p| p.value_amount.is_some() || p.value_percent.is_some())
        .collect();
    let abs: Vec<f64> = cashback.iter().filter_map(|p| p.value_amount).collect();
    let pct: Vec<f64> = cashback.iter().filter_map(|p| p.value_percent).collect();

    CashbackBenchmark {
        sample: cashback.len(),
        typical_abs: stats::median(&abs),
        typical_pct: stats::median(&pct),
        max_abs: stats::max(&abs),
        max_pct: stats::max(&pct),
        p25_abs: stats::quantile(&abs, 0.25),
        p75_abs: stats::quantile(&abs, 0.75),
    }
}

/// Where the campaign's own assured value sits against the typical one.
pub fn position_vs_market(cb: &CashbackBenchmark, own: Option<&AssuredValue>) -> MarketPosition {
    let Some(own) = own else {
        return MarketPosition::Unknown;
    };
    if cb.sample == 0 {
        return MarketPosition::Unknown;
    }
    let ratio = match (cb.typical_abs, cb.typical_pct) {
        (Some(t), _) if t > 0.0 => own.abs / t,
        (_, Some(t)) if t > 0.0 => own.pct / t,
        _ => return MarketPosition::Unknown,
    };
    if !ratio.is_finite() {
        MarketPosition::Unknown
    } else if ratio >= 1.0 + POSITION_BAND {
        MarketPosition::AboveTypical
    } else if ratio <= 1.0 - POSITION_BAND {
        MarketPosition::BelowTypical
    } else {
        MarketPosition::AtTypical
    }
}

/// Benchmarks for one campaign: assured mode and own value come from its offer.
pub fn aggregate_for(
    promos: &[CompetitorPromo],
    campaign: &CampaignContext,
    profile: &CategoryProfile,
) -> ResearchBenchmarks {
    let assured = campaign.offer.mode() == OfferMode::Assured;
    let (asp, _) = campaign.offer.asp_anchor(profile.defaults.asp_fallback);
    let own = campaign.offer.assured_value_at(asp);
    aggregate(promos, assured, own.as_ref())
}

/// Full benchmark set. The cashback block is only computed for assured-value
/// campaigns; `own` is that campaign's value, when it declared one.
pub fn aggregate(
    promos: &[CompetitorPromo],
    assured_mode: bool,
    own: Option<&AssuredValue>,
) -> ResearchBenchmarks {
    let heroes: Vec<u32> = promos.iter().filter_map(|p| p.hero_count).collect();
    let hero_f: Vec<f64> = heroes.iter().map(|h| *h as f64).collect();
    let hero_prize = HeroPrize {
        median: stats::median(&hero_f),
        mode: stats::mode(&heroes),
    };

    let cadences: Vec<Cadence> = promos.iter().filter_map(|p| p.cadence).collect();
    let n_cad = cadences.len();
    let count = |c: Cadence| cadences.iter().filter(|x| **x == c).count();
    let cadence_share = CadenceShare {
        instant: finite(stats::share(count(Cadence::Instant), n_cad)),
        weekly: finite(stats::share(count(Cadence::Weekly), n_cad)),
        daily: finite(stats::share(count(Cadence::Daily), n_cad)),
    };

    // Promotions that do not report winners count towards the denominator.
    let many = promos
        .iter()
        .filter(|p| p.total_winners.is_some_and(|w| w >= MANY_WINNERS))
        .count();
    let many_winners_share = finite(stats::share(many, promos.len()));

    let common: Vec<PrizeCount> = stats::frequencies(&heroes)
        .into_iter()
        .take(3)
        .filter_map(|(count, n)| {
            finite(stats::share(n, heroes.len())).map(|share| PrizeCount { count, share })
        })
        .collect();
    let recommended = recommended_hero_count(&common, &hero_prize);

    let (cashback, position) = if assured_mode {
        let cb = cashback_benchmark(promos);
        let pos = position_vs_market(&cb, own);
        (cb, pos)
    } else {
        (CashbackBenchmark::default(), MarketPosition::Unknown)
    };

    ResearchBenchmarks {
        hero_prize,
        cadence_share,
        many_winners_share,
        cashback,
        prize_counts_observed: PrizeCountsObserved {
            total: heroes.len(),
            common,
        },
        recommended_hero_count: recommended,
        position_vs_market: position,
    }
}
