//! # Offer Scorer
//! Pure, deterministic scoring of a declared offer against category floors
//! and (optionally) market benchmarks. No I/O.
//!
//! Seven lenses are scored 0..10 and blended with fixed weights. Confidence
//! starts at 0.7 and moves with input completeness and evidence volume. The
//! verdict rules are checked in order, first match wins.

mod lenses;

use serde::{Deserialize, Serialize};

use crate::benchmarks::{MarketPosition, ResearchBenchmarks};
use crate::campaign::{AspSource, AssuredValue, Cadence, CampaignContext, OfferMode};
use crate::category::CategoryProfile;
use crate::config::research::{DEFAULT_GL, DEFAULT_HL};
use crate::research::locale::market_locale;
use crate::research::types::ResearchPack;

pub use lenses::effort;

/// Lens weights, in lens order. Sums to 1.
pub const WEIGHTS: [f64; 7] = [0.30, 0.15, 0.15, 0.15, 0.10, 0.10, 0.05];

pub const GO_THRESHOLD: f64 = 7.5;
/// Adequacy below this is a value problem, not a tuning problem.
pub const INADEQUATE_BELOW: f64 = 3.0;
/// Winners / buyers below this (0.3%) is a tiny coverage.
pub const TINY_COVERAGE: f64 = 0.003;
pub const CONFIDENT: f64 = 0.7;
pub const REVIEW_BELOW: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "GO")]
    Go,
    #[serde(rename = "GO WITH CONDITIONS")]
    GoWithConditions,
    #[serde(rename = "NO-GO")]
    NoGo,
    #[serde(rename = "REVIEW")]
    Review,
}

impl Verdict {
    /// Ratchet order. REVIEW weighs the same as GO WITH CONDITIONS.
    pub fn severity(self) -> u8 {
        match self {
            Verdict::Go => 1,
            Verdict::GoWithConditions | Verdict::Review => 2,
            Verdict::NoGo => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Go => "GO",
            Verdict::GoWithConditions => "GO WITH CONDITIONS",
            Verdict::NoGo => "NO-GO",
            Verdict::Review => "REVIEW",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HardFlag {
    InadequateValue,
    CoverageTiny,
}

/// One lens: score plus the explanation and the suggested fix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lens {
    pub score: f64,
    pub why: String,
    pub fix: String,
}

impl Lens {
    pub(crate) fn new(score: f64, why: impl Into<String>, fix: impl Into<String>) -> Self {
        Self {
            score: round1(score.clamp(0.0, 10.0)),
            why: why.into(),
            fix: fix.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lenses {
    pub adequacy: Lens,
    pub simplicity: Lens,
    pub certainty: Lens,
    pub salience: Lens,
    pub talkability: Lens,
    pub retailer_fit: Lens,
    pub brand_fit: Lens,
}

impl Lenses {
    fn scores(&self) -> [f64; 7] {
        [
            self.adequacy.score,
            self.simplicity.score,
            self.certainty.score,
            self.salience.score,
            self.talkability.score,
            self.retailer_fit.score,
            self.brand_fit.score,
        ]
    }

    /// Weighted composite, rounded to one decimal.
    pub fn composite(&self) -> f64 {
        let raw: f64 = self.scores().iter().zip(WEIGHTS).map(|(s, w)| s * w).sum();
        round1(raw.clamp(0.0, 10.0))
    }
}

/// The numbers the lenses were computed from; the scoreboard reads these
/// rather than re-deriving anything from the brief.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub mode: OfferMode,
    pub asp: f64,
    pub asp_source: AspSource,
    pub representative_value: Option<f64>,
    pub representative_pct: Option<f64>,
    pub headline_max: Option<f64>,
    /// Best of value/absolute floor and pct/percent floor (ASSURED only).
    pub floor_ratio: Option<f64>,
    /// Winners / expected buyers (PRIZE only).
    pub coverage: Option<f64>,
    pub cadence: Option<Cadence>,
    pub effort: f64,
    pub benchmark_sample: usize,
    pub position_vs_market: MarketPosition,
    /// Market code the campaign was researched in.
    pub market: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferIq {
    pub score: f64,
    pub verdict: Verdict,
    pub confidence: f64,
    pub lenses: Lenses,
    pub hard_flags: Vec<HardFlag>,
    pub mode: OfferMode,
    pub diagnostics: Diagnostics,
}

impl OfferIq {
    pub fn has_flag(&self, f: HardFlag) -> bool {
        self.hard_flags.contains(&f)
    }
}

/// Everything the lens functions need, resolved once.
pub(crate) struct Inputs<'a> {
    pub campaign: &'a CampaignContext,
    pub profile: &'a CategoryProfile,
    pub mode: OfferMode,
    pub asp: f64,
    pub value: Option<AssuredValue>,
    pub coverage: Option<f64>,
    pub cadence: Option<Cadence>,
    pub effort: f64,
    pub benchmarks: Option<&'a ResearchBenchmarks>,
}

impl Inputs<'_> {
    /// Best floor ratio of the assured value.
    pub fn floor_ratio(&self) -> Option<f64> {
        let v = self.value?;
        let d = &self.profile.defaults;
        let abs = if d.absolute_floor > 0.0 { v.abs / d.absolute_floor } else { 0.0 };
        let pct = if d.percent_floor > 0.0 { v.pct / d.percent_floor } else { 0.0 };
        let best = abs.max(pct);
        best.is_finite().then_some(best)
    }
}

pub(crate) fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn coverage(campaign: &CampaignContext) -> Option<f64> {
    let winners = campaign.offer.total_winners().filter(|w| *w > 0)?;
    let buyers = campaign.offer.expected_buyers.filter(|b| *b > 0)?;
    Some(winners as f64 / buyers as f64)
}

/// Score `campaign`'s offer. `pack` contributes benchmarks when present.
pub fn score_offer(
    campaign: &CampaignContext,
    profile: &CategoryProfile,
    pack: Option<&ResearchPack>,
) -> OfferIq {
    let offer = &campaign.offer;
    let mode = offer.mode();
    let (asp, asp_source) = offer.asp_anchor(profile.defaults.asp_fallback);
    let value = match mode {
        OfferMode::Assured => offer.assured_value_at(asp),
        OfferMode::Prize => None,
    };
    let inputs = Inputs {
        campaign,
        profile,
        mode,
        asp,
        value,
        coverage: match mode {
            OfferMode::Prize => coverage(campaign),
            OfferMode::Assured => None,
        },
        cadence: offer.cadence(),
        effort: effort(campaign, mode),
        benchmarks: pack.map(|p| &p.benchmarks),
    };

    let lenses = Lenses {
        adequacy: lenses::adequacy(&inputs),
        simplicity: lenses::simplicity(&inputs),
        certainty: lenses::certainty(&inputs),
        salience: lenses::salience(&inputs),
        talkability: lenses::talkability(&inputs),
        retailer_fit: lenses::retailer_fit(&inputs),
        brand_fit: lenses::brand_fit(&inputs),
    };
    let score = lenses.composite();

    let mut hard_flags = Vec::new();
    if mode == OfferMode::Assured && lenses.adequacy.score < INADEQUATE_BELOW {
        hard_flags.push(HardFlag::InadequateValue);
    }
    if mode == OfferMode::Prize
        && inputs.cadence.is_none()
        && inputs.coverage.is_some_and(|c| c < TINY_COVERAGE)
    {
        hard_flags.push(HardFlag::CoverageTiny);
    }

    let promos = pack.map_or(0, |p| p.promos().len());
    let confidence = confidence(&inputs, promos);
    let verdict = verdict(score, confidence, mode, lenses.adequacy.score, &hard_flags);

    let bench = inputs.benchmarks;
    let diagnostics = Diagnostics {
        mode,
        asp,
        asp_source,
        representative_value: value.map(|v| v.abs),
        representative_pct: value.map(|v| v.pct),
        headline_max: value.map(|v| v.headline_max),
        floor_ratio: inputs.floor_ratio(),
        coverage: inputs.coverage,
        cadence: inputs.cadence,
        effort: inputs.effort,
        benchmark_sample: bench.map_or(0, |b| b.cashback.sample.max(b.prize_counts_observed.total)),
        position_vs_market: bench.map_or(MarketPosition::Unknown, |b| b.position_vs_market),
        market: pack.map_or_else(
            || market_locale(&campaign.market, DEFAULT_GL, DEFAULT_HL).gl,
            |p| p.meta.market.clone(),
        ),
    };

    tracing::debug!(
        target: "offer_iq",
        id = %crate::cache::anon_hash(&campaign.id),
        score,
        confidence,
        verdict = verdict.as_str(),
        flags = hard_flags.len(),
        "offer scored"
    );

    OfferIq {
        score,
        verdict,
        confidence,
        lenses,
        hard_flags,
        mode,
        diagnostics,
    }
}

fn confidence(inputs: &Inputs<'_>, promos: usize) -> f64 {
    let offer = &inputs.campaign.offer;
    let mut c: f64 = 0.7;
    match inputs.mode {
        OfferMode::Prize => {
            if offer.expected_buyers.filter(|b| *b > 0).is_none() {
                c -= 0.15;
            }
            if offer.total_winners().filter(|w| *w > 0).is_none() {
                c -= 0.15;
            }
        }
        OfferMode::Assured => {
            if inputs.value.is_none() {
                c -= 0.2;
            }
        }
    }
    if promos > 0 {
        c += 0.05;
    }
    if promos >= 5 {
        c += 0.05;
    }
    round2(c.clamp(0.2, 0.95))
}

fn verdict(score: f64, confidence: f64, mode: OfferMode, adequacy: f64, flags: &[HardFlag]) -> Verdict {
    if score >= GO_THRESHOLD && flags.is_empty() {
        return Verdict::Go;
    }
    let value_failure = match mode {
        OfferMode::Assured => adequacy < INADEQUATE_BELOW,
        OfferMode::Prize => flags.contains(&HardFlag::CoverageTiny),
    };
    if value_failure && confidence >= CONFIDENT {
        return Verdict::NoGo;
    }
    if mode == OfferMode::Prize && confidence < REVIEW_BELOW {
        return Verdict::Review;
    }
    Verdict::GoWithConditions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_sum_to_one() {
        let s: f64 = WEIGHTS.iter().sum();
        assert!((s - 1.0).abs() < 1e-9);
    }

    #[test]
    fn verdict_order() {
        assert_eq!(verdict(8.0, 0.7, OfferMode::Assured, 8.0, &[]), Verdict::Go);
        // High score with a flag never passes straight through.
        assert_eq!(
            verdict(8.0, 0.7, OfferMode::Prize, 6.0, &[HardFlag::CoverageTiny]),
            Verdict::NoGo
        );
        assert_eq!(verdict(4.0, 0.65, OfferMode::Assured, 2.0, &[]), Verdict::GoWithConditions);
        assert_eq!(verdict(4.0, 0.4, OfferMode::Prize, 4.0, &[]), Verdict::Review);
        assert_eq!(verdict(6.0, 0.7, OfferMode::Prize, 5.0, &[]), Verdict::GoWithConditions);
    }

    #[test]
    fn severity_ranks_review_with_conditions() {
        assert_eq!(Verdict::Review.severity(), Verdict::GoWithConditions.severity());
        assert!(Verdict::NoGo.severity() > Verdict::Review.severity());
        assert!(Verdict::Go.severity() < Verdict::Review.severity());
    }

    #[test]
    fn verdict_serializes_with_spaces() {
        let s = serde_json::to_string(&Verdict::GoWithConditions).unwrap();
        assert_eq!(s, "\"GO WITH CONDITIONS\"");
        assert_eq!(serde_json::to_string(&HardFlag::CoverageTiny).unwrap(), "\"COVERAGE_TINY\"");
    }
}
