// src/offer_iq/lenses.rs
//! One function per lens. Each reads [`Inputs`] only and returns a clamped,
//! rounded [`Lens`].

use super::{Inputs, Lens};
use crate::campaign::{Cadence, CampaignContext, OfferMode};

/// Typical claim-to-payment wait when a cashback brief does not say.
const DEFAULT_CLAIM_WAIT_DAYS: u32 = 28;

fn cadence_label(c: Option<Cadence>) -> &'static str {
    c.map_or("no", Cadence::as_str)
}

/// Participation effort. 0 is "buy and done"; each unit costs 1.4 simplicity.
pub fn effort(campaign: &CampaignContext, mode: OfferMode) -> f64 {
    let offer = &campaign.offer;
    let e = &offer.entry;
    let claim_based = mode == OfferMode::Assured && offer.cashback.is_some();

    let screens = e.screens.unwrap_or(1).saturating_sub(1) as f64;
    let fields = e.required_fields.unwrap_or(3).saturating_sub(3) as f64;
    let proof = e.proof_of_purchase.unwrap_or(claim_based);
    let wait = e
        .wait_days
        .unwrap_or(if claim_based { DEFAULT_CLAIM_WAIT_DAYS } else { 0 });
    let wait_cost = match wait {
        0..=7 => 0.0,
        8..=30 => 0.8,
        _ => 1.6,
    };

    0.6 * screens
        + 0.25 * fields
        + if proof { 1.5 } else { 0.0 }
        + if e.app_only { 1.5 } else { 0.0 }
        + wait_cost
}

pub(crate) fn adequacy(i: &Inputs<'_>) -> Lens {
    match i.mode {
        OfferMode::Assured => assured_adequacy(i),
        OfferMode::Prize => prize_adequacy(i),
    }
}

fn assured_adequacy(i: &Inputs<'_>) -> Lens {
    let d = &i.profile.defaults;
    let (Some(v), Some(best)) = (i.value, i.floor_ratio()) else {
        return Lens::new(
            4.0,
            "No assured value could be resolved from the brief",
            format!(
                "State the cashback or gift value; in {} it needs at least ${:.0} or {:.0}% of price",
                i.profile.category.label(),
                d.absolute_floor,
                d.percent_floor
            ),
        );
    };

    let mut score = if best >= 1.0 {
        6.5 + ((best - 1.0) * 2.5).min(2.5)
    } else {
        1.0 + 5.5 * best
    };

    let mut market = String::new();
    if let Some(cb) = i.benchmarks.map(|b| &b.cashback).filter(|c| c.sample >= 3) {
        if let (Some(p25), Some(p75)) = (cb.p25_abs, cb.p75_abs) {
            if v.abs >= p75 {
                score += 0.8;
                market = format!("; at or above the market's upper quartile (${p75:.0})");
            } else if v.abs <= p25 {
                score -= 0.6;
                market = format!("; at or below the market's lower quartile (${p25:.0})");
            }
        }
    }

    let why = format!(
        "${:.0} ({:.1}% of ${:.0} ASP) against a ${:.0} / {:.0}% floor{}",
        v.abs,
        v.pct,
        i.asp,
        d.absolute_floor,
        d.percent_floor,
        market
    );
    let fix = if best >= 1.0 {
        "Value clears the category floor; keep the headline simple".to_string()
    } else {
        format!(
            "Raise the assured value to at least ${:.0} (or {:.0}% of price), or switch to a prize mechanic",
            d.absolute_floor, d.percent_floor
        )
    };
    Lens::new(score, why, fix)
}

fn prize_adequacy(i: &Inputs<'_>) -> Lens {
    let (mut score, mut why) = match i.coverage {
        Some(c) => {
            let tier = if c >= 0.05 {
                8.0
            } else if c >= 0.01 {
                6.0
            } else if c >= 0.003 {
                4.0
            } else {
                2.0
            };
            (tier, format!("{:.2}% of expected buyers win", c * 100.0))
        }
        None => (4.5, "Winner coverage unknown (winners or expected buyers missing)".to_string()),
    };

    let offer = &i.campaign.offer;
    if offer.symbolic_reward {
        score += 0.5;
    }
    score += match i.cadence {
        Some(Cadence::Instant) => 1.0,
        Some(Cadence::Daily) => 0.7,
        Some(Cadence::Weekly) => 0.5,
        None => 0.0,
    };
    if i.cadence.is_some() {
        why.push_str(&format!("; {} winners", cadence_label(i.cadence)));
    }

    let winners = offer.total_winners().unwrap_or(0);
    let market_many = i
        .benchmarks
        .and_then(|b| b.many_winners_share)
        .is_some_and(|s| s >= 0.5);
    if market_many && winners < crate::benchmarks::MANY_WINNERS {
        score -= 0.5;
        why.push_str("; most competitors give away 100+ prizes");
    }

    let fix = match i.coverage {
        Some(c) if c >= 0.01 => "Coverage is healthy; make the odds visible on pack".to_string(),
        Some(_) => "Add a long tail of smaller prizes or instant/daily winners to lift coverage above 1%".to_string(),
        None => "Declare total winners and expected buyers so odds can be judged".to_string(),
    };
    Lens::new(score, why, fix)
}

pub(crate) fn simplicity(i: &Inputs<'_>) -> Lens {
    let e = &i.campaign.offer.entry;
    let score = 10.0 - 1.4 * i.effort;
    let mut parts = Vec::new();
    if let Some(s) = e.screens.filter(|s| *s > 1) {
        parts.push(format!("{s} screens"));
    }
    if let Some(f) = e.required_fields.filter(|f| *f > 3) {
        parts.push(format!("{f} fields"));
    }
    let claim_based = i.mode == OfferMode::Assured && i.campaign.offer.cashback.is_some();
    if e.proof_of_purchase.unwrap_or(claim_based) {
        parts.push("proof of purchase".to_string());
    }
    if e.app_only {
        parts.push("app only".to_string());
    }
    let wait = e.wait_days.unwrap_or(if claim_based { DEFAULT_CLAIM_WAIT_DAYS } else { 0 });
    if wait > 7 {
        parts.push(format!("~{wait} day wait"));
    }
    let why = if parts.is_empty() {
        "Buy and done".to_string()
    } else {
        format!("Effort {:.1}: {}", i.effort, parts.join(", "))
    };
    let fix = if i.effort <= 2.0 {
        "Keep entry to one screen".to_string()
    } else {
        "Cut entry to one screen, drop optional fields and pay out within 7 days".to_string()
    };
    Lens::new(score, why, fix)
}

pub(crate) fn certainty(i: &Inputs<'_>) -> Lens {
    match i.mode {
        OfferMode::Assured => {
            let adequacy = adequacy(i).score;
            let mut score = (6.0 + 0.4 * adequacy).min(10.0);
            let mut why = "Every qualifying buyer is rewarded".to_string();
            let mut fix = "Say \"guaranteed\" in the headline".to_string();
            if let Some(v) = i.value.filter(|v| v.headline_max >= 3.0 * v.abs) {
                score -= 1.0;
                why = format!(
                    "Headline \"up to ${:.0}\" overstates the typical ${:.0}",
                    v.headline_max, v.abs
                );
                fix = "Lead with the amount most buyers actually get".to_string();
            }
            Lens::new(score, why, fix)
        }
        OfferMode::Prize => {
            let mut score = 3.0
                + match i.cadence {
                    Some(Cadence::Instant) => 3.0,
                    Some(Cadence::Daily) => 2.0,
                    Some(Cadence::Weekly) => 1.5,
                    None => 0.0,
                };
            if i.coverage.is_some_and(|c| c >= 0.01) {
                score += 1.0;
            }
            let mut why = format!("Chance-based with {} cadence", cadence_label(i.cadence));
            if let Some((dominant, share)) = i
                .benchmarks
                .and_then(|b| b.cadence_share.dominant())
                .filter(|(_, s)| *s >= 0.5)
            {
                match i.cadence {
                    None => {
                        score -= 0.5;
                        why.push_str(&format!(
                            "; {:.0}% of competitors run {} winners",
                            share * 100.0,
                            dominant.as_str()
                        ));
                    }
                    Some(c) if c == dominant => score += 0.5,
                    Some(_) => {}
                }
            }
            let fix = if i.cadence.is_none() {
                "Add instant or daily winners so entrants see people winning".to_string()
            } else {
                "Publicise winners as they are drawn".to_string()
            };
            Lens::new(score, why, fix)
        }
    }
}

pub(crate) fn salience(i: &Inputs<'_>) -> Lens {
    match i.mode {
        OfferMode::Assured => {
            let floor = i.profile.defaults.absolute_floor;
            let (score, why) = match i.value {
                Some(v) if floor > 0.0 => (
                    (3.0 + 3.0 * v.abs / floor).clamp(0.0, 9.5),
                    format!("${:.0} back is {:.1}x the category floor", v.abs, v.abs / floor),
                ),
                _ => (3.0, "No stated value to put on pack".to_string()),
            };
            Lens::new(score, why, "Make the dollar value the biggest thing on pack")
        }
        OfferMode::Prize => {
            let p = i.campaign.offer.prizes.as_ref();
            let mut score: f64 = 4.0;
            let mut why = Vec::new();
            if let Some(v) = p.and_then(|p| p.hero_value).filter(|v| *v > 0.0) {
                score += 1.0;
                why.push(format!("${v:.0} hero prize"));
            }
            score += match i.cadence {
                Some(Cadence::Instant) => 1.5,
                Some(_) => 1.0,
                None => 0.0,
            };
            if i.campaign.offer.symbolic_reward {
                score += 1.0;
                why.push("symbolic reward".to_string());
            }
            if p.is_some_and(|p| p.experiential_overlay) {
                score += 0.5;
                why.push("experiential layer".to_string());
            }
            let why = if why.is_empty() {
                "No standout prize".to_string()
            } else {
                why.join(", ")
            };
            Lens::new(score, why, "Name the hero prize and its value in the hook")
        }
    }
}

pub(crate) fn talkability(i: &Inputs<'_>) -> Lens {
    let offer = &i.campaign.offer;
    let p = offer.prizes.as_ref();
    let mut score: f64 = 4.0;
    let mut why = Vec::new();
    if p.is_some_and(|p| p.experiential_overlay) {
        score += 2.5;
        why.push("money-can't-buy experience");
    }
    if offer.symbolic_reward {
        score += 1.5;
        why.push("symbolic reward");
    }
    if p.and_then(|p| p.hero_value).is_some_and(|v| v >= 10_000.0) {
        score += 1.0;
        why.push("big-ticket hero prize");
    }
    let cashback_only = i.mode == OfferMode::Assured && offer.prizes.is_none() && offer.gwp.is_none();
    if cashback_only {
        score -= 0.5;
        why.push("cashback alone is rarely shared");
    }
    let why = if why.is_empty() {
        "Nothing to talk about beyond the offer".to_string()
    } else {
        why.join(", ")
    };
    Lens::new(score, why, "Add a story element people would repeat")
}

pub(crate) fn retailer_fit(i: &Inputs<'_>) -> Lens {
    let offer = &i.campaign.offer;
    let mut score: f64 = 5.0;
    let mut why = Vec::new();
    if offer.zero_staff_burden {
        score += 2.5;
        why.push("no store staff involvement");
    }
    if offer.central_fulfilment {
        score += 1.5;
        why.push("centrally fulfilled");
    }
    if offer.staff_burden == Some(true) {
        score -= 2.0;
        why.push("needs store staff to act");
    }
    let why = if why.is_empty() {
        "Retail execution not described".to_string()
    } else {
        why.join(", ")
    };
    Lens::new(score, why, "Run claims and fulfilment centrally so stores only sell")
}

pub(crate) fn brand_fit(i: &Inputs<'_>) -> Lens {
    let offer = &i.campaign.offer;
    let assets = offer.brand_assets.iter().filter(|a| !a.trim().is_empty()).count();
    let mut score = 5.0 + assets.min(3) as f64;
    let brand = i.campaign.brand.trim().to_lowercase();
    let branded_prize = !brand.is_empty()
        && offer
            .prizes
            .as_ref()
            .is_some_and(|p| p.items.iter().any(|it| it.to_lowercase().contains(&brand)));
    if branded_prize {
        score += 1.0;
    }
    let why = format!(
        "{} brand asset{}{}",
        assets,
        if assets == 1 { "" } else { "s" },
        if branded_prize { ", branded prize" } else { "" }
    );
    Lens::new(score, why, "Build the reward around a distinctive brand asset")
}
