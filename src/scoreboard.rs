//! # Decision Gate
//! Ten independent traffic-light cells, a gate over the critical ones, and a
//! one-way ratchet against the Offer Scorer's verdict.
//!
//! The gate can only make the offer verdict stricter, never softer. The one
//! place the scorer writes back is `rewardShape`, overwritten at most once
//! when the scorer is confident the value itself is the problem.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::campaign::{CampaignContext, OfferMode};
use crate::category::CategoryProfile;
use crate::offer_iq::{OfferIq, Verdict, CONFIDENT};

/// At most this many dealbreakers are reported.
pub const MAX_DEALBREAKERS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Green,
    Amber,
    Red,
    #[serde(rename = "NA")]
    Na,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub status: Status,
    pub why: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix: Option<String>,
}

impl Cell {
    fn green(why: impl Into<String>) -> Self {
        Self {
            status: Status::Green,
            why: why.into(),
            fix: None,
        }
    }

    fn amber(why: impl Into<String>, fix: impl Into<String>) -> Self {
        Self {
            status: Status::Amber,
            why: why.into(),
            fix: Some(fix.into()),
        }
    }

    fn red(why: impl Into<String>, fix: impl Into<String>) -> Self {
        Self {
            status: Status::Red,
            why: why.into(),
            fix: Some(fix.into()),
        }
    }

    fn na(why: impl Into<String>) -> Self {
        Self {
            status: Status::Na,
            why: why.into(),
            fix: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cells {
    pub objective_fit: Cell,
    pub hook_strength: Cell,
    pub mechanic_fit: Cell,
    pub frequency_potential: Cell,
    pub friction: Cell,
    pub reward_shape: Cell,
    pub retailer_readiness: Cell,
    pub compliance_risk: Cell,
    pub fulfilment: Cell,
    pub kpi_realism: Cell,
}

impl Cells {
    /// `(name, cell, critical)` in display order.
    pub fn entries(&self) -> [(&'static str, &Cell, bool); 10] {
        [
            ("objectiveFit", &self.objective_fit, true),
            ("hookStrength", &self.hook_strength, false),
            ("mechanicFit", &self.mechanic_fit, true),
            ("frequencyPotential", &self.frequency_potential, false),
            ("friction", &self.friction, true),
            ("rewardShape", &self.reward_shape, true),
            ("retailerReadiness", &self.retailer_readiness, true),
            ("complianceRisk", &self.compliance_risk, true),
            ("fulfilment", &self.fulfilment, false),
            ("kpiRealism", &self.kpi_realism, false),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scoreboard {
    pub cells: Cells,
    pub decision: Verdict,
    pub conditions: Vec<String>,
    pub dealbreakers: Vec<String>,
    pub overridden: bool,
}

static PREMIUM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(premium|premiumi[sz]e|prestige|luxury|upscale|trade up)\b").expect("premium regex"));
static FREQUENCY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(frequency|repeat|loyalty|habit|re-?purchase|visits?)\b").expect("frequency regex"));
static IRRESPONSIBLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(binge|skol|scull|chug|bottomless|unlimited drinks?|drink more|drinking games?|shots? challenge|get drunk)\b")
        .expect("irresponsible regex")
});
static KPI_PERCENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*%").expect("kpi regex"));
static KPI_GROWTH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(uplift|lift|growth|grow|increase|incremental|up)\b").expect("kpi growth regex"));

fn present(s: &Option<String>) -> Option<&str> {
    s.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn objective_fit(c: &CampaignContext, offer: &OfferIq) -> Cell {
    let Some(obj) = present(&c.objective) else {
        return Cell::amber("No objective stated", "State one measurable objective for the promotion");
    };
    let discount = offer.diagnostics.representative_pct.unwrap_or(0.0);
    if PREMIUM.is_match(&obj.to_lowercase()) && offer.mode == OfferMode::Assured && discount >= 30.0 {
        return Cell::red(
            format!("A {discount:.0}% giveback undercuts a premium objective"),
            "Swap the discount for a value-add that protects price (GWP, experience)",
        );
    }
    Cell::green(format!("Objective: {obj}"))
}

fn hook_strength(c: &CampaignContext) -> Cell {
    let Some(hook) = present(&c.hook) else {
        return Cell::amber("No hook", "Write a one-line hook that names the reward");
    };
    let words = hook.split_whitespace().count();
    if words > 20 {
        Cell::amber(
            format!("Hook runs to {words} words"),
            "Cut the hook to 12 words or fewer",
        )
    } else if words <= 12 {
        Cell::green(format!("{words}-word hook"))
    } else {
        Cell::amber(format!("{words}-word hook"), "Tighten the hook to 12 words or fewer")
    }
}

fn mechanic_fit(c: &CampaignContext, offer: &OfferIq) -> Cell {
    match offer.mode {
        OfferMode::Prize => {
            let p = c.offer.prizes.as_ref();
            let described = p.is_some_and(|p| {
                p.hero_value.is_some() || p.hero_count.is_some() || p.total_winners.is_some()
            });
            if !described {
                return Cell::red(
                    "Prize mechanic without a hero prize or winner count",
                    "Define the hero prize and how many people win",
                );
            }
        }
        OfferMode::Assured => {
            if offer.diagnostics.representative_value.is_none() {
                return Cell::red(
                    "Assured-value mechanic without a stated value",
                    "State what every qualifying buyer receives",
                );
            }
            if c.offer.cashback.is_some() && c.is_on_premise() {
                return Cell::amber(
                    "Cashback claims are awkward for on-premise purchases",
                    "Use an instant reward redeemed at the venue",
                );
            }
        }
    }
    let label = match offer.mode {
        OfferMode::Assured => "Assured-value",
        OfferMode::Prize => "Prize",
    };
    Cell::green(format!("{label} mechanic is fully specified"))
}

fn frequency_potential(c: &CampaignContext, offer: &OfferIq) -> Cell {
    let wants_frequency = present(&c.objective).is_some_and(|o| FREQUENCY.is_match(&o.to_lowercase()));
    if !wants_frequency {
        return Cell::na("Objective is not about repeat purchase");
    }
    let repeatable = c
        .offer
        .prizes
        .as_ref()
        .and_then(|p| p.entries_per_purchase)
        .is_some_and(|e| e >= 1)
        || offer.diagnostics.cadence.is_some();
    if repeatable {
        Cell::green("Each purchase earns another chance")
    } else {
        Cell::amber(
            "Nothing rewards a second purchase",
            "Give one entry per purchase or a collect-and-redeem layer",
        )
    }
}

fn friction(offer: &OfferIq) -> Cell {
    let e = offer.diagnostics.effort;
    let why = format!("Entry effort {e:.1}");
    if e <= 2.0 {
        Cell::green(why)
    } else if e <= 4.0 {
        Cell::amber(why, offer.lenses.simplicity.fix.clone())
    } else {
        Cell::red(why, offer.lenses.simplicity.fix.clone())
    }
}

fn reward_shape(offer: &OfferIq) -> Cell {
    let d = &offer.diagnostics;
    match offer.mode {
        OfferMode::Assured => match d.floor_ratio {
            Some(r) if r >= 1.0 => Cell::green(format!("Value is {r:.1}x the category floor")),
            Some(r) if r >= 0.6 => Cell::amber(
                format!("Value is {r:.1}x the category floor"),
                offer.lenses.adequacy.fix.clone(),
            ),
            Some(r) => Cell::red(
                format!("Value is only {r:.1}x the category floor"),
                offer.lenses.adequacy.fix.clone(),
            ),
            None => Cell::red("No assured value", offer.lenses.adequacy.fix.clone()),
        },
        OfferMode::Prize => match d.coverage {
            Some(c) if c >= 0.01 => Cell::green(format!("{:.2}% of buyers win", c * 100.0)),
            Some(c) if c >= 0.003 || d.cadence.is_some() => Cell::amber(
                format!("{:.2}% of buyers win", c * 100.0),
                offer.lenses.adequacy.fix.clone(),
            ),
            Some(c) => Cell::red(
                format!("Only {:.2}% of buyers win", c * 100.0),
                offer.lenses.adequacy.fix.clone(),
            ),
            None => Cell::amber("Winner coverage unknown", offer.lenses.adequacy.fix.clone()),
        },
    }
}

fn retailer_readiness(c: &CampaignContext) -> Cell {
    let o = &c.offer;
    if o.staff_burden == Some(true) && !o.central_fulfilment {
        return Cell::red(
            "Store staff must run the mechanic with no central support",
            "Move claims and fulfilment to a central handler",
        );
    }
    if c.retailers.is_empty() {
        return Cell::amber("No retail partners named", "Confirm which retailers will range the promotion");
    }
    Cell::green(format!("Retailers: {}", c.retailers.join(", ")))
}

fn compliance_risk(c: &CampaignContext, profile: &CategoryProfile, offer: &OfferIq) -> Cell {
    let g = &profile.guardrails;
    if g.legal_sensitive && IRRESPONSIBLE.is_match(&c.brief_text()) {
        return Cell::red(
            "Brief language encourages excessive consumption",
            "Remove consumption-linked language and add responsible-service messaging",
        );
    }
    if g.min_age.is_some() && !c.offer.age_gate {
        return Cell::amber(
            format!("{} promotions need an age gate", profile.category.label()),
            format!("Add an {}+ age gate to entry", g.min_age.unwrap_or(18)),
        );
    }
    if offer.diagnostics.market == "au" && offer.mode == OfferMode::Prize && !c.offer.permits_declared {
        return Cell::amber(
            "Chance-based draws in Australia may need state permits",
            "Confirm trade promotion lottery permits (NSW, SA, ACT)",
        );
    }
    Cell::green("No compliance concerns detected")
}

fn fulfilment(c: &CampaignContext) -> Cell {
    if c.offer.central_fulfilment || c.offer.zero_staff_burden {
        Cell::green("Fulfilment handled centrally")
    } else {
        Cell::amber("Fulfilment path not described", "Name who ships or pays out rewards and how fast")
    }
}

fn kpi_realism(c: &CampaignContext) -> Cell {
    if c.kpis.is_empty() {
        return Cell::amber("No KPIs set", "Set a sales uplift and participation target");
    }
    let uplift = c
        .kpis
        .iter()
        .filter(|k| KPI_GROWTH.is_match(&k.to_lowercase()))
        .flat_map(|k| KPI_PERCENT.captures_iter(k).filter_map(|m| m[1].parse::<f64>().ok()))
        .reduce(f64::max);
    match uplift {
        Some(u) if u > 50.0 => Cell::red(
            format!("{u:.0}% uplift is beyond what promotions deliver"),
            "Reset the uplift target to 10-25%",
        ),
        Some(u) if u > 25.0 => Cell::amber(format!("{u:.0}% uplift is ambitious"), "Stress-test the uplift target against past promotions"),
        _ => Cell::green(format!("{} KPI(s) set", c.kpis.len())),
    }
}

/// Gate over cells alone.
pub fn gate(cells: &Cells) -> Verdict {
    let all = cells.entries();
    if all.iter().any(|(_, c, critical)| *critical && c.status == Status::Red) {
        Verdict::NoGo
    } else if all
        .iter()
        .any(|(_, c, _)| matches!(c.status, Status::Red | Status::Amber))
    {
        Verdict::GoWithConditions
    } else {
        Verdict::Go
    }
}

/// The stricter of the two. A REVIEW that wins is reported as GO WITH CONDITIONS.
pub fn ratchet(gate: Verdict, offer: Verdict) -> Verdict {
    let v = if offer.severity() > gate.severity() { offer } else { gate };
    match v {
        Verdict::Review => Verdict::GoWithConditions,
        v => v,
    }
}

pub fn build_scoreboard(campaign: &CampaignContext, profile: &CategoryProfile, offer: &OfferIq) -> Scoreboard {
    let mut cells = Cells {
        objective_fit: objective_fit(campaign, offer),
        hook_strength: hook_strength(campaign),
        mechanic_fit: mechanic_fit(campaign, offer),
        frequency_potential: frequency_potential(campaign, offer),
        friction: friction(offer),
        reward_shape: reward_shape(offer),
        retailer_readiness: retailer_readiness(campaign),
        compliance_risk: compliance_risk(campaign, profile, offer),
        fulfilment: fulfilment(campaign),
        kpi_realism: kpi_realism(campaign),
    };
    let gated = gate(&cells);
    let decision = ratchet(gated, offer.verdict);

    let mut overridden = false;
    if decision != Verdict::Go {
        let status = match offer.verdict {
            Verdict::NoGo if offer.confidence >= CONFIDENT => Some(Status::Red),
            Verdict::Review if offer.mode == OfferMode::Prize => Some(Status::Amber),
            _ => None,
        };
        if let Some(status) = status {
            cells.reward_shape = Cell {
                status,
                why: offer.lenses.adequacy.why.clone(),
                fix: Some(offer.lenses.adequacy.fix.clone()),
            };
            overridden = true;
        }
    }

    let dealbreakers: Vec<String> = cells
        .entries()
        .iter()
        .filter(|(_, c, critical)| *critical && c.status == Status::Red)
        .map(|(_, c, _)| c.why.clone())
        .take(MAX_DEALBREAKERS)
        .collect();
    let conditions: Vec<String> = cells
        .entries()
        .iter()
        .filter(|(_, c, _)| matches!(c.status, Status::Amber | Status::Red))
        .filter_map(|(_, c, _)| c.fix.clone())
        .collect();

    tracing::debug!(
        target: "scoreboard",
        id = %crate::cache::anon_hash(&campaign.id),
        gate = gated.as_str(),
        offer = offer.verdict.as_str(),
        decision = decision.as_str(),
        overridden,
        "scoreboard built"
    );

    Scoreboard {
        cells,
        decision,
        conditions,
        dealbreakers,
        overridden,
    }
}
