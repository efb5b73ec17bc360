//! Campaign input model.
//!
//! `CampaignContext` is the read-only brief supplied by the surrounding app.
//! Loosely typed brief values are coerced once at deserialization time (see
//! [`lenient`]), so every downstream stage works with typed, validated data.

pub mod bands;
pub mod lenient;

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

pub use bands::CashbackBand;

/// Winner announcement frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    Instant,
    Daily,
    Weekly,
}

impl Cadence {
    /// Map free text ("Instant Win", "every week", "daily draws") to a cadence.
    /// Whole words only, so "holiday" or "Monday" match nothing.
    pub fn from_text(s: &str) -> Option<Self> {
        static RULES: OnceCell<[(Cadence, Regex); 3]> = OnceCell::new();
        let rules = RULES.get_or_init(|| {
            [
                (Self::Instant, r"(?i)instant(ly)?"),
                (Self::Weekly, r"(?i)(weekly|weeks?)"),
                (Self::Daily, r"(?i)(daily|days?)"),
            ]
            .map(|(c, re)| (c, Regex::new(re).expect("cadence regex")))
        });
        rules.iter().find(|(_, re)| re.is_match(s)).map(|(c, _)| *c)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Instant => "instant",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
        }
    }
}

fn opt_cadence<'de, D>(d: D) -> Result<Option<Cadence>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(d)?;
    Ok(v.as_str().and_then(Cadence::from_text))
}

/// Assured-value (everyone who qualifies gets something) vs prize draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OfferMode {
    Assured,
    Prize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cashback {
    #[serde(default, deserialize_with = "lenient::opt_f64", skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64", skip_serializing_if = "Option::is_none")]
    pub percent: Option<f64>,
    #[serde(default)]
    pub bands: Vec<CashbackBand>,
    /// Maximum number of claims; a cap makes the reward scarce.
    #[serde(default, deserialize_with = "lenient::opt_u64", skip_serializing_if = "Option::is_none")]
    pub claim_cap: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GiftWithPurchase {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_f64", skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_u64", skip_serializing_if = "Option::is_none")]
    pub stock_cap: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrizeLadder {
    #[serde(default, deserialize_with = "lenient::opt_u32", skip_serializing_if = "Option::is_none")]
    pub hero_count: Option<u32>,
    #[serde(default, deserialize_with = "lenient::opt_f64", skip_serializing_if = "Option::is_none")]
    pub hero_value: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_u64", skip_serializing_if = "Option::is_none")]
    pub total_winners: Option<u64>,
    #[serde(default, deserialize_with = "opt_cadence", skip_serializing_if = "Option::is_none")]
    pub cadence: Option<Cadence>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub items: Vec<String>,
    /// Money-can't-buy / experiential layer on top of the main prizes.
    #[serde(default, deserialize_with = "lenient::flag")]
    pub experiential_overlay: bool,
    #[serde(default, deserialize_with = "lenient::opt_u32", skip_serializing_if = "Option::is_none")]
    pub entries_per_purchase: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryFriction {
    #[serde(default, deserialize_with = "lenient::opt_u32", skip_serializing_if = "Option::is_none")]
    pub screens: Option<u32>,
    #[serde(default, deserialize_with = "lenient::opt_u32", skip_serializing_if = "Option::is_none")]
    pub required_fields: Option<u32>,
    #[serde(default, deserialize_with = "lenient::opt_bool", skip_serializing_if = "Option::is_none")]
    pub proof_of_purchase: Option<bool>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub app_only: bool,
    /// Days between claim and reward arriving.
    #[serde(default, deserialize_with = "lenient::opt_u32", skip_serializing_if = "Option::is_none")]
    pub wait_days: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferTerms {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cashback: Option<Cashback>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gwp: Option<GiftWithPurchase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prizes: Option<PrizeLadder>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub assured_value: bool,
    #[serde(default, deserialize_with = "lenient::opt_u64", skip_serializing_if = "Option::is_none")]
    pub expected_buyers: Option<u64>,
    #[serde(default, deserialize_with = "lenient::opt_f64", skip_serializing_if = "Option::is_none")]
    pub asp: Option<f64>,
    #[serde(default)]
    pub entry: EntryFriction,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub zero_staff_burden: bool,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub central_fulfilment: bool,
    /// Explicit "store staff must do something" marker.
    #[serde(default, deserialize_with = "lenient::opt_bool", skip_serializing_if = "Option::is_none")]
    pub staff_burden: Option<bool>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub brand_assets: Vec<String>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub symbolic_reward: bool,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub age_gate: bool,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub permits_declared: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AspSource {
    Brief,
    CategoryFallback,
}

/// Resolved assured value for one buyer at the ASP anchor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssuredValue {
    /// Dollars the typical buyer receives.
    pub abs: f64,
    /// `abs` as a percentage of ASP.
    pub pct: f64,
    /// Largest absolute value any band/headline quotes.
    pub headline_max: f64,
}

impl OfferTerms {
    pub fn mode(&self) -> OfferMode {
        if self.assured_value {
            return OfferMode::Assured;
        }
        if let Some(cb) = &self.cashback {
            if cb.claim_cap.is_none() {
                return OfferMode::Assured;
            }
        }
        if let Some(g) = &self.gwp {
            if g.stock_cap.is_none() {
                return OfferMode::Assured;
            }
        }
        OfferMode::Prize
    }

    /// Valid bands only (non-positive bands dropped).
    pub fn cashback_bands(&self) -> Vec<CashbackBand> {
        self.cashback
            .as_ref()
            .map(|c| bands::normalize_bands(&c.bands))
            .unwrap_or_default()
    }

    /// Value a buyer at `asp` receives: banded cashback, then flat cashback,
    /// then percent cashback, then GWP value.
    pub fn assured_value_at(&self, asp: f64) -> Option<AssuredValue> {
        if !(asp.is_finite() && asp > 0.0) {
            return None;
        }
        let bands = self.cashback_bands();
        let mut abs = None;
        let mut headline = None;

        if let Some(b) = bands::select_band(&bands, asp) {
            abs = bands::representative_value(b, asp);
            headline = bands::headline_max(&bands, asp);
        }
        if abs.is_none() {
            if let Some(cb) = &self.cashback {
                abs = cb
                    .amount
                    .filter(|a| *a > 0.0)
                    .or_else(|| cb.percent.filter(|p| *p > 0.0).map(|p| p / 100.0 * asp));
            }
        }
        if abs.is_none() {
            abs = self.gwp.as_ref().and_then(|g| g.value).filter(|v| *v > 0.0);
        }

        let abs = abs?;
        Some(AssuredValue {
            abs,
            pct: abs / asp * 100.0,
            headline_max: headline.unwrap_or(abs).max(abs),
        })
    }

    /// ASP anchor: the brief's own value when positive, else `fallback`.
    pub fn asp_anchor(&self, fallback: f64) -> (f64, AspSource) {
        match self.asp.filter(|a| a.is_finite() && *a > 0.0) {
            Some(a) => (a, AspSource::Brief),
            None => (fallback, AspSource::CategoryFallback),
        }
    }

    pub fn cadence(&self) -> Option<Cadence> {
        self.prizes.as_ref().and_then(|p| p.cadence)
    }

    pub fn total_winners(&self) -> Option<u64> {
        self.prizes.as_ref().and_then(|p| p.total_winners)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignContext {
    pub id: String,
    pub brand: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub market: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mechanic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub retailers: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub competitors: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub kpis: Vec<String>,
    #[serde(default)]
    pub timing: Timing,
    #[serde(default)]
    pub offer: OfferTerms,
}

impl CampaignContext {
    /// Parse a JSON brief. Malformed JSON is an error; malformed values inside a
    /// well-formed brief are coerced to `None`.
    pub fn from_json(s: &str) -> anyhow::Result<Self> {
        let mut c: CampaignContext = serde_json::from_str(s)?;
        c.brand = c.brand.trim().to_string();
        if c.id.trim().is_empty() {
            anyhow::bail!("campaign brief is missing an id");
        }
        Ok(c)
    }

    /// Lower-cased concatenation of every free-text field, for keyword rules.
    pub fn brief_text(&self) -> String {
        let mut parts: Vec<&str> = vec![self.brand.as_str(), self.category.as_str()];
        for s in [
            &self.title,
            &self.objective,
            &self.hook,
            &self.mechanic,
            &self.audience,
            &self.notes,
        ]
        .into_iter()
        .flatten()
        {
            parts.push(s.as_str());
        }
        if let Some(h) = self.offer.cashback.as_ref().and_then(|c| c.headline.as_deref()) {
            parts.push(h);
        }
        if let Some(i) = self.offer.gwp.as_ref().and_then(|g| g.item.as_deref()) {
            parts.push(i);
        }
        if let Some(p) = &self.offer.prizes {
            parts.extend(p.items.iter().map(String::as_str));
        }
        parts.join(" ").to_lowercase()
    }

    /// Pub/bar/venue activations.
    pub fn is_on_premise(&self) -> bool {
        static RE: OnceCell<Regex> = OnceCell::new();
        let re = RE.get_or_init(|| {
            Regex::new(
                r"\b(pubs?|bars?|venues?|on[- ]?premise|on[- ]?prem|hotels?|clubs?|bistros?|taverns?|taprooms?|brewpubs?)\b",
            )
            .expect("on-premise regex")
        });
        re.is_match(&self.brief_text())
    }
}
