// src/research/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::benchmarks::ResearchBenchmarks;
use crate::campaign::Cadence;
use crate::error::EvidenceError;

/// How much research a run performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DepthLevel {
    /// Brief + static category facts only; zero network fetches.
    Lite,
    Deep,
    /// Manually triggered, never cached.
    Max,
}

impl DepthLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lite => "LITE",
            Self::Deep => "DEEP",
            Self::Max => "MAX",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LITE" => Some(Self::Lite),
            "DEEP" => Some(Self::Deep),
            "MAX" => Some(Self::Max),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Search/fetch locale derived from the campaign market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Locale {
    /// Country code, e.g. "au".
    pub gl: String,
    /// Interface language, e.g. "en".
    pub hl: String,
    pub accept_language: String,
}

#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, locale: &Locale) -> Result<Vec<SearchResult>, EvidenceError>;
    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PromoType {
    Cashback,
    Prize,
    Gwp,
    Other,
}

/// One competitor promotion, extracted from one fetched page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorPromo {
    pub brand: String,
    pub title: String,
    pub headline: String,
    pub url: String,
    /// Host the page came from.
    pub source: String,
    #[serde(rename = "type")]
    pub promo_type: PromoType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hero_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_winners: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cadence: Option<Cadence>,
    #[serde(default)]
    pub prize_items: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prize_value_hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_percent: Option<f64>,
    #[serde(default)]
    pub redemption: bool,
    #[serde(default)]
    pub gift_card: bool,
    pub confidence: f32,
}

/// Which part of the pack a fact (or a query) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactBucket {
    Brand,
    Category,
    Audience,
    Competitor,
    Retailer,
    Market,
    Season,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactOrigin {
    Brief,
    Category,
    Search,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fact {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub origin: FactOrigin,
}

impl Fact {
    pub fn brief(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: None,
            origin: FactOrigin::Brief,
        }
    }

    pub fn category(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: None,
            origin: FactOrigin::Category,
        }
    }

    pub fn search(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: Some(url.into()),
            origin: FactOrigin::Search,
        }
    }
}

/// Why evidence was dropped during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropCounts {
    pub filtered: usize,
    pub fetch_failed: usize,
    pub fetch_timeout: usize,
    pub parse_empty: usize,
}

impl DropCounts {
    pub fn record(&mut self, e: &EvidenceError) {
        match e {
            EvidenceError::FetchTimeout { .. } => self.fetch_timeout += 1,
            EvidenceError::FetchFailed { .. } => self.fetch_failed += 1,
            EvidenceError::ParseEmpty(_) => self.parse_empty += 1,
            _ => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackMeta {
    pub campaign_id: String,
    pub level: DepthLevel,
    pub market: String,
    pub category: String,
    pub generated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_at: Option<DateTime<Utc>>,
    pub queries_run: usize,
    pub urls_attempted: usize,
    pub pages_fetched: usize,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub dropped: DropCounts,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorSection {
    #[serde(default)]
    pub facts: Vec<Fact>,
    #[serde(default)]
    pub promos: Vec<CompetitorPromo>,
}

/// Everything research knows about a campaign's market, at one depth level.
/// Treated as immutable once returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchPack {
    pub meta: PackMeta,
    #[serde(default)]
    pub brand: Vec<Fact>,
    #[serde(default)]
    pub category: Vec<Fact>,
    #[serde(default)]
    pub audience: Vec<Fact>,
    #[serde(default)]
    pub competitors: CompetitorSection,
    #[serde(default)]
    pub retailers: Vec<Fact>,
    #[serde(default)]
    pub market: Vec<Fact>,
    #[serde(default)]
    pub season: Vec<Fact>,
    pub benchmarks: ResearchBenchmarks,
}

impl ResearchPack {
    pub fn bucket_mut(&mut self, bucket: FactBucket) -> &mut Vec<Fact> {
        match bucket {
            FactBucket::Brand => &mut self.brand,
            FactBucket::Category => &mut self.category,
            FactBucket::Audience => &mut self.audience,
            FactBucket::Competitor => &mut self.competitors.facts,
            FactBucket::Retailer => &mut self.retailers,
            FactBucket::Market => &mut self.market,
            FactBucket::Season => &mut self.season,
        }
    }

    pub fn promos(&self) -> &[CompetitorPromo] {
        &self.competitors.promos
    }
}
