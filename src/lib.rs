// src/lib.rs
// Public library surface for the demo binary and integration tests.

pub mod benchmarks;
pub mod cache;
pub mod campaign;
pub mod category;
pub mod config;
pub mod error;
pub mod extract;
pub mod metrics;
pub mod offer_iq;
pub mod pipeline;
pub mod research;
pub mod scoreboard;

// ---- Re-exports for stable public API ----
pub use crate::campaign::CampaignContext;
pub use crate::category::{classify, classify_campaign, Category, CategoryProfile};
pub use crate::error::EvidenceError;
pub use crate::offer_iq::{score_offer, OfferIq, Verdict};
pub use crate::pipeline::{Evaluation, Evaluator};
pub use crate::research::types::{DepthLevel, ResearchPack};
pub use crate::scoreboard::{build_scoreboard, Scoreboard};
