//! Evaluate one campaign brief and print the evaluation as JSON.
//!
//! Usage: `evaluate_brief <brief.json> [LITE|DEEP|MAX]`

use anyhow::{bail, Context, Result};
use offer_iq::config::ResearchConfig;
use offer_iq::{CampaignContext, DepthLevel, Evaluator};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_env("OFFER_IQ_LOG")
        .unwrap_or_else(|_| EnvFilter::new("research=info,cache=info,offer_iq=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        bail!("usage: evaluate_brief <brief.json> [LITE|DEEP|MAX]");
    };
    let level = match args.next() {
        Some(s) => DepthLevel::parse(&s).with_context(|| format!("unknown depth level {s:?}"))?,
        None => DepthLevel::Lite,
    };

    let raw = std::fs::read_to_string(&path).with_context(|| format!("reading brief {path}"))?;
    let campaign = CampaignContext::from_json(&raw).with_context(|| format!("parsing brief {path}"))?;
    let config = ResearchConfig::load_default()?;

    let evaluation = Evaluator::from_config(config).evaluate(&campaign, level).await;
    println!("{}", serde_json::to_string_pretty(&evaluation)?);
    Ok(())
}
