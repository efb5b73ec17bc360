// src/config/research.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use crate::research::locale::market_locale;
use crate::research::types::{DepthLevel, Locale};

pub const ENV_CONFIG_PATH: &str = "OFFER_IQ_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/research.toml";

const ENV_CONCURRENCY: &str = "OFFER_IQ_CONCURRENCY";
const ENV_CACHE_TTL: &str = "OFFER_IQ_CACHE_TTL_SECS";
const ENV_CSE_KEY: &str = "GOOGLE_CSE_KEY";
const ENV_CSE_CX: &str = "GOOGLE_CSE_CX";

/// Locale for markets the built-in table does not know.
pub const DEFAULT_GL: &str = "au";
pub const DEFAULT_HL: &str = "en";

pub const MIN_CONCURRENCY: usize = 2;
pub const MAX_CONCURRENCY: usize = 12;

/// Research pipeline knobs. Every field has a default, so a partial TOML file
/// (or none at all) is fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    /// Bounded worker pool size for search + page fetch (clamped 2..=12).
    pub concurrency: usize,
    pub fetch_timeout_ms: u64,
    /// Retries per page after the first attempt.
    pub fetch_retries: u32,
    pub search_timeout_ms: u64,
    pub results_per_query: u32,
    pub deep_url_cap: usize,
    pub max_url_cap: usize,
    /// 0 disables the research cache.
    pub cache_ttl_secs: u64,
    pub cache_dir: String,
    pub default_gl: String,
    pub default_hl: String,
    pub user_agent: String,
    pub max_body_bytes: usize,
    /// "ENV" means: read from GOOGLE_CSE_KEY / GOOGLE_CSE_CX.
    pub google_cse_key: Option<String>,
    pub google_cse_cx: Option<String>,
    pub news_rss_enabled: bool,
    pub encyclopedia_enabled: bool,
    /// Research deadline per evaluation; 0 means none.
    pub overall_budget_secs: u64,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            concurrency: 6,
            fetch_timeout_ms: 12_000,
            fetch_retries: 1,
            search_timeout_ms: 9_000,
            results_per_query: 10,
            deep_url_cap: 60,
            max_url_cap: 90,
            cache_ttl_secs: 6 * 3600,
            cache_dir: "cache/research".to_string(),
            default_gl: DEFAULT_GL.to_string(),
            default_hl: DEFAULT_HL.to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36".to_string(),
            max_body_bytes: 512 * 1024,
            google_cse_key: Some("ENV".to_string()),
            google_cse_cx: Some("ENV".to_string()),
            news_rss_enabled: true,
            encyclopedia_enabled: true,
            overall_budget_secs: 60,
        }
    }
}

impl ResearchConfig {
    /// Load from an explicit TOML path, then apply env overrides and sanitize.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading research config from {}", path.display()))?;
        let cfg: ResearchConfig = toml::from_str(&content)
            .with_context(|| format!("parsing research config {}", path.display()))?;
        Ok(cfg.finish())
    }

    /// Resolve config:
    /// 1) $OFFER_IQ_CONFIG_PATH
    /// 2) config/research.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from_file(&pb);
            }
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_p.exists() {
            return Self::load_from_file(&default_p);
        }
        Ok(Self::default().finish())
    }

    fn finish(mut self) -> Self {
        self.apply_env_overrides();
        self.sanitize();
        self
    }

    fn apply_env_overrides(&mut self) {
        if let Some(n) = env::var(ENV_CONCURRENCY).ok().and_then(|s| s.trim().parse().ok()) {
            self.concurrency = n;
        }
        if let Some(n) = env::var(ENV_CACHE_TTL).ok().and_then(|s| s.trim().parse().ok()) {
            self.cache_ttl_secs = n;
        }
        self.google_cse_key = resolve_secret(self.google_cse_key.take(), ENV_CSE_KEY);
        self.google_cse_cx = resolve_secret(self.google_cse_cx.take(), ENV_CSE_CX);
    }

    fn sanitize(&mut self) {
        self.concurrency = clamp_concurrency(self.concurrency);
        self.fetch_timeout_ms = self.fetch_timeout_ms.max(1_000);
        self.search_timeout_ms = self.search_timeout_ms.max(1_000);
        self.fetch_retries = self.fetch_retries.min(3);
        self.results_per_query = self.results_per_query.clamp(1, 10);
        self.max_body_bytes = self.max_body_bytes.max(16 * 1024);
        if self.default_gl.trim().is_empty() {
            self.default_gl = DEFAULT_GL.into();
        }
        if self.default_hl.trim().is_empty() {
            self.default_hl = DEFAULT_HL.into();
        }
    }

    /// Campaign market to locale, falling back to the configured defaults.
    pub fn locale_for(&self, market: &str) -> Locale {
        market_locale(market, &self.default_gl, &self.default_hl)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_millis(self.search_timeout_ms)
    }

    /// How many page URLs a research run may attempt at `level`.
    pub fn url_cap(&self, level: DepthLevel) -> usize {
        match level {
            DepthLevel::Lite => 0,
            DepthLevel::Deep => self.deep_url_cap,
            DepthLevel::Max => self.max_url_cap,
        }
    }
}

pub fn clamp_concurrency(n: usize) -> usize {
    n.clamp(MIN_CONCURRENCY, MAX_CONCURRENCY)
}

fn resolve_secret(v: Option<String>, env_name: &str) -> Option<String> {
    let v = v?;
    let v = if v.trim().eq_ignore_ascii_case("env") {
        env::var(env_name).ok()?
    } else {
        v
    };
    let t = v.trim();
    (!t.is_empty()).then(|| t.to_string())
}
