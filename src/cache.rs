//! # Research Cache
//!
//! Versioned, TTL-bounded persistence of whole research packs per
//! (campaign, depth level). One envelope per campaign holds every level:
//!
//! ```json
//! {"version": 1, "values": {"DEEP": {"cachedAt": "...", "pack": {...}}}}
//! ```
//!
//! Cache trouble is never an evaluation failure: store errors are logged as
//! `CacheUnavailable` and behave like a miss (on read) or a no-op (on write).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::EvidenceError;
use crate::metrics as m;
use crate::research::types::{DepthLevel, ResearchPack};

/// Bump when the pack layout changes; older envelopes then read as misses.
pub const CACHE_VERSION: u32 = 1;

/// Short stable hash for log lines (campaign ids are never logged raw).
pub(crate) fn anon_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Key-value persistence scoped to one campaign record. Reads and writes are
/// atomic per key.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn load(&self, campaign_id: &str) -> Result<Option<String>, EvidenceError>;
    async fn store(&self, campaign_id: &str, blob: &str) -> Result<(), EvidenceError>;
}

/// One JSON file per campaign, named by the SHA-256 of the id.
pub struct FileCacheStore {
    dir: PathBuf,
}

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

impl FileCacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, campaign_id: &str) -> PathBuf {
        let key = hex(&Sha256::digest(campaign_id.as_bytes()));
        self.dir.join(format!("{key}.json"))
    }
}

fn hex(bytes: &[u8]) -> String {
    use std::fmt::Write as _;
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(&mut s, "{:02x}", b);
    }
    s
}

fn unavailable(what: &str, e: impl std::fmt::Display) -> EvidenceError {
    EvidenceError::CacheUnavailable(format!("{what}: {e}"))
}

#[async_trait]
impl CacheStore for FileCacheStore {
    async fn load(&self, campaign_id: &str) -> Result<Option<String>, EvidenceError> {
        match tokio::fs::read_to_string(self.path_for(campaign_id)).await {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(unavailable("read", e)),
        }
    }

    async fn store(&self, campaign_id: &str, blob: &str) -> Result<(), EvidenceError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| unavailable("create dir", e))?;
        let path = self.path_for(campaign_id);
        let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp = path.with_extension(format!("json.{}.{seq}.tmp", std::process::id()));
        tokio::fs::write(&tmp, blob.as_bytes())
            .await
            .map_err(|e| unavailable("write tmp", e))?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(unavailable("rename", e));
        }
        Ok(())
    }
}

/// In-process store, handy for tests and single-run evaluations.
#[derive(Default)]
pub struct MemoryCacheStore {
    inner: Mutex<HashMap<String, String>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn load(&self, campaign_id: &str) -> Result<Option<String>, EvidenceError> {
        let g = self
            .inner
            .lock()
            .map_err(|_| unavailable("memory", "poisoned lock"))?;
        Ok(g.get(campaign_id).cloned())
    }

    async fn store(&self, campaign_id: &str, blob: &str) -> Result<(), EvidenceError> {
        let mut g = self
            .inner
            .lock()
            .map_err(|_| unavailable("memory", "poisoned lock"))?;
        g.insert(campaign_id.to_string(), blob.to_string());
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub cached_at: DateTime<Utc>,
    pub pack: ResearchPack,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEnvelope {
    pub version: u32,
    /// Keyed by depth level name (`LITE`, `DEEP`, `MAX`).
    #[serde(default)]
    pub values: BTreeMap<String, CacheEntry>,
}

impl Default for CacheEnvelope {
    fn default() -> Self {
        Self {
            version: CACHE_VERSION,
            values: BTreeMap::new(),
        }
    }
}

/// TTL policy over a [`CacheStore`].
#[derive(Clone)]
pub struct ResearchCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl ResearchCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    fn bypass(&self, level: DepthLevel) -> bool {
        level == DepthLevel::Max || self.ttl.is_zero()
    }

    async fn load_envelope(&self, campaign_id: &str) -> Option<CacheEnvelope> {
        let blob = match self.store.load(campaign_id).await {
            Ok(Some(b)) => b,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(target: "cache", id = %anon_hash(campaign_id), kind = e.kind(), error = %e, "cache read failed");
                return None;
            }
        };
        match serde_json::from_str::<CacheEnvelope>(&blob) {
            Ok(env) if env.version == CACHE_VERSION => Some(env),
            Ok(env) => {
                tracing::debug!(target: "cache", id = %anon_hash(campaign_id), version = env.version, "cache version mismatch");
                None
            }
            Err(e) => {
                tracing::warn!(target: "cache", id = %anon_hash(campaign_id), error = %e, "cache envelope unreadable");
                None
            }
        }
    }

    pub async fn get(&self, campaign_id: &str, level: DepthLevel) -> Option<ResearchPack> {
        self.get_at(campaign_id, level, Utc::now()).await
    }

    /// Cached pack if present and fresh at `now`, with `meta.cachedAt` set.
    pub async fn get_at(
        &self,
        campaign_id: &str,
        level: DepthLevel,
        now: DateTime<Utc>,
    ) -> Option<ResearchPack> {
        m::ensure_metrics_described();
        let hit = self.lookup(campaign_id, level, now).await;
        if hit.is_some() {
            counter!(m::CACHE_HITS_TOTAL).increment(1);
        } else {
            counter!(m::CACHE_MISSES_TOTAL).increment(1);
        }
        tracing::debug!(target: "cache", id = %anon_hash(campaign_id), level = level.as_str(), hit = hit.is_some(), "cache lookup");
        hit
    }

    async fn lookup(
        &self,
        campaign_id: &str,
        level: DepthLevel,
        now: DateTime<Utc>,
    ) -> Option<ResearchPack> {
        if self.bypass(level) {
            return None;
        }
        let mut env = self.load_envelope(campaign_id).await?;
        let entry = env.values.remove(level.as_str())?;
        let age = now.signed_duration_since(entry.cached_at);
        let ttl = chrono::Duration::from_std(self.ttl).ok()?;
        if age > ttl {
            return None;
        }
        let mut pack = entry.pack;
        pack.meta.cached_at = Some(entry.cached_at);
        Some(pack)
    }

    pub async fn put(&self, campaign_id: &str, level: DepthLevel, pack: &ResearchPack) {
        self.put_at(campaign_id, level, pack, Utc::now()).await
    }

    /// Merge `pack` into the campaign's envelope under `level`, stamped `now`.
    /// Other levels are kept. MAX (and a zero TTL) never writes.
    pub async fn put_at(
        &self,
        campaign_id: &str,
        level: DepthLevel,
        pack: &ResearchPack,
        now: DateTime<Utc>,
    ) {
        if self.bypass(level) {
            return;
        }
        let mut env = self.load_envelope(campaign_id).await.unwrap_or_default();
        let mut pack = pack.clone();
        pack.meta.cached_at = None;
        env.values.insert(
            level.as_str().to_string(),
            CacheEntry {
                cached_at: now,
                pack,
            },
        );
        let blob = match serde_json::to_string(&env) {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(target: "cache", id = %anon_hash(campaign_id), error = %e, "cache envelope not serializable");
                return;
            }
        };
        if let Err(e) = self.store.store(campaign_id, &blob).await {
            tracing::warn!(target: "cache", id = %anon_hash(campaign_id), kind = e.kind(), error = %e, "cache write failed");
        }
    }
}
