//! Snapshot cache: an injected capability, so the engine stays correct (just
//! slower) with caching disabled and tests can swap in a fake.

use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::{future::Cache, Expiry};
use serde::{Deserialize, Serialize};

use crate::engine::AnalyticsSnapshot;

#[async_trait::async_trait]
pub trait AnalyticsCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<Arc<AnalyticsSnapshot>>;
    async fn set(&self, key: &str, value: Arc<AnalyticsSnapshot>, ttl: Duration);
}

/// Key covering everything a snapshot depends on.
pub fn cache_key(owner_id: &str, days: u32, limit: usize) -> String {
    format!("analytics:{owner_id}:{days}d:{limit}")
}

/// One TTL step: ranges up to `max_days` live for `ttl_secs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtlTier {
    pub max_days: u32,
    pub ttl_secs: u64,
}

/// Longer ranges are mostly history and churn less, so they live longer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TtlPolicy {
    /// Checked in ascending `max_days` order.
    pub tiers: Vec<TtlTier>,
    /// Used past the last tier.
    pub longest_secs: u64,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            tiers: vec![
                TtlTier { max_days: 1, ttl_secs: 60 },
                TtlTier { max_days: 7, ttl_secs: 300 },
                TtlTier { max_days: 30, ttl_secs: 900 },
            ],
            longest_secs: 3600,
        }
    }
}

impl TtlPolicy {
    pub fn ttl_for(&self, days: u32) -> Duration {
        let mut tiers = self.tiers.clone();
        tiers.sort_by_key(|t| t.max_days);
        let secs = tiers
            .iter()
            .find(|t| days <= t.max_days)
            .map(|t| t.ttl_secs)
            .unwrap_or(self.longest_secs);
        Duration::from_secs(secs)
    }
}

/// Disabled cache: every lookup misses, writes are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

#[async_trait::async_trait]
impl AnalyticsCache for NoopCache {
    async fn get(&self, _key: &str) -> Option<Arc<AnalyticsSnapshot>> {
        None
    }
    async fn set(&self, _key: &str, _value: Arc<AnalyticsSnapshot>, _ttl: Duration) {}
}

#[derive(Clone)]
struct Entry {
    ttl: Duration,
    snapshot: Arc<AnalyticsSnapshot>,
}

/// Absolute TTL chosen per insert; reads do not extend it.
struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, value: &Entry, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-process cache backed by moka.
#[derive(Clone)]
pub struct MokaAnalyticsCache {
    inner: Cache<String, Entry>,
}

impl MokaAnalyticsCache {
    pub fn new(max_capacity: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .build();
        Self { inner }
    }
}

#[async_trait::async_trait]
impl AnalyticsCache for MokaAnalyticsCache {
    async fn get(&self, key: &str) -> Option<Arc<AnalyticsSnapshot>> {
        self.inner.get(key).await.map(|e| e.snapshot)
    }

    async fn set(&self, key: &str, value: Arc<AnalyticsSnapshot>, ttl: Duration) {
        self.inner
            .insert(key.to_string(), Entry { ttl, snapshot: value })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_grows_with_range() {
        let p = TtlPolicy::default();
        assert_eq!(p.ttl_for(1), Duration::from_secs(60));
        assert_eq!(p.ttl_for(7), Duration::from_secs(300));
        assert_eq!(p.ttl_for(8), Duration::from_secs(900));
        assert_eq!(p.ttl_for(90), Duration::from_secs(3600));
    }

    #[test]
    fn key_includes_owner_range_and_limit() {
        assert_ne!(cache_key("a", 7, 10), cache_key("b", 7, 10));
        assert_ne!(cache_key("a", 7, 10), cache_key("a", 30, 10));
        assert_ne!(cache_key("a", 7, 10), cache_key("a", 7, 20));
    }

    #[tokio::test]
    async fn moka_round_trip_and_expiry() {
        let cache = MokaAnalyticsCache::new(16);
        let snap = Arc::new(AnalyticsSnapshot::empty());
        cache.set("k", snap.clone(), Duration::from_millis(50)).await;
        assert!(cache.get("k").await.is_some());

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(cache.get("k").await.is_none());
    }

    #[tokio::test]
    async fn noop_never_hits() {
        let cache = NoopCache;
        cache
            .set("k", Arc::new(AnalyticsSnapshot::empty()), Duration::from_secs(60))
            .await;
        assert!(cache.get("k").await.is_none());
    }
}
