//! # Analytics Assembler
//! fetch -> normalize -> tenant/date filter -> enrich -> aggregate + trends
//! -> compose, with the injected cache in front.
//!
//! A failed provider fetch fails the whole computation; nothing partial is
//! returned. A tenant that cannot be resolved gets an empty snapshot, never
//! unscoped data.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::aggregate::{self, AggregateOptions, AnalysisScope, MetricsSnapshot};
use crate::analysis::AnalysisStore;
use crate::cache::{cache_key, AnalyticsCache, NoopCache, TtlPolicy};
use crate::config::AppConfig;
use crate::enrich::{self, EnrichOptions};
use crate::error::{AnalyticsError, ProviderError};
use crate::model::CallRecord;
use crate::normalize::normalize_all;
use crate::provider::CallProvider;
use crate::tenant::TenantResolver;
use crate::trends::{self, TrendSnapshot};

/// What the dashboard gets back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSnapshot {
    pub metrics: MetricsSnapshot,
    /// Newest first, at most `limit` entries.
    pub recent_calls: Vec<CallRecord>,
    pub trends: TrendSnapshot,
}

impl AnalyticsSnapshot {
    pub fn empty() -> Self {
        Self {
            metrics: MetricsSnapshot::empty(),
            recent_calls: Vec::new(),
            trends: TrendSnapshot::stable(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Calls requested from the provider per computation.
    pub fetch_limit: usize,
    pub fetch_timeout: Duration,
    pub max_days: u32,
    pub enrich: EnrichOptions,
    pub aggregate: AggregateOptions,
    pub ttl: TtlPolicy,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl EngineSettings {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            fetch_limit: cfg.provider.fetch_limit,
            fetch_timeout: cfg.provider.timeout(),
            max_days: cfg.analytics.max_days,
            enrich: EnrichOptions {
                batch_size: cfg.analytics.lookup_batch_size,
                concurrency: cfg.analytics.lookup_concurrency,
            },
            aggregate: AggregateOptions {
                utc_offset: cfg.analytics.utc_offset(),
                estimate_when_unavailable: cfg.analytics.estimate_when_unavailable,
            },
            ttl: cfg.cache.ttl.clone(),
        }
    }
}

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("analytics_requests_total", "Analytics computations requested.");
        describe_counter!("analytics_cache_hits_total", "Snapshots served from cache.");
        describe_counter!("analytics_cache_misses_total", "Snapshots computed fresh.");
        describe_counter!(
            "analytics_provider_errors_total",
            "Provider fetch failures (including timeouts)."
        );
        describe_counter!(
            "analytics_lookup_chunk_failures_total",
            "Analysis lookup chunks that failed and were skipped."
        );
        describe_histogram!("analytics_compute_ms", "Fresh computation time in milliseconds.");
        describe_gauge!("analytics_cache_ttl_secs", "TTL applied to the last cached snapshot.");
    });
}

pub struct AnalyticsEngine {
    provider: Arc<dyn CallProvider>,
    tenants: Arc<dyn TenantResolver>,
    store: Option<Arc<dyn AnalysisStore>>,
    cache: Arc<dyn AnalyticsCache>,
    settings: EngineSettings,
}

impl AnalyticsEngine {
    /// Engine without an analysis store and with caching disabled.
    pub fn new(
        provider: Arc<dyn CallProvider>,
        tenants: Arc<dyn TenantResolver>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            provider,
            tenants,
            store: None,
            cache: Arc::new(NoopCache),
            settings,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn AnalysisStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn AnalyticsCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Resolve the user's tenant, then compute. Unknown tenant -> empty snapshot.
    pub async fn compute_for_user(
        &self,
        user_id: &str,
        days: u32,
        limit: usize,
    ) -> Result<Arc<AnalyticsSnapshot>, AnalyticsError> {
        match self.tenants.owner_id_for_user(user_id).await {
            Ok(owner_id) => self.compute_analytics(&owner_id, days, limit).await,
            Err(e) => {
                tracing::warn!(error = %e, user_id, "tenant resolution failed; returning empty analytics");
                Ok(Arc::new(AnalyticsSnapshot::empty()))
            }
        }
    }

    /// Cached entry point. `days` is clamped to `1..=max_days`.
    pub async fn compute_analytics(
        &self,
        owner_id: &str,
        days: u32,
        limit: usize,
    ) -> Result<Arc<AnalyticsSnapshot>, AnalyticsError> {
        ensure_metrics_described();
        counter!("analytics_requests_total").increment(1);

        if owner_id.trim().is_empty() {
            tracing::warn!("blank owner id; returning empty analytics");
            return Ok(Arc::new(AnalyticsSnapshot::empty()));
        }

        let days = days.clamp(1, self.settings.max_days.max(1));
        let key = cache_key(owner_id, days, limit);
        if let Some(hit) = self.cache.get(&key).await {
            counter!("analytics_cache_hits_total").increment(1);
            tracing::debug!(owner_id, days, limit, "analytics cache hit");
            return Ok(hit);
        }
        counter!("analytics_cache_misses_total").increment(1);

        let started = Instant::now();
        let snapshot = Arc::new(self.compute_at(owner_id, days, limit, Utc::now()).await?);
        histogram!("analytics_compute_ms").record(started.elapsed().as_secs_f64() * 1000.0);

        let ttl = self.settings.ttl.ttl_for(days);
        gauge!("analytics_cache_ttl_secs").set(ttl.as_secs_f64());
        self.cache.set(&key, snapshot.clone(), ttl).await;

        Ok(snapshot)
    }

    /// Uncached computation pinned to `now`.
    pub async fn compute_at(
        &self,
        owner_id: &str,
        days: u32,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<AnalyticsSnapshot, AnalyticsError> {
        let raw = self.fetch().await?;
        let fetched = raw.len();

        let since = trends::days_before(now, days);
        let scoped = scope_calls(normalize_all(&raw), owner_id, since);

        let enrichment = enrich::enrich(
            &scoped,
            owner_id,
            since,
            self.store.as_deref(),
            self.settings.enrich,
        )
        .await;

        let metrics = aggregate::aggregate(
            &enrichment.calls,
            AnalysisScope {
                owner_id,
                since,
                rows: enrichment.rows.as_deref(),
            },
            self.settings.aggregate,
        );
        let trends = trends::calculate(&enrichment.calls, days, now);
        let recent_calls = recent_calls(enrichment.calls, limit);

        tracing::info!(
            owner_id,
            days,
            fetched,
            in_scope = metrics.total_calls,
            answered = metrics.answered_calls,
            failed_lookups = enrichment.failed_chunks,
            "analytics computed"
        );

        Ok(AnalyticsSnapshot {
            metrics,
            recent_calls,
            trends,
        })
    }

    async fn fetch(&self) -> Result<Vec<serde_json::Value>, AnalyticsError> {
        let timeout = self.settings.fetch_timeout;
        let res = tokio::time::timeout(
            timeout,
            self.provider.list_calls(self.settings.fetch_limit, timeout),
        )
        .await
        .unwrap_or(Err(ProviderError::Timeout(timeout)));

        res.map_err(|e| {
            counter!("analytics_provider_errors_total").increment(1);
            tracing::warn!(error = %e, provider = self.provider.name(), "provider fetch failed");
            AnalyticsError::ProviderUnavailable(e)
        })
    }
}

/// Keep only this tenant's calls inside the window. Calls without any
/// timestamp cannot be placed in the window and are dropped.
pub fn scope_calls(calls: Vec<CallRecord>, owner_id: &str, since: DateTime<Utc>) -> Vec<CallRecord> {
    let before = calls.len();
    let kept = calls
        .into_iter()
        .filter(|c| c.owner_id == owner_id)
        .filter(|c| c.timestamp().is_some_and(|ts| ts >= since))
        .collect::<Vec<_>>();
    tracing::debug!(before, kept = kept.len(), owner_id, "calls scoped");
    kept
}

/// Newest first by `createdAt` (stable; undated calls last), then truncated.
pub fn recent_calls(mut calls: Vec<CallRecord>, limit: usize) -> Vec<CallRecord> {
    calls.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    calls.truncate(limit);
    calls
}
