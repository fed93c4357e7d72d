// tests/common/mod.rs
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use call_analytics::analysis::AnalysisStore;
use call_analytics::error::{LookupError, ProviderError};
use call_analytics::model::AnalysisRecord;
use call_analytics::provider::CallProvider;
use call_analytics::tenant::StaticTenantResolver;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde_json::{json, Value};

/// Serves a fixed payload and counts fetches.
pub struct StaticProvider {
    pub calls: Vec<Value>,
    pub fetches: AtomicUsize,
}

impl StaticProvider {
    pub fn new(calls: Vec<Value>) -> Arc<Self> {
        Arc::new(Self {
            calls,
            fetches: AtomicUsize::new(0),
        })
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CallProvider for StaticProvider {
    async fn list_calls(&self, limit: usize, _timeout: Duration) -> Result<Vec<Value>, ProviderError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.calls.iter().take(limit).cloned().collect())
    }
    fn name(&self) -> &'static str {
        "static"
    }
}

pub struct FailingProvider;

#[async_trait]
impl CallProvider for FailingProvider {
    async fn list_calls(&self, _limit: usize, _timeout: Duration) -> Result<Vec<Value>, ProviderError> {
        Err(ProviderError::Status { status: 503 })
    }
    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Ignores its timeout argument and hangs.
pub struct HangingProvider;

#[async_trait]
impl CallProvider for HangingProvider {
    async fn list_calls(&self, _limit: usize, _timeout: Duration) -> Result<Vec<Value>, ProviderError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Vec::new())
    }
    fn name(&self) -> &'static str {
        "hanging"
    }
}

pub struct RowsStore {
    pub rows: Vec<AnalysisRecord>,
    pub fail: bool,
}

#[async_trait]
impl AnalysisStore for RowsStore {
    async fn lookup_by_call_ids(
        &self,
        owner_id: &str,
        call_ids: &[String],
        since: DateTime<Utc>,
    ) -> Result<Vec<AnalysisRecord>, LookupError> {
        if self.fail {
            return Err(LookupError::Backend("connection reset".into()));
        }
        Ok(self
            .rows
            .iter()
            .filter(|r| r.owner_id == owner_id && r.analyzed_at >= since && call_ids.contains(&r.call_id))
            .cloned()
            .collect())
    }
    fn name(&self) -> &'static str {
        "rows"
    }
}

pub fn tenants() -> Arc<StaticTenantResolver> {
    Arc::new(StaticTenantResolver::new(HashMap::from([
        ("user-a".to_string(), "asst-a".to_string()),
        ("user-b".to_string(), "asst-b".to_string()),
    ])))
}

pub fn minutes_ago(m: i64) -> String {
    (Utc::now() - ChronoDuration::minutes(m)).to_rfc3339()
}

/// Raw provider call created `mins_ago`, lasting `secs`, with an explicit reason.
pub fn raw_call(id: &str, owner: &str, mins_ago: i64, secs: i64, reason: &str, cost: f64) -> Value {
    let started = Utc::now() - ChronoDuration::minutes(mins_ago);
    json!({
        "id": id,
        "assistantId": owner,
        "createdAt": started.to_rfc3339(),
        "startedAt": started.to_rfc3339(),
        "endedAt": (started + ChronoDuration::seconds(secs)).to_rfc3339(),
        "status": "ended",
        "endedReason": reason,
        "cost": cost,
        "customer": { "number": "+15550100" }
    })
}
