// src/analysis/mod.rs
//! Read-only access to persisted call analysis (sentiment, lead quality).

pub mod memory;

use chrono::{DateTime, Utc};

use crate::error::LookupError;
use crate::model::AnalysisRecord;

/// Largest id set a single lookup may carry.
pub const MAX_LOOKUP_BATCH: usize = 100;

#[async_trait::async_trait]
pub trait AnalysisStore: Send + Sync {
    /// Rows for `call_ids` owned by `owner_id` and analyzed at or after
    /// `since`. Callers keep `call_ids.len() <= MAX_LOOKUP_BATCH`.
    async fn lookup_by_call_ids(
        &self,
        owner_id: &str,
        call_ids: &[String],
        since: DateTime<Utc>,
    ) -> Result<Vec<AnalysisRecord>, LookupError>;

    fn name(&self) -> &'static str;
}
