// src/analysis/memory.rs
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::analysis::{AnalysisStore, MAX_LOOKUP_BATCH};
use crate::error::LookupError;
use crate::model::AnalysisRecord;

/// Snapshot of analysis rows held in memory, e.g. loaded from an export.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAnalysisStore {
    rows: Vec<AnalysisRecord>,
}

impl InMemoryAnalysisStore {
    pub fn new(rows: Vec<AnalysisRecord>) -> Self {
        Self { rows }
    }

    /// Load a JSON array of analysis rows.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading analysis rows from {}", path.display()))?;
        let rows: Vec<AnalysisRecord> = serde_json::from_str(&content)
            .with_context(|| format!("parsing analysis rows in {}", path.display()))?;
        tracing::info!(rows = rows.len(), path = %path.display(), "analysis store loaded");
        Ok(Self::new(rows))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait::async_trait]
impl AnalysisStore for InMemoryAnalysisStore {
    async fn lookup_by_call_ids(
        &self,
        owner_id: &str,
        call_ids: &[String],
        since: DateTime<Utc>,
    ) -> Result<Vec<AnalysisRecord>, LookupError> {
        if call_ids.len() > MAX_LOOKUP_BATCH {
            return Err(LookupError::BatchTooLarge {
                size: call_ids.len(),
                max: MAX_LOOKUP_BATCH,
            });
        }
        let wanted: HashSet<&str> = call_ids.iter().map(String::as_str).collect();
        Ok(self
            .rows
            .iter()
            .filter(|r| {
                r.owner_id == owner_id && r.analyzed_at >= since && wanted.contains(r.call_id.as_str())
            })
            .cloned()
            .collect())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
