//! # Analysis Enricher
//! Pulls persisted sentiment / lead quality for a call batch and merges it
//! into fresh copies of the records. Lookups go out in chunks no larger than
//! the store's batch ceiling; a failing chunk is logged and skipped.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use metrics::counter;

use crate::analysis::{AnalysisStore, MAX_LOOKUP_BATCH};
use crate::model::{AnalysisRecord, CallRecord};

#[derive(Debug, Clone, Copy)]
pub struct EnrichOptions {
    /// Ids per lookup; clamped to `1..=MAX_LOOKUP_BATCH`.
    pub batch_size: usize,
    /// Lookups in flight at once.
    pub concurrency: usize,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            batch_size: MAX_LOOKUP_BATCH,
            concurrency: 4,
        }
    }
}

/// Output of one enrichment pass.
#[derive(Debug, Clone)]
pub struct Enrichment {
    pub calls: Vec<CallRecord>,
    /// Rows returned by the store. `None` when there is no store or every
    /// chunk failed, i.e. nothing was measured.
    pub rows: Option<Vec<AnalysisRecord>>,
    pub chunks: usize,
    pub failed_chunks: usize,
}

/// Split ids into lookup-sized chunks.
pub fn chunk_ids(ids: &[String], batch_size: usize) -> Vec<&[String]> {
    ids.chunks(batch_size.clamp(1, MAX_LOOKUP_BATCH)).collect()
}

/// One row per call: the most recently analyzed wins.
pub fn latest_by_call(rows: &[AnalysisRecord]) -> HashMap<&str, &AnalysisRecord> {
    let mut out: HashMap<&str, &AnalysisRecord> = HashMap::with_capacity(rows.len());
    for r in rows {
        out.entry(r.call_id.as_str())
            .and_modify(|cur| {
                if r.analyzed_at > cur.analyzed_at {
                    *cur = r;
                }
            })
            .or_insert(r);
    }
    out
}

/// Enrich `calls` from `store`. Input records are left untouched.
pub async fn enrich(
    calls: &[CallRecord],
    owner_id: &str,
    since: DateTime<Utc>,
    store: Option<&dyn AnalysisStore>,
    opts: EnrichOptions,
) -> Enrichment {
    let Some(store) = store else {
        return Enrichment {
            calls: calls.to_vec(),
            rows: None,
            chunks: 0,
            failed_chunks: 0,
        };
    };

    let ids = calls.iter().map(|c| c.id.clone()).collect::<Vec<_>>();
    let chunks = chunk_ids(&ids, opts.batch_size);
    let chunk_count = chunks.len();

    // owned chunks, so the stream closure takes no borrowed argument
    let owned = chunks.into_iter().map(<[String]>::to_vec).enumerate();
    let results = stream::iter(owned)
        .map(|(idx, chunk)| async move {
            let res = store.lookup_by_call_ids(owner_id, &chunk, since).await;
            (idx, chunk.len(), res)
        })
        .buffer_unordered(opts.concurrency.max(1))
        .collect::<Vec<_>>()
        .await;

    let mut rows = Vec::new();
    let mut failed_chunks = 0usize;
    for (idx, size, res) in results {
        match res {
            Ok(mut found) => rows.append(&mut found),
            Err(e) => {
                failed_chunks += 1;
                counter!("analytics_lookup_chunk_failures_total").increment(1);
                tracing::warn!(
                    error = %e,
                    store = store.name(),
                    chunk = idx,
                    size,
                    "analysis lookup chunk failed; skipping"
                );
            }
        }
    }

    let enriched = merge(calls, &rows);
    let rows = if chunk_count > 0 && failed_chunks == chunk_count {
        None
    } else {
        Some(rows)
    };

    tracing::debug!(
        calls = calls.len(),
        chunks = chunk_count,
        failed_chunks,
        "analysis enrichment done"
    );

    Enrichment {
        calls: enriched,
        rows,
        chunks: chunk_count,
        failed_chunks,
    }
}

/// Persisted value first, then the provider's, per field.
fn merge(calls: &[CallRecord], rows: &[AnalysisRecord]) -> Vec<CallRecord> {
    let latest = latest_by_call(rows);
    calls
        .iter()
        .map(|c| {
            let mut out = c.clone();
            if let Some(r) = latest.get(c.id.as_str()) {
                out.analysis.sentiment = r.sentiment.or(c.analysis.sentiment);
                out.analysis.lead_quality = r.lead_quality.or(c.analysis.lead_quality);
            }
            out
        })
        .collect()
}
