//! # Metrics Aggregator
//! Counts, duration/cost statistics and distributions over a call set that
//! the caller has already scoped to one tenant and date window.
//!
//! - avg duration only averages *successful* calls: a short failed call must
//!   not drag the figure down.
//! - cost figures cover every call; cost accrues whatever the outcome.
//! - sentiment / lead quality come from persisted analysis when it could be
//!   read, otherwise from fixed ratios of answered calls (floored, no
//!   reconciliation, so parts may under-sum the total).

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Datelike, FixedOffset, Offset, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::{classify, Tier};
use crate::enrich::latest_by_call;
use crate::model::{AnalysisRecord, CallRecord, LeadQuality, Sentiment};

/// Sunday-first, matching `calls_by_day` indices.
pub const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// Fallback ratios in percent of answered calls.
pub const SENTIMENT_FALLBACK_PCT: (u64, u64, u64) = (60, 30, 10);
pub const LEAD_QUALITY_FALLBACK_PCT: (u64, u64, u64) = (20, 50, 30);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentCounts {
    pub positive: u64,
    pub neutral: u64,
    pub negative: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadQualityCounts {
    pub hot: u64,
    pub warm: u64,
    pub cold: u64,
}

/// Where a distribution came from. Keeps "measured" apart from "guessed".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Distribution<C> {
    RealData { counts: C },
    EstimatedFallback { counts: C },
    Unavailable,
}

impl<C> Distribution<C> {
    pub fn counts(&self) -> Option<&C> {
        match self {
            Self::RealData { counts } | Self::EstimatedFallback { counts } => Some(counts),
            Self::Unavailable => None,
        }
    }

    pub fn is_real(&self) -> bool {
        matches!(self, Self::RealData { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub total_calls: u64,
    pub answered_calls: u64,
    pub missed_calls: u64,
    pub avg_duration: f64,
    pub total_cost: f64,
    pub avg_cost: f64,
    pub calls_by_hour: [u64; 24],
    /// Sunday first, see [`DAY_NAMES`].
    pub calls_by_day: [u64; 7],
    pub sentiment_distribution: Distribution<SentimentCounts>,
    pub lead_quality_distribution: Distribution<LeadQualityCounts>,
}

impl MetricsSnapshot {
    /// Snapshot of nothing; used when the tenant cannot be resolved.
    pub fn empty() -> Self {
        Self {
            total_calls: 0,
            answered_calls: 0,
            missed_calls: 0,
            avg_duration: 0.0,
            total_cost: 0.0,
            avg_cost: 0.0,
            calls_by_hour: [0; 24],
            calls_by_day: [0; 7],
            sentiment_distribution: Distribution::Unavailable,
            lead_quality_distribution: Distribution::Unavailable,
        }
    }

    /// `(day name, count)` pairs in Sunday-first order.
    pub fn calls_by_day_named(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ {
        DAY_NAMES.iter().copied().zip(self.calls_by_day.iter().copied())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AggregateOptions {
    /// Offset used to read the local hour/weekday of a call.
    pub utc_offset: FixedOffset,
    /// Estimate distributions from ratios when no analysis rows are available.
    pub estimate_when_unavailable: bool,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            utc_offset: Utc.fix(),
            estimate_when_unavailable: true,
        }
    }
}

/// Which persisted rows may be counted.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisScope<'a> {
    pub owner_id: &'a str,
    /// Start of the requested day range; older analyses are ignored.
    pub since: DateTime<Utc>,
    /// `None` when the analysis store could not be read at all.
    pub rows: Option<&'a [AnalysisRecord]>,
}

pub fn aggregate(
    calls: &[CallRecord],
    scope: AnalysisScope<'_>,
    opts: AggregateOptions,
) -> MetricsSnapshot {
    let total_calls = calls.len() as u64;
    let mut answered_calls = 0u64;
    let mut success_duration = 0u64;
    let mut total_cost = 0.0f64;
    let mut calls_by_hour = [0u64; 24];
    let mut calls_by_day = [0u64; 7];
    let mut tiers: HashMap<Tier, usize> = HashMap::new();

    for call in calls {
        let verdict = classify(call);
        *tiers.entry(verdict.tier).or_default() += 1;
        if verdict.success {
            answered_calls += 1;
            success_duration += call.duration_seconds;
        }
        total_cost += call.cost;

        if let Some(ts) = call.timestamp() {
            let local = ts.with_timezone(&opts.utc_offset);
            calls_by_hour[local.hour() as usize] += 1;
            calls_by_day[local.weekday().num_days_from_sunday() as usize] += 1;
        }
    }

    tracing::debug!(total_calls, answered_calls, ?tiers, "calls classified");

    let avg_duration = if answered_calls > 0 {
        success_duration as f64 / answered_calls as f64
    } else {
        0.0
    };
    let avg_cost = if total_calls > 0 {
        total_cost / total_calls as f64
    } else {
        0.0
    };

    let (sentiment_distribution, lead_quality_distribution) = match scope.rows {
        Some(rows) => {
            let (s, l) = count_real(calls, rows, &scope);
            (
                Distribution::RealData { counts: s },
                Distribution::RealData { counts: l },
            )
        }
        None if opts.estimate_when_unavailable => (
            Distribution::EstimatedFallback {
                counts: estimate_sentiment(answered_calls),
            },
            Distribution::EstimatedFallback {
                counts: estimate_lead_quality(answered_calls),
            },
        ),
        None => (Distribution::Unavailable, Distribution::Unavailable),
    };

    MetricsSnapshot {
        total_calls,
        answered_calls,
        missed_calls: total_calls - answered_calls,
        avg_duration,
        total_cost,
        avg_cost,
        calls_by_hour,
        calls_by_day,
        sentiment_distribution,
        lead_quality_distribution,
    }
}

/// Count rows of this tenant, inside the window, for calls still in view.
fn count_real(
    calls: &[CallRecord],
    rows: &[AnalysisRecord],
    scope: &AnalysisScope<'_>,
) -> (SentimentCounts, LeadQualityCounts) {
    let visible: HashSet<&str> = calls.iter().map(|c| c.id.as_str()).collect();
    let mut s = SentimentCounts::default();
    let mut l = LeadQualityCounts::default();

    for (call_id, row) in latest_by_call(rows) {
        if row.owner_id != scope.owner_id
            || row.analyzed_at < scope.since
            || !visible.contains(call_id)
        {
            continue;
        }
        match row.sentiment {
            Some(Sentiment::Positive) => s.positive += 1,
            Some(Sentiment::Neutral) => s.neutral += 1,
            Some(Sentiment::Negative) => s.negative += 1,
            None => {}
        }
        match row.lead_quality {
            Some(LeadQuality::Hot) => l.hot += 1,
            Some(LeadQuality::Warm) => l.warm += 1,
            Some(LeadQuality::Cold) => l.cold += 1,
            None => {}
        }
    }
    (s, l)
}

pub fn estimate_sentiment(answered: u64) -> SentimentCounts {
    let (p, n, g) = SENTIMENT_FALLBACK_PCT;
    SentimentCounts {
        positive: answered * p / 100,
        neutral: answered * n / 100,
        negative: answered * g / 100,
    }
}

pub fn estimate_lead_quality(answered: u64) -> LeadQualityCounts {
    let (h, w, c) = LEAD_QUALITY_FALLBACK_PCT;
    LeadQualityCounts {
        hot: answered * h / 100,
        warm: answered * w / 100,
        cold: answered * c / 100,
    }
}
