//! # Trend Calculator
//! Splits a call set at the midpoint of the requested range and compares the
//! recent half with the older half. Partitions and classifications are
//! derived here, independently of the aggregator.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::is_successful;
use crate::model::CallRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

impl Trend {
    fn compare<T: PartialOrd>(recent: T, older: T) -> Self {
        if recent > older {
            Self::Up
        } else if recent < older {
            Self::Down
        } else {
            Self::Stable
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendSnapshot {
    pub call_volume_trend: Trend,
    pub avg_duration_trend: Trend,
    pub cost_trend: Trend,
}

impl TrendSnapshot {
    pub fn stable() -> Self {
        Self {
            call_volume_trend: Trend::Stable,
            avg_duration_trend: Trend::Stable,
            cost_trend: Trend::Stable,
        }
    }
}

impl Default for TrendSnapshot {
    fn default() -> Self {
        Self::stable()
    }
}

/// `now - floor(days / 2)` days.
pub fn midpoint(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    days_before(now, days / 2)
}

/// `now` minus `days`, saturating at the earliest representable instant.
pub fn days_before(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    now.checked_sub_signed(Duration::days(i64::from(days)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[derive(Debug, Default)]
struct Half {
    calls: usize,
    successes: u64,
    success_duration: u64,
    cost: f64,
}

impl Half {
    fn add(&mut self, call: &CallRecord) {
        self.calls += 1;
        self.cost += call.cost;
        if is_successful(call) {
            self.successes += 1;
            self.success_duration += call.duration_seconds;
        }
    }

    fn avg_duration(&self) -> f64 {
        if self.successes == 0 {
            0.0
        } else {
            self.success_duration as f64 / self.successes as f64
        }
    }
}

pub fn calculate(calls: &[CallRecord], days: u32, now: DateTime<Utc>) -> TrendSnapshot {
    if calls.is_empty() {
        return TrendSnapshot::stable();
    }

    let mid = midpoint(now, days);
    let mut recent = Half::default();
    let mut older = Half::default();

    for call in calls {
        // no timestamp: nothing places it in the recent half
        match call.timestamp() {
            Some(ts) if ts >= mid => recent.add(call),
            _ => older.add(call),
        }
    }

    TrendSnapshot {
        call_volume_trend: Trend::compare(recent.calls, older.calls),
        avg_duration_trend: Trend::compare(recent.avg_duration(), older.avg_duration()),
        cost_trend: Trend::compare(recent.cost, older.cost),
    }
}
