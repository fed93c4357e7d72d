//! # Outcome Classifier
//! Pure, testable logic that maps a [`CallRecord`] to success/failure.
//!
//! Policy: an ordered cascade of tiers. Each tier either decides or passes;
//! the first decisive tier wins and later tiers are never consulted.
//!   1. upstream AI success evaluation
//!   2. provider ended reason
//!   3. provider status
//!   4. duration fallback (always decisive)
//!
//! Order and the membership sets below feed every downstream metric.
//! Changing them is a behaviour change, not a refactor.

use serde::Serialize;

use crate::model::{CallRecord, SuccessEvaluation};

/// Score at or above which a numeric (1-10) success evaluation counts as success.
pub const SCORE_SUCCESS_THRESHOLD: f64 = 7.0;
/// Minimum airtime for the duration fallback to call it a success.
pub const MIN_SUCCESS_DURATION_SECS: u64 = 5;

const EVAL_SUCCESS: &[&str] = &["true", "pass", "successful"];
const EVAL_FAILURE: &[&str] = &["false", "fail", "failed"];

const REASON_FAILURE: &[&str] = &[
    "silence-timed-out",
    "silence timed out",
    "assistant-error",
    "no-answer",
    "customer-did-not-give-microphone-permission",
];
const REASON_SUCCESS: &[&str] = &["customer-ended-call", "assistant-ended-call"];

const STATUS_FAILURE: &[&str] = &["failed", "busy", "no-answer", "cancelled", "timeout"];
// "ended" is deliberately absent: it only says the call is over.
const STATUS_SUCCESS: &[&str] = &["completed", "answered"];

/// Cascade stage that produced the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    SuccessEvaluation,
    EndedReason,
    Status,
    Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClassificationResult {
    pub success: bool,
    pub tier: Tier,
}

type TierFn = fn(&CallRecord) -> Option<bool>;

/// The cascade, in evaluation order.
const CASCADE: [(Tier, TierFn); 3] = [
    (Tier::SuccessEvaluation, by_success_evaluation),
    (Tier::EndedReason, by_ended_reason),
    (Tier::Status, by_status),
];

/// Classify one call.
pub fn classify(call: &CallRecord) -> ClassificationResult {
    for (tier, decide) in CASCADE {
        if let Some(success) = decide(call) {
            return ClassificationResult { success, tier };
        }
    }
    ClassificationResult {
        success: by_duration(call),
        tier: Tier::Duration,
    }
}

/// Shorthand for callers that only need the verdict.
#[inline]
pub fn is_successful(call: &CallRecord) -> bool {
    classify(call).success
}

/// Tier 1. Unknown words are inconclusive; numbers always decide.
pub fn by_success_evaluation(call: &CallRecord) -> Option<bool> {
    match call.analysis.success_evaluation.as_ref()? {
        SuccessEvaluation::Bool(b) => Some(*b),
        SuccessEvaluation::Score(n) => Some(*n >= SCORE_SUCCESS_THRESHOLD),
        SuccessEvaluation::Text(s) => lookup(s, EVAL_SUCCESS, EVAL_FAILURE),
    }
}

/// Tier 2.
pub fn by_ended_reason(call: &CallRecord) -> Option<bool> {
    lookup(call.ended_reason.as_deref()?, REASON_SUCCESS, REASON_FAILURE)
}

/// Tier 3.
pub fn by_status(call: &CallRecord) -> Option<bool> {
    lookup(call.status.as_deref()?, STATUS_SUCCESS, STATUS_FAILURE)
}

/// Tier 4.
pub fn by_duration(call: &CallRecord) -> bool {
    call.duration_seconds >= MIN_SUCCESS_DURATION_SECS
}

fn lookup(value: &str, success: &[&str], failure: &[&str]) -> Option<bool> {
    let v = value.to_ascii_lowercase();
    if failure.contains(&v.as_str()) {
        Some(false)
    } else if success.contains(&v.as_str()) {
        Some(true)
    } else {
        None
    }
}
