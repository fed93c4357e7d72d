//! # Record Normalizer
//! Maps one raw provider call object (loosely typed JSON) onto a
//! [`CallRecord`]. Total: missing or malformed fields become safe defaults,
//! nothing here returns an error.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::model::{CallAnalysis, CallRecord, LeadQuality, Sentiment, SuccessEvaluation};

/// Ended reason assumed when the provider omits one and the call had airtime.
pub const DEFAULT_ENDED_REASON_CONNECTED: &str = "customer-ended-call";
/// Ended reason assumed when the provider omits one and the call had none.
pub const DEFAULT_ENDED_REASON_UNANSWERED: &str = "no-answer";

/// Normalize a batch, preserving provider order.
pub fn normalize_all(raw: &[Value]) -> Vec<CallRecord> {
    raw.iter().map(normalize_call).collect()
}

/// Normalize a single raw provider call.
pub fn normalize_call(raw: &Value) -> CallRecord {
    let created_at = timestamp(raw, "createdAt");
    let started_at = timestamp(raw, "startedAt");
    let ended_at = timestamp(raw, "endedAt");
    let duration_seconds = duration_secs(started_at, ended_at);

    let ended_reason = string(raw, "endedReason").or_else(|| {
        let fallback = if duration_seconds > 0 {
            DEFAULT_ENDED_REASON_CONNECTED
        } else {
            DEFAULT_ENDED_REASON_UNANSWERED
        };
        Some(fallback.to_string())
    });

    CallRecord {
        id: string(raw, "id").unwrap_or_default(),
        owner_id: string(raw, "assistantId").unwrap_or_default(),
        phone_number: phone_number(raw),
        created_at,
        started_at,
        ended_at,
        duration_seconds,
        status: string(raw, "status"),
        ended_reason,
        cost: raw.get("cost").and_then(Value::as_f64).unwrap_or(0.0),
        transcript: transcript(raw),
        summary: string(raw, "summary")
            .or_else(|| raw.pointer("/analysis/summary").and_then(non_empty_str)),
        analysis: analysis(raw),
    }
}

/// Whole seconds between start and end, rounded; 0 when either is missing
/// or the clock ran backwards.
fn duration_secs(started: Option<DateTime<Utc>>, ended: Option<DateTime<Utc>>) -> u64 {
    match (started, ended) {
        (Some(s), Some(e)) => {
            let ms = (e - s).num_milliseconds();
            if ms <= 0 {
                0
            } else {
                (ms as f64 / 1000.0).round() as u64
            }
        }
        _ => 0,
    }
}

fn phone_number(raw: &Value) -> Option<String> {
    ["/customer/number", "/destination/number", "/phoneNumber/number"]
        .iter()
        .find_map(|p| raw.pointer(p).and_then(non_empty_str))
}

/// `role: text` lines in message order. Messages without text are skipped.
fn transcript(raw: &Value) -> Option<String> {
    let messages = raw
        .get("messages")
        .and_then(Value::as_array)
        .or_else(|| raw.pointer("/artifact/messages").and_then(Value::as_array))?;

    let lines = messages
        .iter()
        .filter_map(|m| {
            let role = m.get("role").and_then(Value::as_str).unwrap_or("unknown");
            let text = m
                .get("message")
                .or_else(|| m.get("content"))
                .and_then(Value::as_str)?;
            Some(format!("{role}: {text}"))
        })
        .collect::<Vec<_>>();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

fn analysis(raw: &Value) -> CallAnalysis {
    let Some(a) = raw.get("analysis") else {
        return CallAnalysis::default();
    };
    let structured = a.get("structuredData");
    CallAnalysis {
        sentiment: structured
            .and_then(|s| s.get("sentiment"))
            .and_then(Value::as_str)
            .and_then(Sentiment::parse),
        lead_quality: structured
            .and_then(|s| s.get("leadQuality"))
            .and_then(Value::as_str)
            .and_then(LeadQuality::parse),
        success_evaluation: a
            .get("successEvaluation")
            .and_then(SuccessEvaluation::from_json),
    }
}

fn timestamp(raw: &Value, key: &str) -> Option<DateTime<Utc>> {
    let s = raw.get(key)?.as_str()?;
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn string(raw: &Value, key: &str) -> Option<String> {
    raw.get(key).and_then(non_empty_str)
}

fn non_empty_str(v: &Value) -> Option<String> {
    v.as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
