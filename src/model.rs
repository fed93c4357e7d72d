//! # Call model
//! Canonical shapes shared by the normalizer, classifier, enricher and
//! aggregator. Everything here is plain data; no I/O.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One call after normalization. Transient: rebuilt from the provider fetch
/// on every analytics computation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRecord {
    pub id: String,
    /// Tenant scope (the provider's assistant id). Empty when the provider
    /// did not report one; such calls never match a tenant filter.
    pub owner_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_seconds: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_reason: Option<String>,
    pub cost: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub analysis: CallAnalysis,
}

impl CallRecord {
    /// Timestamp used for bucketing and windowing: `createdAt`, falling back
    /// to `startedAt`.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.created_at.or(self.started_at)
    }
}

/// Per-call analysis fields. Sentiment and lead quality may come from the
/// provider payload or from the persisted analysis store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallAnalysis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_quality: Option<LeadQuality>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_evaluation: Option<SuccessEvaluation>,
}

/// Upstream AI verdict on whether the call achieved its goal. Providers
/// emit it as a boolean, a word, or a 1-10 score depending on the rubric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SuccessEvaluation {
    Bool(bool),
    Score(f64),
    Text(String),
}

impl SuccessEvaluation {
    /// Build from an arbitrary JSON value; `null`, arrays and objects carry
    /// no verdict.
    pub fn from_json(v: &serde_json::Value) -> Option<Self> {
        match v {
            serde_json::Value::Bool(b) => Some(Self::Bool(*b)),
            serde_json::Value::Number(n) => n.as_f64().map(Self::Score),
            serde_json::Value::String(s) => Some(Self::Text(s.clone())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    /// Case-insensitive parse; unknown labels yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Some(Self::Positive),
            "neutral" => Some(Self::Neutral),
            "negative" => Some(Self::Negative),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadQuality {
    Hot,
    Warm,
    Cold,
}

impl LeadQuality {
    /// Case-insensitive parse; unknown labels yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hot" => Some(Self::Hot),
            "warm" => Some(Self::Warm),
            "cold" => Some(Self::Cold),
            _ => None,
        }
    }
}

/// Persisted analysis row, written by an external process and only read here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub call_id: String,
    pub owner_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_quality: Option<LeadQuality>,
    pub analyzed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_parse_case_insensitively() {
        assert_eq!(Sentiment::parse(" Positive "), Some(Sentiment::Positive));
        assert_eq!(Sentiment::parse("meh"), None);
        assert_eq!(LeadQuality::parse("HOT"), Some(LeadQuality::Hot));
        assert_eq!(LeadQuality::parse(""), None);
    }

    #[test]
    fn success_evaluation_from_json_variants() {
        use serde_json::json;
        assert_eq!(
            SuccessEvaluation::from_json(&json!(true)),
            Some(SuccessEvaluation::Bool(true))
        );
        assert_eq!(
            SuccessEvaluation::from_json(&json!(8)),
            Some(SuccessEvaluation::Score(8.0))
        );
        assert_eq!(
            SuccessEvaluation::from_json(&json!("pass")),
            Some(SuccessEvaluation::Text("pass".into()))
        );
        assert_eq!(SuccessEvaluation::from_json(&json!(null)), None);
    }

    #[test]
    fn timestamp_falls_back_to_started_at() {
        let started = "2026-01-05T10:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let rec = CallRecord {
            started_at: Some(started),
            ..Default::default()
        };
        assert_eq!(rec.timestamp(), Some(started));
    }
}
