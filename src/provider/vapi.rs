// src/provider/vapi.rs
use std::time::Duration;

use serde_json::Value;

use crate::error::ProviderError;
use crate::provider::CallProvider;

pub const DEFAULT_BASE_URL: &str = "https://api.vapi.ai";

/// Vapi REST client (`GET /call`). Requires an API key with read access.
pub struct VapiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl VapiClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("call-analytics/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait::async_trait]
impl CallProvider for VapiClient {
    async fn list_calls(&self, limit: usize, timeout: Duration) -> Result<Vec<Value>, ProviderError> {
        let url = format!("{}/call", self.base_url);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .query(&[("limit", limit)])
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| map_transport(e, timeout))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
            });
        }

        let body: Value = resp.json().await.map_err(|e| map_transport(e, timeout))?;
        calls_from_body(body)
    }

    fn name(&self) -> &'static str {
        "vapi"
    }
}

/// The list endpoint answers with a bare array; some deployments wrap it
/// as `{ "results": [...] }`.
fn calls_from_body(body: Value) -> Result<Vec<Value>, ProviderError> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("results") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(ProviderError::Decode("expected a list of calls".into())),
        },
        other => Err(ProviderError::Decode(format!(
            "expected a list of calls, got {}",
            json_kind(&other)
        ))),
    }
}

fn map_transport(e: reqwest::Error, timeout: Duration) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(timeout)
    } else if e.is_decode() {
        ProviderError::Decode(e.to_string())
    } else {
        ProviderError::Transport(e)
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
