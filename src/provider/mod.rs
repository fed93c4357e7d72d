// src/provider/mod.rs
pub mod vapi;

use std::time::Duration;

use crate::error::ProviderError;

/// Source of raw call objects. Implementations return the provider's JSON
/// untouched; shaping happens in [`crate::normalize`].
#[async_trait::async_trait]
pub trait CallProvider: Send + Sync {
    /// Fetch up to `limit` calls. Must give up after `timeout`.
    async fn list_calls(
        &self,
        limit: usize,
        timeout: Duration,
    ) -> Result<Vec<serde_json::Value>, ProviderError>;

    fn name(&self) -> &'static str;
}
