use std::time::Duration;

use thiserror::Error;

/// Failure fetching raw calls from the voice provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider request timed out after {0:?}")]
    Timeout(Duration),

    #[error("provider returned HTTP {status}")]
    Status { status: u16 },

    #[error("provider transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed provider response: {0}")]
    Decode(String),
}

/// Failure of one analysis-store lookup. Non-fatal for the engine.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("lookup batch of {size} ids exceeds the limit of {max}")]
    BatchTooLarge { size: usize, max: usize },

    #[error("analysis store error: {0}")]
    Backend(String),
}

/// Failure mapping a user to the tenant that owns their calls.
#[derive(Debug, Error)]
pub enum TenantError {
    #[error("no tenant is mapped to user {0}")]
    Unknown(String),

    #[error("tenant resolver error: {0}")]
    Backend(String),
}

/// Errors surfaced by [`crate::engine::AnalyticsEngine`].
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// No source data; analytics cannot be computed at all.
    #[error("call provider unavailable: {0}")]
    ProviderUnavailable(#[from] ProviderError),
}
