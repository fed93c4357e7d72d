use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;

use crate::engine::{AnalyticsEngine, AnalyticsSnapshot};
use crate::error::AnalyticsError;

/// Header carrying the authenticated dashboard user (set by the auth layer).
pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<AnalyticsEngine>,
    pub default_days: u32,
    pub default_limit: usize,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/analytics", get(analytics))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct AnalyticsQuery {
    days: Option<u32>,
    limit: Option<usize>,
}

async fn analytics(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<AnalyticsQuery>,
) -> Result<Json<Arc<AnalyticsSnapshot>>, ApiError> {
    let user_id = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(ApiError::MissingUser)?;

    let days = q.days.unwrap_or(state.default_days);
    let limit = q
        .limit
        .unwrap_or(state.default_limit)
        .min(state.engine.settings().fetch_limit);

    let snapshot = state.engine.compute_for_user(user_id, days, limit).await?;
    Ok(Json(snapshot))
}

#[derive(Debug)]
pub enum ApiError {
    MissingUser,
    Analytics(AnalyticsError),
}

impl From<AnalyticsError> for ApiError {
    fn from(e: AnalyticsError) -> Self {
        Self::Analytics(e)
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingUser => StatusCode::BAD_REQUEST,
            ApiError::Analytics(AnalyticsError::ProviderUnavailable(_)) => StatusCode::BAD_GATEWAY,
        }
    }

    /// User-safe message; provider details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::MissingUser => format!("missing {USER_ID_HEADER} header"),
            ApiError::Analytics(AnalyticsError::ProviderUnavailable(_)) => {
                "call provider unavailable".to_string()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = ?self, "analytics request failed");
        }
        let body = serde_json::json!({ "error": self.user_message() });
        (status, Json(body)).into_response()
    }
}
