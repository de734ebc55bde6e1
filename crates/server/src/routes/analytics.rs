//! Telemetry endpoints. Bodies are free-form JSON objects.

use axum::{Json, extract::State};
use serde_json::{Value, json};

use super::ApiJson;
use crate::error::Result;
use crate::models::AnalyticsKind;
use crate::state::AppState;

async fn record(state: &AppState, kind: AnalyticsKind, body: Value) -> Result<Json<Value>> {
    state.analytics().record(kind, body).await?;
    Ok(Json(json!({ "success": true })))
}

/// POST /api/analytics/engagement
pub async fn engagement(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Value>,
) -> Result<Json<Value>> {
    record(&state, AnalyticsKind::Engagement, body).await
}

/// POST /api/analytics/performance
pub async fn performance(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Value>,
) -> Result<Json<Value>> {
    record(&state, AnalyticsKind::Performance, body).await
}

/// POST /api/analytics/performance-alert
pub async fn performance_alert(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Value>,
) -> Result<Json<Value>> {
    record(&state, AnalyticsKind::PerformanceAlert, body).await
}
