//! Push notification endpoints and the live order notification stream.

use std::convert::Infallible;

use axum::{
    Json,
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{ApiJson, ApiQuery, ScopeQuery};
use crate::error::{AppError, Result};
use crate::realtime::{DEFAULT_WINDOW, OrderWatcher};
use crate::services::notifications::{DispatchReport, SendNotificationRequest};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterTokenRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub token: String,
    pub platform: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UnregisterTokenRequest {
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct UnregisterTokenResponse {
    pub success: bool,
    pub deactivated: bool,
}

/// POST /api/notifications/send
///
/// Answers 503 when messaging is not configured, whatever the body.
pub async fn send(
    State(state): State<AppState>,
    body: core::result::Result<ApiJson<SendNotificationRequest>, AppError>,
) -> Result<Json<DispatchReport>> {
    state.notifications().ensure_configured()?;
    let ApiJson(request) = body?;
    let report = state.notifications().send(request).await?;
    Ok(Json(report))
}

/// POST /api/notifications/token
pub async fn register_token(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterTokenRequest>,
) -> Result<Json<Value>> {
    let device = state
        .notifications()
        .register_token(&request.user_id, &request.token, request.platform.as_deref())
        .await?;
    Ok(Json(json!({ "success": true, "tokenId": device.id })))
}

/// DELETE /api/notifications/token
pub async fn unregister_token(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<UnregisterTokenRequest>,
) -> Result<Json<UnregisterTokenResponse>> {
    let deactivated = state.notifications().unregister_token(&request.token).await?;
    Ok(Json(UnregisterTokenResponse {
        success: true,
        deactivated,
    }))
}

/// GET /api/notifications/stream
///
/// Streams a `ClientNotification` per new order (after the initial window)
/// and per order modification in scope. The stream ends if the watcher falls
/// behind; clients reconnect to resubscribe.
pub async fn stream(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ScopeQuery>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let scope = query.into_scope()?;
    let subscription = state.feed().subscribe(scope, DEFAULT_WINDOW).await?;
    let watcher = OrderWatcher::for_subscription(&subscription);

    tracing::debug!(scope = ?subscription.scope(), "Notification stream opened");

    let sse_stream = watcher.into_stream(subscription).map(|notification| {
        let json = serde_json::to_string(&notification).unwrap_or_else(|_| {
            r#"{"type":"system","message":"Bildirim okunamadı"}"#.to_string()
        });
        Ok(Event::default()
            .event(notification.kind.as_str())
            .data(json))
    });

    Ok(Sse::new(sse_stream).keep_alive(KeepAlive::default()))
}
