//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                          - Liveness
//! GET    /health/ready                    - Readiness (store ping)
//!
//! # Orders
//! POST   /api/orders                      - Place an order
//! GET    /api/orders                      - List (?userId | ?restaurantId | ?scope=admin)
//! GET    /api/orders/{id}                 - Order detail
//! PATCH  /api/orders/{id}/status          - Change status
//!
//! # Notifications
//! POST   /api/notifications/send          - Push notification fan-out
//! POST   /api/notifications/token         - Register a device token
//! DELETE /api/notifications/token         - Deactivate a device token
//! GET    /api/notifications/stream        - Live order notifications (SSE)
//!
//! # AI
//! POST   /api/ai/chatbot
//! POST   /api/ai/recommendations
//! POST   /api/ai/search
//! POST   /api/ai/cross-sell
//! POST   /api/ai/pricing
//!
//! # Email
//! POST   /api/email/restaurant-application
//! POST   /api/email/financial-report
//!
//! # Analytics
//! POST   /api/analytics/engagement
//! POST   /api/analytics/performance
//! POST   /api/analytics/performance-alert
//!
//! # Maps
//! GET    /api/maps/geocode                - ?address=
//! GET    /api/maps/reverse-geocode        - ?lat=&lng=
//!
//! # Catalog
//! GET    /api/restaurants                 - Active restaurants (?categoryId)
//! GET    /api/restaurants/{id}
//! GET    /api/categories
//! GET    /api/users/{uid}
//! ```

pub mod ai;
pub mod analytics;
pub mod catalog;
pub mod email;
pub mod health;
pub mod maps;
pub mod notifications;
pub mod orders;

use axum::{
    Router,
    extract::{FromRequest, FromRequestParts},
    routing::{get, patch, post},
};
use serde::Deserialize;

use neyisek_core::{RestaurantId, UserId};

use crate::db::OrderScope;
use crate::error::AppError;
use crate::state::AppState;

/// JSON body extractor whose rejections use the API error shape.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Query string extractor whose rejections use the API error shape.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Order scope selector shared by listing and live streams.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeQuery {
    pub user_id: Option<String>,
    pub restaurant_id: Option<String>,
    /// `admin` for every order.
    pub scope: Option<String>,
}

impl ScopeQuery {
    /// Resolve to an [`OrderScope`]. A user id wins over a restaurant id.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` if no scope is given.
    pub fn into_scope(self) -> Result<OrderScope, AppError> {
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        if let Some(user_id) = present(self.user_id) {
            return Ok(OrderScope::User(UserId::new(user_id)));
        }
        if let Some(restaurant_id) = present(self.restaurant_id) {
            return Ok(OrderScope::Restaurant(RestaurantId::new(restaurant_id)));
        }
        if self.scope.as_deref() == Some("admin") {
            return Ok(OrderScope::All);
        }
        Err(AppError::BadRequest(
            "userId veya restaurantId gereklidir".to_string(),
        ))
    }
}

fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(orders::create).get(orders::list))
        .route("/{id}", get(orders::show))
        .route("/{id}/status", patch(orders::update_status))
}

fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/send", post(notifications::send))
        .route(
            "/token",
            post(notifications::register_token).delete(notifications::unregister_token),
        )
        .route("/stream", get(notifications::stream))
}

fn ai_routes() -> Router<AppState> {
    Router::new()
        .route("/chatbot", post(ai::chatbot))
        .route("/recommendations", post(ai::recommendations))
        .route("/search", post(ai::search))
        .route("/cross-sell", post(ai::cross_sell))
        .route("/pricing", post(ai::pricing))
}

fn email_routes() -> Router<AppState> {
    Router::new()
        .route("/restaurant-application", post(email::restaurant_application))
        .route("/financial-report", post(email::financial_report))
}

fn analytics_routes() -> Router<AppState> {
    Router::new()
        .route("/engagement", post(analytics::engagement))
        .route("/performance", post(analytics::performance))
        .route("/performance-alert", post(analytics::performance_alert))
}

fn maps_routes() -> Router<AppState> {
    Router::new()
        .route("/geocode", get(maps::geocode))
        .route("/reverse-geocode", get(maps::reverse_geocode))
}

/// Create all API routes.
pub fn routes() -> Router<AppState> {
    let api = Router::new()
        .nest("/orders", order_routes())
        .nest("/notifications", notification_routes())
        .nest("/ai", ai_routes())
        .nest("/email", email_routes())
        .nest("/analytics", analytics_routes())
        .nest("/maps", maps_routes())
        .route("/restaurants", get(catalog::restaurants))
        .route("/restaurants/{id}", get(catalog::restaurant))
        .route("/categories", get(catalog::categories))
        .route("/users/{uid}", get(catalog::user));

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api", api)
}
