//! Order endpoints.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};

use neyisek_core::{OrderId, OrderStatus};

use super::{ApiJson, ApiQuery, ScopeQuery};
use crate::error::{AppError, Result};
use crate::models::Order;
use crate::services::orders::CreateOrderRequest;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedResponse {
    pub success: bool,
    pub order_id: OrderId,
}

#[derive(Debug, Serialize)]
pub struct OrdersResponse {
    pub success: bool,
    pub orders: Vec<Order>,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub success: bool,
    pub order: Order,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    #[serde(default)]
    pub status: String,
}

/// POST /api/orders
pub async fn create(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateOrderRequest>,
) -> Result<Json<CreatedResponse>> {
    let order = state.orders().create(request).await?;
    Ok(Json(CreatedResponse {
        success: true,
        order_id: order.id,
    }))
}

/// GET /api/orders
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ScopeQuery>,
) -> Result<Json<OrdersResponse>> {
    let scope = query.into_scope()?;
    let orders = state.orders().list(&scope).await?;
    Ok(Json(OrdersResponse {
        success: true,
        orders,
    }))
}

/// GET /api/orders/{id}
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>> {
    let order = state
        .orders()
        .get(&OrderId::new(id))
        .await?;
    Ok(Json(OrderResponse {
        success: true,
        order,
    }))
}

/// PATCH /api/orders/{id}/status
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<StatusUpdate>,
) -> Result<Json<OrderResponse>> {
    let status: OrderStatus = update
        .status
        .parse()
        .map_err(|_| AppError::BadRequest("Geçersiz sipariş durumu".to_string()))?;

    let order = state
        .orders()
        .update_status(&OrderId::new(id), status)
        .await?;
    Ok(Json(OrderResponse {
        success: true,
        order,
    }))
}
