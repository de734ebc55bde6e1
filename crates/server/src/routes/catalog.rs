//! Read-only catalog endpoints: restaurants, categories and profiles.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

use neyisek_core::{CategoryId, RestaurantId, UserId};

use super::ApiQuery;
use crate::error::{AppError, Result};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantQuery {
    pub category_id: Option<String>,
}

/// GET /api/restaurants
pub async fn restaurants(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<RestaurantQuery>,
) -> Result<Json<Value>> {
    let category = query
        .category_id
        .filter(|id| !id.trim().is_empty())
        .map(CategoryId::new);
    let restaurants = state
        .repositories()
        .restaurants
        .list_active(category.as_ref())
        .await?;
    Ok(Json(json!({ "success": true, "restaurants": restaurants })))
}

/// GET /api/restaurants/{id}
pub async fn restaurant(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let restaurant = state
        .repositories()
        .restaurants
        .get(&RestaurantId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound("Restoran bulunamadı".to_string()))?;
    Ok(Json(json!({ "success": true, "restaurant": restaurant })))
}

/// GET /api/categories
pub async fn categories(State(state): State<AppState>) -> Result<Json<Value>> {
    let categories = state.repositories().restaurants.list_categories().await?;
    Ok(Json(json!({ "success": true, "categories": categories })))
}

/// GET /api/users/{uid}
pub async fn user(State(state): State<AppState>, Path(uid): Path<String>) -> Result<Json<Value>> {
    let user = state
        .repositories()
        .users
        .get(&UserId::new(uid))
        .await?
        .ok_or_else(|| AppError::NotFound("Kullanıcı bulunamadı".to_string()))?;
    Ok(Json(json!({ "success": true, "user": user })))
}
