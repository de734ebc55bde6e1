//! AI endpoints.
//!
//! Every endpoint answers 200 even when the model fails; the body then
//! carries `fallback: true` and a deterministic payload.

use axum::{Json, extract::State};

use super::ApiJson;
use crate::error::{AppError, Result};
use crate::services::ai::types::{
    ChatbotReply, ChatbotRequest, CrossSell, CrossSellRequest, PricingAdvice, PricingRequest,
    Recommendations, RecommendationsRequest, SearchIntent, SearchRequest,
};
use crate::services::fallback::FallbackBody;
use crate::state::AppState;

const AI_UNAVAILABLE: &str = "AI servisi şu anda kullanılamıyor";

fn require_text(value: &str, message: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(message.to_string()));
    }
    Ok(())
}

/// POST /api/ai/chatbot
pub async fn chatbot(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ChatbotRequest>,
) -> Result<Json<FallbackBody<ChatbotReply>>> {
    require_text(&request.message, "Mesaj gereklidir")?;
    let outcome = state.ai().chatbot(&request).await;
    Ok(Json(FallbackBody::from_outcome(outcome, AI_UNAVAILABLE)))
}

/// POST /api/ai/recommendations
pub async fn recommendations(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RecommendationsRequest>,
) -> Result<Json<FallbackBody<Recommendations>>> {
    let outcome = state.ai().recommendations(&request).await;
    Ok(Json(FallbackBody::from_outcome(outcome, AI_UNAVAILABLE)))
}

/// POST /api/ai/search
pub async fn search(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SearchRequest>,
) -> Result<Json<FallbackBody<SearchIntent>>> {
    require_text(&request.query, "Arama sorgusu gereklidir")?;
    let outcome = state.ai().search(&request).await;
    Ok(Json(FallbackBody::from_outcome(outcome, AI_UNAVAILABLE)))
}

/// POST /api/ai/cross-sell
pub async fn cross_sell(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CrossSellRequest>,
) -> Result<Json<FallbackBody<CrossSell>>> {
    if request.cart_items.is_empty() {
        return Err(AppError::BadRequest("Sepet boş".to_string()));
    }
    let outcome = state.ai().cross_sell(&request).await;
    Ok(Json(FallbackBody::from_outcome(outcome, AI_UNAVAILABLE)))
}

/// POST /api/ai/pricing
pub async fn pricing(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<PricingRequest>,
) -> Result<Json<FallbackBody<PricingAdvice>>> {
    if request.items.is_empty() {
        return Err(AppError::BadRequest("Ürün listesi gereklidir".to_string()));
    }
    let outcome = state.ai().pricing(&request).await;
    Ok(Json(FallbackBody::from_outcome(outcome, AI_UNAVAILABLE)))
}
