//! Email endpoints.

use axum::{Json, extract::State};
use serde::Serialize;

use super::ApiJson;
use crate::error::Result;
use crate::services::email::{Delivery, FinancialReportRequest, RestaurantApplicationRequest};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct EmailResponse {
    pub success: bool,
    pub message: &'static str,
    /// True when the message was only logged (non-production).
    pub simulated: bool,
}

impl EmailResponse {
    const fn from_delivery(delivery: Delivery, message: &'static str) -> Self {
        Self {
            success: true,
            message,
            simulated: matches!(delivery, Delivery::Logged),
        }
    }
}

/// POST /api/email/restaurant-application
pub async fn restaurant_application(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RestaurantApplicationRequest>,
) -> Result<Json<EmailResponse>> {
    let application = request.validate()?;
    let delivery = state.email().send_restaurant_application(&application).await?;
    Ok(Json(EmailResponse::from_delivery(
        delivery,
        "Başvurunuz alındı",
    )))
}

/// POST /api/email/financial-report
pub async fn financial_report(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<FinancialReportRequest>,
) -> Result<Json<EmailResponse>> {
    let report = request.validate()?;
    let delivery = state.email().send_financial_report(&report).await?;
    Ok(Json(EmailResponse::from_delivery(
        delivery,
        "Finansal rapor gönderildi",
    )))
}
