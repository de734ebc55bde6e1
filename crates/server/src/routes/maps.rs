//! Geocoding endpoints.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use super::ApiQuery;
use crate::error::{AppError, Result};
use crate::services::MapsClient;
use crate::services::maps::Place;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GeocodeQuery {
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Deserialize)]
pub struct ReverseGeocodeQuery {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReverseGeocodeResponse {
    pub formatted_address: String,
}

fn client(state: &AppState) -> Result<&MapsClient> {
    state
        .maps()
        .ok_or_else(|| AppError::ServiceUnavailable("Harita servisi yapılandırılmamış".to_string()))
}

/// GET /api/maps/geocode?address=
pub async fn geocode(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<GeocodeQuery>,
) -> Result<Json<Place>> {
    let place = client(&state)?.geocode(&query.address).await?;
    Ok(Json(place))
}

/// GET /api/maps/reverse-geocode?lat=&lng=
pub async fn reverse_geocode(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ReverseGeocodeQuery>,
) -> Result<Json<ReverseGeocodeResponse>> {
    let place = client(&state)?
        .reverse_geocode(query.lat, query.lng)
        .await?;
    Ok(Json(ReverseGeocodeResponse {
        formatted_address: place.formatted_address,
    }))
}
