//! Google Geocoding API client.
//!
//! Forward and reverse geocoding, with answers cached for an hour using
//! `moka`. Addresses are resolved with Turkish language and region hints.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::config::MapsConfig;

const GEOCODE_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/geocode/json";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from the geocoding API.
#[derive(Debug, Error)]
pub enum MapsError {
    /// The address or coordinates matched nothing.
    #[error("no geocoding results")]
    NoResults,

    /// The caller's input cannot be geocoded.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with an error status.
    #[error("geocoding API error: {0}")]
    Upstream(String),
}

/// A resolved location.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub lat: f64,
    pub lng: f64,
    pub formatted_address: String,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    formatted_address: String,
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

/// Client for the Geocoding API.
#[derive(Clone)]
pub struct MapsClient {
    inner: Arc<MapsClientInner>,
}

struct MapsClientInner {
    client: reqwest::Client,
    api_key: SecretString,
    cache: Cache<String, Place>,
}

impl MapsClient {
    /// Create a new geocoding client.
    ///
    /// # Errors
    ///
    /// Returns `MapsError::Http` if the HTTP client cannot be built.
    pub fn new(config: &MapsConfig) -> Result<Self, MapsError> {
        let cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(Duration::from_secs(3600)) // 1 hour
            .build();

        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            inner: Arc::new(MapsClientInner {
                client,
                api_key: config.api_key.clone(),
                cache,
            }),
        })
    }

    /// Resolve an address to coordinates.
    ///
    /// # Errors
    ///
    /// Returns `MapsError::InvalidInput` for a blank address,
    /// `MapsError::NoResults` if nothing matches, or an HTTP/upstream error.
    #[instrument(skip(self))]
    pub async fn geocode(&self, address: &str) -> Result<Place, MapsError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(MapsError::InvalidInput("Adres gereklidir".to_string()));
        }

        let cache_key = format!("geocode:{}", address.to_lowercase());
        if let Some(place) = self.inner.cache.get(&cache_key).await {
            debug!("Geocode cache hit");
            return Ok(place);
        }

        let place = self.request(&[("address", address)]).await?;
        self.inner.cache.insert(cache_key, place.clone()).await;
        Ok(place)
    }

    /// Resolve coordinates to the nearest address.
    ///
    /// # Errors
    ///
    /// Returns `MapsError::InvalidInput` for out-of-range coordinates,
    /// `MapsError::NoResults` if nothing matches, or an HTTP/upstream error.
    #[instrument(skip(self))]
    pub async fn reverse_geocode(&self, lat: f64, lng: f64) -> Result<Place, MapsError> {
        validate_coordinates(lat, lng)?;

        let cache_key = format!("reverse:{lat:.6},{lng:.6}");
        if let Some(place) = self.inner.cache.get(&cache_key).await {
            debug!("Reverse geocode cache hit");
            return Ok(place);
        }

        let latlng = format!("{lat},{lng}");
        let place = self.request(&[("latlng", latlng.as_str())]).await?;
        self.inner.cache.insert(cache_key, place.clone()).await;
        Ok(place)
    }

    async fn request(&self, params: &[(&str, &str)]) -> Result<Place, MapsError> {
        let mut url = Url::parse_with_params(GEOCODE_ENDPOINT, params)
            .map_err(|e| MapsError::Upstream(format!("invalid endpoint: {e}")))?;
        url.query_pairs_mut()
            .append_pair("language", "tr")
            .append_pair("region", "tr")
            .append_pair("key", self.inner.api_key.expose_secret());

        let response = self.inner.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MapsError::Upstream(format!("HTTP {status}")));
        }

        let body: GeocodeResponse = response.json().await?;
        first_place(body)
    }
}

fn validate_coordinates(lat: f64, lng: f64) -> Result<(), MapsError> {
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return Err(MapsError::InvalidInput("Geçersiz koordinat".to_string()));
    }
    Ok(())
}

fn first_place(body: GeocodeResponse) -> Result<Place, MapsError> {
    match body.status.as_str() {
        "OK" => body
            .results
            .into_iter()
            .next()
            .map(|result| Place {
                lat: result.geometry.location.lat,
                lng: result.geometry.location.lng,
                formatted_address: result.formatted_address,
            })
            .ok_or(MapsError::NoResults),
        "ZERO_RESULTS" => Err(MapsError::NoResults),
        other => Err(MapsError::Upstream(
            body.error_message
                .map_or_else(|| other.to_string(), |message| format!("{other}: {message}")),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> GeocodeResponse {
        serde_json::from_str(json).expect("deserialize")
    }

    #[test]
    fn test_first_result_wins() {
        let body = parse(
            r#"{
                "status": "OK",
                "results": [
                    {
                        "formatted_address": "Kızılay, Ankara, Türkiye",
                        "geometry": { "location": { "lat": 39.9208, "lng": 32.8541 } }
                    },
                    {
                        "formatted_address": "Ankara, Türkiye",
                        "geometry": { "location": { "lat": 39.93, "lng": 32.85 } }
                    }
                ]
            }"#,
        );
        let place = first_place(body).expect("place");
        assert_eq!(place.formatted_address, "Kızılay, Ankara, Türkiye");
        assert!((place.lat - 39.9208).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zero_results() {
        let body = parse(r#"{ "status": "ZERO_RESULTS", "results": [] }"#);
        assert!(matches!(first_place(body), Err(MapsError::NoResults)));
    }

    #[test]
    fn test_denied_is_upstream_error() {
        let body = parse(
            r#"{ "status": "REQUEST_DENIED", "results": [], "error_message": "The provided API key is invalid." }"#,
        );
        match first_place(body) {
            Err(MapsError::Upstream(message)) => assert!(message.starts_with("REQUEST_DENIED")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_coordinate_range() {
        assert!(validate_coordinates(41.0082, 28.9784).is_ok());
        assert!(validate_coordinates(91.0, 0.0).is_err());
        assert!(validate_coordinates(0.0, -181.0).is_err());
    }

    #[tokio::test]
    async fn test_blank_address_rejected_without_request() {
        let client = MapsClient::new(&MapsConfig {
            api_key: SecretString::from("test-key"),
        })
        .expect("client");
        assert!(matches!(
            client.geocode("   ").await,
            Err(MapsError::InvalidInput(_))
        ));
    }
}
