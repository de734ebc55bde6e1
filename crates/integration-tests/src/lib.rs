//! Integration tests for the NeYisek API.
//!
//! Tests drive the full router in-process with `tower::ServiceExt::oneshot`
//! against the in-memory store, so no database or network is needed:
//!
//! ```bash
//! cargo test -p neyisek-integration-tests
//! ```
//!
//! External integrations are replaced: push messages are recorded by
//! [`RecordingMessenger`], and the AI model always fails so every AI
//! endpoint answers with its fallback.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{Method, Request, StatusCode, header};
use serde_json::Value;
use tower::ServiceExt;

use neyisek_server::config::AppConfig;
use neyisek_server::db::{MemoryStore, Repositories};
use neyisek_server::seed::{self, SeedFile};
use neyisek_server::services::ai::{AiError, AiModel};
use neyisek_server::services::fcm::{FcmError, PushMessage, PushMessenger};
use neyisek_server::state::{AppState, Integrations};

/// Push messenger that records messages and fails for chosen tokens.
#[derive(Debug, Default)]
pub struct RecordingMessenger {
    failing: Vec<String>,
    sent: Mutex<Vec<PushMessage>>,
}

impl RecordingMessenger {
    /// A messenger whose sends to `tokens` fail as unregistered.
    #[must_use]
    pub fn failing_for(tokens: &[&str]) -> Self {
        Self {
            failing: tokens.iter().map(ToString::to_string).collect(),
            sent: Mutex::default(),
        }
    }

    /// Messages sent so far, including failed attempts.
    #[must_use]
    pub fn sent(&self) -> Vec<PushMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PushMessenger for RecordingMessenger {
    async fn send(&self, message: &PushMessage) -> Result<String, FcmError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(message.clone());
        }
        if self.failing.contains(&message.token) {
            return Err(FcmError::Api {
                status: 404,
                message: "Requested entity was not found.".to_string(),
            });
        }
        Ok(format!("projects/test/messages/{}", message.token))
    }
}

/// AI model that is always unreachable.
pub struct UnreachableModel;

#[async_trait]
impl AiModel for UnreachableModel {
    async fn generate(&self, _prompt: &str) -> Result<String, AiError> {
        Err(AiError::Api {
            status: 503,
            message: "model overloaded".to_string(),
        })
    }
}

/// The application under test plus handles on its fakes.
pub struct TestApp {
    router: Router,
    pub repos: Repositories,
    pub messenger: Option<Arc<RecordingMessenger>>,
}

fn test_config() -> AppConfig {
    AppConfig::from_lookup(&|key| match key {
        "APP_ENV" => Some("test".to_string()),
        "SITE_URL" => Some("https://neyisek.com".to_string()),
        _ => None,
    })
    .expect("test configuration")
}

impl TestApp {
    /// App with push messaging recorded and the AI model failing.
    #[must_use]
    pub fn new() -> Self {
        Self::with_messenger(Some(RecordingMessenger::default()))
    }

    /// App with no push messaging configured.
    #[must_use]
    pub fn without_messaging() -> Self {
        Self::with_messenger(None)
    }

    /// App with the given messenger (or none).
    #[must_use]
    pub fn with_messenger(messenger: Option<RecordingMessenger>) -> Self {
        let repos = Repositories::in_memory(MemoryStore::new());
        let messenger = messenger.map(Arc::new);
        let integrations = Integrations {
            messenger: messenger
                .clone()
                .map(|m| m as Arc<dyn PushMessenger>),
            ai_model: Some(Arc::new(UnreachableModel)),
            maps: None,
        };
        let state = AppState::with_integrations(test_config(), repos.clone(), integrations)
            .expect("application state");

        Self {
            router: neyisek_server::app(state),
            repos,
            messenger,
        }
    }

    /// Load the demo catalog: one category, two owners, two restaurants.
    pub async fn seed_catalog(&self) {
        let file: SeedFile = serde_json::from_value(serde_json::json!({
            "categories": [{ "id": "kebap", "name": "Kebap", "sortOrder": 1 }],
            "users": [
                { "uid": "owner-1", "email": "owner1@neyisek.com", "role": "restaurant" },
                { "uid": "owner-2", "email": "owner2@neyisek.com", "role": "restaurant" }
            ],
            "restaurants": [
                {
                    "id": "r-1", "name": "Adana Sofrası", "ownerId": "owner-1",
                    "categoryId": "kebap", "address": "Atatürk Cd. 12", "rating": 4.6
                },
                {
                    "id": "r-2", "name": "Karadeniz Pide", "ownerId": "owner-2",
                    "address": "Tunalı Hilmi Cd. 44", "isActive": false
                }
            ]
        }))
        .expect("seed fixture");
        seed::apply(&self.repos, file, chrono::Utc::now())
            .await
            .expect("seed catalog");
    }

    /// Send a raw request.
    pub async fn send(&self, request: Request<Body>) -> axum::response::Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    /// Send a request and read the whole body.
    pub async fn request_raw(
        &self,
        method: Method,
        uri: &str,
        body: Option<&Value>,
    ) -> (StatusCode, Bytes) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = self.send(request).await;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        (status, bytes)
    }

    /// Send a request and parse the body as JSON (`Null` if it is not).
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<&Value>,
    ) -> (StatusCode, Value) {
        let (status, bytes) = self.request_raw(method, uri, body).await;
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: &Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, body: &Value) -> (StatusCode, Value) {
        self.request(Method::PATCH, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, body: &Value) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(body)).await
    }

    /// Place a valid order and return its id.
    pub async fn place_order(&self, user_id: &str, restaurant_id: &str) -> String {
        let (status, body) = self
            .post("/api/orders", &order_body(user_id, restaurant_id))
            .await;
        assert_eq!(status, StatusCode::OK, "order placement failed: {body}");
        body["orderId"]
            .as_str()
            .expect("orderId in response")
            .to_string()
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// A checkout body that passes validation.
#[must_use]
pub fn order_body(user_id: &str, restaurant_id: &str) -> Value {
    serde_json::json!({
        "userId": user_id,
        "restaurantId": restaurant_id,
        "items": [
            { "productId": "p-1", "name": "Adana Dürüm", "price": 180, "quantity": 2 },
            { "productId": "p-2", "name": "Ayran", "price": 30, "quantity": 1 }
        ],
        "customerInfo": { "name": "Zeynep Kaya", "phone": "+90 555 111 22 33" },
        "deliveryAddress": "Kızılay Mh. 5/3, Çankaya",
        "paymentMethod": "cash",
        "deliveryFee": 19.9,
        "totalAmount": 409.9
    })
}
