//! Firebase Cloud Messaging HTTP v1 client.
//!
//! Authenticates with a service account: a short-lived RS256 assertion is
//! exchanged for an OAuth2 access token, which is cached until shortly
//! before it expires.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;
use tracing::instrument;

use crate::config::FirebaseConfig;

use super::error::{ApiErrorResponse, FcmError};
use super::{PushMessage, PushMessenger};

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const MESSAGING_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
const FCM_API_BASE: &str = "https://fcm.googleapis.com/v1";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Refresh the access token this long before it expires.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Push messaging client.
#[derive(Clone)]
pub struct FcmClient {
    inner: Arc<FcmClientInner>,
}

struct FcmClientInner {
    client: reqwest::Client,
    project_id: String,
    client_email: String,
    signing_key: EncodingKey,
    access_token: Mutex<Option<CachedToken>>,
}

struct CachedToken {
    value: SecretString,
    expires_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Deserialize)]
struct SendResponse {
    name: String,
}

impl FcmClient {
    /// Create a new client from service account configuration.
    ///
    /// # Errors
    ///
    /// Returns `FcmError::Credentials` if the private key is not valid PEM,
    /// or `FcmError::Http` if the HTTP client cannot be built.
    pub fn new(config: &FirebaseConfig) -> Result<Self, FcmError> {
        let signing_key = EncodingKey::from_rsa_pem(config.private_key.expose_secret().as_bytes())?;
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(FcmClientInner {
                client,
                project_id: config.project_id.clone(),
                client_email: config.client_email.clone(),
                signing_key,
                access_token: Mutex::new(None),
            }),
        })
    }

    /// Get a valid access token, exchanging a fresh assertion if needed.
    async fn access_token(&self) -> Result<SecretString, FcmError> {
        let mut cached = self.inner.access_token.lock().await;
        let now = Utc::now();

        if let Some(token) = cached.as_ref()
            && token.expires_at > now + chrono::Duration::seconds(TOKEN_REFRESH_MARGIN_SECS)
        {
            return Ok(token.value.clone());
        }

        let fresh = self.exchange_assertion(now).await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    #[instrument(skip(self), fields(client_email = %self.inner.client_email))]
    async fn exchange_assertion(&self, now: DateTime<Utc>) -> Result<CachedToken, FcmError> {
        let iat = now.timestamp();
        let claims = AssertionClaims {
            iss: &self.inner.client_email,
            scope: MESSAGING_SCOPE,
            aud: TOKEN_URL,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };
        let assertion = jsonwebtoken::encode(
            &Header::new(Algorithm::RS256),
            &claims,
            &self.inner.signing_key,
        )?;

        let response = self
            .inner
            .client
            .post(TOKEN_URL)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(FcmError::Auth {
                status: status.as_u16(),
                message,
            });
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| FcmError::Parse(format!("Failed to parse token response: {e}")))?;

        tracing::debug!(expires_in = body.expires_in, "Obtained messaging access token");

        Ok(CachedToken {
            value: SecretString::from(body.access_token),
            expires_at: now + chrono::Duration::seconds(body.expires_in),
        })
    }
}

#[async_trait]
impl PushMessenger for FcmClient {
    #[instrument(skip(self, message), fields(project = %self.inner.project_id))]
    async fn send(&self, message: &PushMessage) -> Result<String, FcmError> {
        let access_token = self.access_token().await?;
        let url = format!(
            "{FCM_API_BASE}/projects/{}/messages:send",
            self.inner.project_id
        );

        let response = self
            .inner
            .client
            .post(&url)
            .bearer_auth(access_token.expose_secret())
            .json(&message_body(message))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorResponse>(&body)
                .map_or(body, |parsed| parsed.error.message);
            return Err(FcmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let sent: SendResponse = serde_json::from_str(&body)
            .map_err(|e| FcmError::Parse(format!("Failed to parse send response: {e}")))?;
        Ok(sent.name)
    }
}

/// Build the HTTP v1 request body for one message.
fn message_body(message: &PushMessage) -> serde_json::Value {
    let notification = &message.notification;
    let mut webpush = json!({
        "notification": {
            "title": notification.title,
            "body": notification.body,
            "icon": notification.icon,
        },
    });
    if let Some(link) = &notification.link {
        webpush["fcm_options"] = json!({ "link": link });
    }

    json!({
        "message": {
            "token": message.token,
            "notification": {
                "title": notification.title,
                "body": notification.body,
            },
            "data": message.data,
            "webpush": webpush,
        }
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::services::fcm::DisplayNotification;

    #[test]
    fn test_message_body_shape() {
        let message = PushMessage {
            token: "device-token".to_string(),
            notification: DisplayNotification {
                title: "Siparişiniz Yolda".to_string(),
                body: "Kuryeniz yola çıktı".to_string(),
                icon: "/icons/icon-192x192.png".to_string(),
                link: Some("https://neyisek.com/orders/o1".to_string()),
            },
            data: BTreeMap::from([("type".to_string(), "delivery_update".to_string())]),
        };

        let body = message_body(&message);
        assert_eq!(body["message"]["token"], "device-token");
        assert_eq!(body["message"]["notification"]["title"], "Siparişiniz Yolda");
        assert_eq!(body["message"]["data"]["type"], "delivery_update");
        assert_eq!(
            body["message"]["webpush"]["fcm_options"]["link"],
            "https://neyisek.com/orders/o1"
        );
    }

    #[test]
    fn test_invalid_key_is_rejected() {
        let config = FirebaseConfig {
            project_id: "neyisek".to_string(),
            client_email: "svc@neyisek.iam.gserviceaccount.com".to_string(),
            private_key: SecretString::from("not a pem key"),
        };
        assert!(matches!(
            FcmClient::new(&config),
            Err(FcmError::Credentials(_))
        ));
    }
}
