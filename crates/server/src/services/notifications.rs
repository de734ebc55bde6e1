//! Push notification dispatch.
//!
//! A send request names a notification kind, a typed payload and one target
//! selector. The target resolves to a set of active device tokens; one
//! message per token is sent concurrently and every token whose delivery
//! failed is deactivated.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use neyisek_core::{
    Lira, NotificationKind, OrderId, OrderStatus, RestaurantId, Segment, UserId,
};

use crate::db::{OrderStore, RestaurantStore, TokenStore};
use crate::error::AppError;
use crate::models::{CustomerStats, DeviceToken};
use crate::services::fcm::{DisplayNotification, PushMessage, PushMessenger};

const NOTIFICATION_ICON: &str = "/icons/icon-192x192.png";

/// Message returned when the target has no active devices.
pub const NO_TARGET_MESSAGE: &str = "Hedef kullanıcı bulunamadı";

/// Body of `POST /api/notifications/send`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendNotificationRequest {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub user_id: Option<String>,
    pub restaurant_id: Option<String>,
    pub segment: Option<Segment>,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdateData {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub restaurant_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderData {
    pub order_id: OrderId,
    pub customer_name: Option<String>,
    pub total_amount: Option<Lira>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionData {
    pub title: String,
    pub message: String,
    pub promo_code: Option<String>,
    /// Site path or absolute URL opened on click.
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryUpdateData {
    pub order_id: OrderId,
    pub message: Option<String>,
    pub estimated_minutes: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantApplicationData {
    pub restaurant_name: String,
    /// `approved`, `rejected` or anything else for "received".
    pub status: Option<String>,
}

/// A notification payload checked against its kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationPayload {
    OrderUpdate(OrderUpdateData),
    NewOrder(NewOrderData),
    Promotion(PromotionData),
    DeliveryUpdate(DeliveryUpdateData),
    RestaurantApplication(RestaurantApplicationData),
}

impl NotificationPayload {
    /// Parse `data` as the payload for `kind`.
    ///
    /// # Errors
    ///
    /// Returns the deserialization error if `data` does not fit `kind`.
    pub fn parse(kind: NotificationKind, data: serde_json::Value) -> serde_json::Result<Self> {
        Ok(match kind {
            NotificationKind::OrderUpdate => Self::OrderUpdate(serde_json::from_value(data)?),
            NotificationKind::NewOrder => Self::NewOrder(serde_json::from_value(data)?),
            NotificationKind::Promotion => Self::Promotion(serde_json::from_value(data)?),
            NotificationKind::DeliveryUpdate => {
                Self::DeliveryUpdate(serde_json::from_value(data)?)
            }
            NotificationKind::RestaurantApplication => {
                Self::RestaurantApplication(serde_json::from_value(data)?)
            }
        })
    }

    #[must_use]
    pub const fn kind(&self) -> NotificationKind {
        match self {
            Self::OrderUpdate(_) => NotificationKind::OrderUpdate,
            Self::NewOrder(_) => NotificationKind::NewOrder,
            Self::Promotion(_) => NotificationKind::Promotion,
            Self::DeliveryUpdate(_) => NotificationKind::DeliveryUpdate,
            Self::RestaurantApplication(_) => NotificationKind::RestaurantApplication,
        }
    }

    /// What the device shows, and the click data sent with it.
    #[must_use]
    pub fn display(&self, site_url: &str) -> (DisplayNotification, BTreeMap<String, String>) {
        let mut data = BTreeMap::new();
        data.insert("type".to_string(), self.kind().as_str().to_string());

        let (title, body, path) = match self {
            Self::OrderUpdate(d) => {
                data.insert("orderId".to_string(), d.order_id.to_string());
                let body = d.restaurant_name.as_ref().map_or_else(
                    || format!("Siparişiniz: {}", d.status.label()),
                    |name| format!("{name} siparişiniz: {}", d.status.label()),
                );
                (
                    "Sipariş Durumu Güncellendi".to_string(),
                    body,
                    format!("/orders/{}", d.order_id),
                )
            }
            Self::NewOrder(d) => {
                data.insert("orderId".to_string(), d.order_id.to_string());
                let customer = d.customer_name.as_deref().unwrap_or("Bir müşteri");
                let body = d.total_amount.map_or_else(
                    || format!("{customer} yeni bir sipariş verdi"),
                    |total| format!("{customer} yeni bir sipariş verdi ({total})"),
                );
                ("Yeni Sipariş!".to_string(), body, "/restaurant/orders".to_string())
            }
            Self::Promotion(d) => {
                let body = d.promo_code.as_ref().map_or_else(
                    || d.message.clone(),
                    |code| format!("{} Kod: {code}", d.message),
                );
                let path = d.url.clone().unwrap_or_else(|| "/".to_string());
                (d.title.clone(), body, path)
            }
            Self::DeliveryUpdate(d) => {
                data.insert("orderId".to_string(), d.order_id.to_string());
                let body = match (&d.message, d.estimated_minutes) {
                    (Some(message), _) => message.clone(),
                    (None, Some(minutes)) => {
                        format!("Siparişiniz yolda, tahmini varış {minutes} dakika")
                    }
                    (None, None) => "Siparişiniz yolda".to_string(),
                };
                (
                    "Teslimat Güncellemesi".to_string(),
                    body,
                    format!("/orders/{}", d.order_id),
                )
            }
            Self::RestaurantApplication(d) => {
                let outcome = match d.status.as_deref() {
                    Some("approved") => "onaylandı",
                    Some("rejected") => "reddedildi",
                    _ => "alındı",
                };
                (
                    "Restoran Başvurusu".to_string(),
                    format!("{} başvurunuz {outcome}", d.restaurant_name),
                    "/restaurant".to_string(),
                )
            }
        };

        let link = absolute_link(site_url, &path);
        data.insert("url".to_string(), link.clone());

        (
            DisplayNotification {
                title,
                body,
                icon: NOTIFICATION_ICON.to_string(),
                link: Some(link),
            },
            data,
        )
    }
}

fn absolute_link(site_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        path.to_string()
    } else {
        format!("{site_url}/{}", path.trim_start_matches('/'))
    }
}

/// Who a notification goes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    User(UserId),
    /// The owner of a restaurant.
    Restaurant(RestaurantId),
    Segment(Segment),
}

impl Target {
    /// Pick the target by priority: user, then restaurant, then segment.
    #[must_use]
    pub fn select(
        user_id: Option<String>,
        restaurant_id: Option<String>,
        segment: Option<Segment>,
    ) -> Option<Self> {
        let present = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        present(user_id)
            .map(|id| Self::User(UserId::new(id)))
            .or_else(|| present(restaurant_id).map(|id| Self::Restaurant(RestaurantId::new(id))))
            .or_else(|| segment.map(Self::Segment))
    }
}

/// Whether a customer belongs to `segment` at `now`.
#[must_use]
pub fn in_segment(stats: &CustomerStats, segment: Segment, now: chrono::DateTime<Utc>) -> bool {
    match segment {
        Segment::Vip => {
            stats.total_spent >= Lira::from_kurus(Segment::VIP_SPEND_THRESHOLD_TL * 100)
        }
        Segment::Loyal => stats.order_count >= Segment::LOYAL_ORDER_THRESHOLD,
        Segment::Inactive => {
            stats.order_count > 0
                && stats.last_order_at < now - Duration::days(Segment::INACTIVE_DAYS)
        }
        Segment::All => true,
    }
}

/// Result of a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub success_count: usize,
    pub failure_count: usize,
}

/// Resolves targets and fans messages out to their devices.
#[derive(Clone)]
pub struct NotificationService {
    messenger: Option<Arc<dyn PushMessenger>>,
    tokens: Arc<dyn TokenStore>,
    restaurants: Arc<dyn RestaurantStore>,
    orders: Arc<dyn OrderStore>,
    site_url: String,
}

impl NotificationService {
    #[must_use]
    pub fn new(
        messenger: Option<Arc<dyn PushMessenger>>,
        tokens: Arc<dyn TokenStore>,
        restaurants: Arc<dyn RestaurantStore>,
        orders: Arc<dyn OrderStore>,
        site_url: impl Into<String>,
    ) -> Self {
        Self {
            messenger,
            tokens,
            restaurants,
            orders,
            site_url: site_url.into(),
        }
    }

    /// The push messenger, if configured.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ServiceUnavailable` if messaging is not configured.
    pub fn ensure_configured(&self) -> Result<&Arc<dyn PushMessenger>, AppError> {
        self.messenger.as_ref().ok_or_else(|| {
            AppError::ServiceUnavailable("Bildirim servisi yapılandırılmamış".to_string())
        })
    }

    /// Validate a send request and dispatch it.
    ///
    /// # Errors
    ///
    /// - `AppError::ServiceUnavailable` if messaging is not configured
    /// - `AppError::BadRequest` for an unknown kind, a payload that does not
    ///   fit its kind, or a missing target
    /// - `AppError::Database` if token lookup or deactivation fails
    #[instrument(skip(self, request), fields(kind = %request.kind))]
    pub async fn send(&self, request: SendNotificationRequest) -> Result<DispatchReport, AppError> {
        let messenger = self.ensure_configured()?;

        let kind: NotificationKind = request
            .kind
            .parse()
            .map_err(|_| AppError::BadRequest("Geçersiz bildirim türü".to_string()))?;
        let payload = NotificationPayload::parse(kind, request.data).map_err(|e| {
            tracing::debug!(error = %e, "Notification payload rejected");
            AppError::BadRequest("Geçersiz bildirim verisi".to_string())
        })?;
        let target = Target::select(request.user_id, request.restaurant_id, request.segment)
            .ok_or_else(|| {
                AppError::BadRequest(
                    "userId, restaurantId veya segment belirtilmelidir".to_string(),
                )
            })?;

        let tokens = self.resolve_tokens(&target).await?;
        if tokens.is_empty() {
            tracing::info!(?target, "No active devices for notification target");
            return Ok(DispatchReport {
                success: true,
                message: Some(NO_TARGET_MESSAGE),
                success_count: 0,
                failure_count: 0,
            });
        }

        let (notification, data) = payload.display(&self.site_url);
        let messages: Vec<PushMessage> = tokens
            .into_iter()
            .map(|device| PushMessage {
                token: device.token,
                notification: notification.clone(),
                data: data.clone(),
            })
            .collect();

        let results = join_all(messages.iter().map(|m| messenger.send(m))).await;

        // Only tokens the API reports as unregistered are deactivated; auth
        // and transport failures leave the devices active.
        let mut failure_count = 0;
        let mut unregistered = Vec::new();
        for (message, result) in messages.iter().zip(results) {
            if let Err(e) = result {
                failure_count += 1;
                if e.is_unregistered_token() {
                    tracing::warn!(error = %e, "Push token unregistered, deactivating");
                    unregistered.push(message.token.clone());
                } else {
                    tracing::warn!(error = %e, "Push delivery failed");
                }
            }
        }

        if !unregistered.is_empty() {
            self.tokens.deactivate(&unregistered, Utc::now()).await?;
        }

        let report = DispatchReport {
            success: true,
            message: None,
            success_count: messages.len() - failure_count,
            failure_count,
        };
        tracing::info!(
            ?target,
            success_count = report.success_count,
            failure_count = report.failure_count,
            "Notification dispatched"
        );
        Ok(report)
    }

    /// Active tokens for `target`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if a lookup fails.
    pub async fn resolve_tokens(&self, target: &Target) -> Result<Vec<DeviceToken>, AppError> {
        let tokens = match target {
            Target::User(user_id) => {
                self.tokens
                    .active_for_users(std::slice::from_ref(user_id))
                    .await?
            }
            Target::Restaurant(restaurant_id) => {
                match self.restaurants.get(restaurant_id).await? {
                    Some(restaurant) => {
                        self.tokens
                            .active_for_users(std::slice::from_ref(&restaurant.owner_id))
                            .await?
                    }
                    None => Vec::new(),
                }
            }
            Target::Segment(Segment::All) => self.tokens.all_active().await?,
            Target::Segment(segment) => {
                let now = Utc::now();
                let users: Vec<UserId> = self
                    .orders
                    .customer_stats()
                    .await?
                    .into_iter()
                    .filter(|stats| in_segment(stats, *segment, now))
                    .map(|stats| stats.user_id)
                    .collect();
                if users.is_empty() {
                    Vec::new()
                } else {
                    self.tokens.active_for_users(&users).await?
                }
            }
        };
        Ok(tokens)
    }

    /// Register a device token for a user.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` on blank fields, or
    /// `AppError::Database` if the upsert fails.
    #[instrument(skip(self, token))]
    pub async fn register_token(
        &self,
        user_id: &str,
        token: &str,
        platform: Option<&str>,
    ) -> Result<DeviceToken, AppError> {
        if user_id.trim().is_empty() || token.trim().is_empty() {
            return Err(AppError::BadRequest("userId ve token gereklidir".to_string()));
        }
        let platform = platform.map(str::trim).filter(|p| !p.is_empty());
        let device = self
            .tokens
            .upsert(&UserId::new(user_id.trim()), token.trim(), platform, Utc::now())
            .await?;
        tracing::info!(token_id = %device.id, "Device token registered");
        Ok(device)
    }

    /// Deactivate a device token. Returns whether it was active.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` on a blank token, or
    /// `AppError::Database` if the update fails.
    pub async fn unregister_token(&self, token: &str) -> Result<bool, AppError> {
        if token.trim().is_empty() {
            return Err(AppError::BadRequest("token gereklidir".to_string()));
        }
        let changed = self
            .tokens
            .deactivate(&[token.trim().to_string()], Utc::now())
            .await?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::db::MemoryStore;
    use crate::services::fcm::FcmError;

    /// Fails every token listed in `failing`. With `auth_outage` set, every
    /// send fails at the token exchange instead.
    #[derive(Default)]
    struct RecordingMessenger {
        failing: Vec<String>,
        auth_outage: bool,
        sent: Mutex<Vec<PushMessage>>,
    }

    #[async_trait]
    impl PushMessenger for RecordingMessenger {
        async fn send(&self, message: &PushMessage) -> Result<String, FcmError> {
            self.sent
                .lock()
                .expect("lock")
                .push(message.clone());
            if self.auth_outage {
                return Err(FcmError::Auth {
                    status: 503,
                    message: "backend unavailable".to_string(),
                });
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

    fn service(store: &MemoryStore, messenger: Option<Arc<dyn PushMessenger>>) -> NotificationService {
        NotificationService::new(
            messenger,
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            "https://neyisek.com",
        )
    }

    fn request(value: serde_json::Value) -> SendNotificationRequest {
        serde_json::from_value(value).expect("request")
    }

    #[test]
    fn test_payload_must_fit_kind() {
        let ok = NotificationPayload::parse(
            NotificationKind::OrderUpdate,
            json!({ "orderId": "o1", "status": "preparing" }),
        );
        assert!(ok.is_ok());

        let wrong = NotificationPayload::parse(
            NotificationKind::OrderUpdate,
            json!({ "title": "Kampanya", "message": "%20 indirim" }),
        );
        assert!(wrong.is_err());
    }

    #[test]
    fn test_display_mapping() {
        let payload = NotificationPayload::OrderUpdate(OrderUpdateData {
            order_id: OrderId::new("o1"),
            status: OrderStatus::Delivering,
            restaurant_name: None,
        });
        let (display, data) = payload.display("https://neyisek.com");
        assert_eq!(display.title, "Sipariş Durumu Güncellendi");
        assert_eq!(display.link.as_deref(), Some("https://neyisek.com/orders/o1"));
        assert_eq!(data.get("type").map(String::as_str), Some("order_update"));
        assert_eq!(data.get("orderId").map(String::as_str), Some("o1"));
    }

    #[test]
    fn test_target_priority() {
        assert_eq!(
            Target::select(Some("u1".into()), Some("r1".into()), Some(Segment::All)),
            Some(Target::User(UserId::new("u1")))
        );
        assert_eq!(
            Target::select(Some(String::new()), Some("r1".into()), None),
            Some(Target::Restaurant(RestaurantId::new("r1")))
        );
        assert_eq!(
            Target::select(None, None, Some(Segment::Vip)),
            Some(Target::Segment(Segment::Vip))
        );
        assert_eq!(Target::select(None, None, None), None);
    }

    #[test]
    fn test_segment_thresholds() {
        let now = Utc::now();
        let stats = |orders: u32, spent_tl: i64, days_ago: i64| CustomerStats {
            user_id: UserId::new("u"),
            order_count: orders,
            total_spent: Lira::from_kurus(spent_tl * 100),
            last_order_at: now - Duration::days(days_ago),
        };

        assert!(in_segment(&stats(1, 1000, 1), Segment::Vip, now));
        assert!(!in_segment(&stats(1, 999, 1), Segment::Vip, now));
        assert!(in_segment(&stats(10, 10, 1), Segment::Loyal, now));
        assert!(!in_segment(&stats(9, 10, 1), Segment::Loyal, now));
        assert!(in_segment(&stats(2, 10, 31), Segment::Inactive, now));
        assert!(!in_segment(&stats(2, 10, 29), Segment::Inactive, now));
    }

    #[tokio::test]
    async fn test_unconfigured_is_unavailable() {
        let store = MemoryStore::new();
        let svc = service(&store, None);
        let err = svc
            .send(request(json!({ "type": "bogus", "userId": "u1", "data": {} })))
            .await
            .expect_err("unconfigured");
        assert!(matches!(err, AppError::ServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_no_tokens_skips_messaging() {
        let store = MemoryStore::new();
        let messenger = Arc::new(RecordingMessenger::default());
        let svc = service(&store, Some(messenger.clone()));

        let report = svc
            .send(request(json!({
                "type": "promotion",
                "segment": "all",
                "data": { "title": "Kampanya", "message": "Bugün %20 indirim" }
            })))
            .await
            .expect("send");

        assert_eq!(report.message, Some(NO_TARGET_MESSAGE));
        assert_eq!(report.success_count, 0);
        assert!(messenger.sent.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn test_failed_tokens_are_deactivated() {
        let store = MemoryStore::new();
        let user = UserId::new("u1");
        for token in ["good", "stale"] {
            TokenStore::upsert(&store, &user, token, None, Utc::now())
                .await
                .expect("upsert");
        }
        let messenger = Arc::new(RecordingMessenger {
            failing: vec!["stale".to_string()],
            ..RecordingMessenger::default()
        });
        let svc = service(&store, Some(messenger.clone()));

        let report = svc
            .send(request(json!({
                "type": "delivery_update",
                "userId": "u1",
                "data": { "orderId": "o1", "estimatedMinutes": 15 }
            })))
            .await
            .expect("send");

        assert_eq!(report.success_count, 1);
        assert_eq!(report.failure_count, 1);

        let active: Vec<String> = store
            .active_for_users(&[user])
            .await
            .expect("tokens")
            .into_iter()
            .map(|t| t.token)
            .collect();
        assert_eq!(active, vec!["good".to_string()]);
    }

    #[tokio::test]
    async fn test_auth_failures_keep_tokens_active() {
        let store = MemoryStore::new();
        let user = UserId::new("u1");
        for token in ["phone", "tablet"] {
            TokenStore::upsert(&store, &user, token, None, Utc::now())
                .await
                .expect("upsert");
        }
        let messenger = Arc::new(RecordingMessenger {
            auth_outage: true,
            ..RecordingMessenger::default()
        });
        let svc = service(&store, Some(messenger.clone()));

        let report = svc
            .send(request(json!({
                "type": "promotion",
                "userId": "u1",
                "data": { "title": "Kampanya", "message": "%20 indirim" }
            })))
            .await
            .expect("send");

        assert_eq!(report.success_count, 0);
        assert_eq!(report.failure_count, 2);
        let active = store.active_for_users(&[user]).await.expect("tokens");
        assert_eq!(active.len(), 2);
    }

    #[tokio::test]
    async fn test_token_registration() {
        let store = MemoryStore::new();
        let svc = service(&store, None);

        assert!(matches!(
            svc.register_token("", "tok", None).await,
            Err(AppError::BadRequest(_))
        ));

        let device = svc
            .register_token("u1", "tok", Some("web"))
            .await
            .expect("register");
        assert!(device.active);
        assert!(svc.unregister_token("tok").await.expect("unregister"));
        assert!(!svc.unregister_token("tok").await.expect("unregister again"));
    }
}
