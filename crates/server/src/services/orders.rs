//! Order placement and status changes.
//!
//! All order writes go through [`OrderService`] so that every change is
//! published on the [`OrderFeed`] for live watchers.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::instrument;

use neyisek_core::{Lira, OrderId, OrderStatus, PaymentMethod, RestaurantId, UserId};

use crate::db::{OrderScope, OrderStore};
use crate::error::AppError;
use crate::models::{CustomerInfo, NewOrder, Order, OrderItem};
use crate::realtime::{ChangeEvent, DEFAULT_WINDOW, OrderFeed};

const ORDER_NOT_FOUND: &str = "Sipariş bulunamadı";
const INVALID_PRICE: &str = "Geçersiz ürün fiyatı";
const STATUS_WRITE_ATTEMPTS: usize = 3;

fn transition_error(from: OrderStatus, to: OrderStatus) -> AppError {
    AppError::BadRequest(format!(
        "Sipariş durumu '{}' iken '{}' yapılamaz",
        from.label(),
        to.label()
    ))
}

/// Order placement body as sent by the checkout page.
///
/// Fields are optional here so that each missing field gets its own message.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub restaurant_id: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    pub customer_info: Option<CustomerInfoInput>,
    pub delivery_address: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
    pub delivery_fee: Option<Lira>,
    pub total_amount: Option<Lira>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfoInput {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl CreateOrderRequest {
    /// Check the body and turn it into a [`NewOrder`].
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` with a customer-facing message naming
    /// the first problem found.
    pub fn validate(self) -> Result<NewOrder, AppError> {
        let restaurant_id = non_blank(self.restaurant_id)
            .ok_or_else(|| AppError::BadRequest("Restoran bilgisi eksik".to_string()))?;

        if self.items.is_empty() {
            return Err(AppError::BadRequest(
                "Sipariş en az bir ürün içermelidir".to_string(),
            ));
        }
        if self.items.iter().any(|item| item.quantity == 0) {
            return Err(AppError::BadRequest("Geçersiz ürün adedi".to_string()));
        }
        if self.items.iter().any(|item| item.price.is_negative()) {
            return Err(AppError::BadRequest(INVALID_PRICE.to_string()));
        }
        let subtotal = OrderItem::subtotal(&self.items)
            .ok_or_else(|| AppError::BadRequest(INVALID_PRICE.to_string()))?;

        let info = self
            .customer_info
            .ok_or_else(|| AppError::BadRequest("Müşteri bilgileri eksik".to_string()))?;
        let name = non_blank(info.name)
            .ok_or_else(|| AppError::BadRequest("Müşteri adı gerekli".to_string()))?;
        let phone = non_blank(info.phone)
            .ok_or_else(|| AppError::BadRequest("Telefon numarası gerekli".to_string()))?;

        let delivery_fee = self.delivery_fee.unwrap_or(Lira::ZERO);
        if delivery_fee.is_negative() {
            return Err(AppError::BadRequest(
                "Geçersiz teslimat ücreti".to_string(),
            ));
        }

        let total_amount = self
            .total_amount
            .filter(Lira::is_positive)
            .ok_or_else(|| AppError::BadRequest("Geçersiz sipariş tutarı".to_string()))?;

        Ok(NewOrder {
            user_id: non_blank(self.user_id).map(UserId::new),
            restaurant_id: RestaurantId::new(restaurant_id),
            items: self.items,
            customer_info: CustomerInfo {
                name,
                phone,
                email: non_blank(info.email),
            },
            delivery_address: non_blank(self.delivery_address),
            payment_method: self.payment_method.unwrap_or_default(),
            notes: non_blank(self.notes),
            subtotal,
            delivery_fee,
            total_amount,
        })
    }
}

/// Writes orders and publishes the changes.
#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrderStore>,
    feed: OrderFeed,
}

impl OrderService {
    #[must_use]
    pub fn new(orders: Arc<dyn OrderStore>, feed: OrderFeed) -> Self {
        Self { orders, feed }
    }

    /// The feed this service publishes on.
    #[must_use]
    pub const fn feed(&self) -> &OrderFeed {
        &self.feed
    }

    /// Validate and store a new order.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for an invalid body, or
    /// `AppError::Database` if the insert fails.
    #[instrument(skip(self, request))]
    pub async fn create(&self, request: CreateOrderRequest) -> Result<Order, AppError> {
        let order = request.validate()?.into_order(Utc::now());
        self.orders.insert(&order).await?;

        tracing::info!(
            order_id = %order.id,
            restaurant_id = %order.restaurant_id,
            total = %order.total_amount,
            "Order placed"
        );
        self.feed.publish(ChangeEvent::Added(order.clone()));
        Ok(order)
    }

    /// Newest orders in `scope`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn list(&self, scope: &OrderScope) -> Result<Vec<Order>, AppError> {
        Ok(self.orders.list(scope, DEFAULT_WINDOW).await?)
    }

    /// Get one order.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown id.
    pub async fn get(&self, id: &OrderId) -> Result<Order, AppError> {
        self.orders
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(ORDER_NOT_FOUND.to_string()))
    }

    /// Move an order to `status`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown id and
    /// `AppError::BadRequest` if the transition is not allowed.
    #[instrument(skip(self), fields(order_id = %id, status = %status))]
    pub async fn update_status(&self, id: &OrderId, status: OrderStatus) -> Result<Order, AppError> {
        let mut current = self.get(id).await?;
        for _ in 0..STATUS_WRITE_ATTEMPTS {
            if !current.status.can_transition_to(status) {
                return Err(transition_error(current.status, status));
            }

            if let Some(updated) = self
                .orders
                .update_status(id, current.status, status, Utc::now())
                .await?
            {
                tracing::info!(from = %current.status, "Order status changed");
                self.feed.publish(ChangeEvent::Modified(updated.clone()));
                return Ok(updated);
            }

            // Another writer changed the order after it was read
            let seen = current.status;
            current = self.get(id).await?;
            tracing::warn!(%seen, latest = %current.status, "Order status changed concurrently");
        }

        Err(transition_error(current.status, status))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::DateTime;
    use neyisek_core::ProductId;

    use super::*;
    use crate::db::{MemoryStore, RepositoryError};
    use crate::models::CustomerStats;

    /// Store where another writer moves the order right after it is read.
    struct RacingStore {
        inner: MemoryStore,
        interloper: Mutex<Option<OrderStatus>>,
    }

    #[async_trait]
    impl OrderStore for RacingStore {
        async fn insert(&self, order: &Order) -> Result<(), RepositoryError> {
            OrderStore::insert(&self.inner, order).await
        }

        async fn get(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
            let found = OrderStore::get(&self.inner, id).await?;
            let next = self.interloper.lock().unwrap().take();
            if let (Some(order), Some(next)) = (&found, next) {
                OrderStore::update_status(&self.inner, id, order.status, next, Utc::now())
                    .await?;
            }
            Ok(found)
        }

        async fn list(
            &self,
            scope: &OrderScope,
            limit: u32,
        ) -> Result<Vec<Order>, RepositoryError> {
            OrderStore::list(&self.inner, scope, limit).await
        }

        async fn update_status(
            &self,
            id: &OrderId,
            from: OrderStatus,
            to: OrderStatus,
            now: DateTime<Utc>,
        ) -> Result<Option<Order>, RepositoryError> {
            OrderStore::update_status(&self.inner, id, from, to, now).await
        }

        async fn customer_stats(&self) -> Result<Vec<CustomerStats>, RepositoryError> {
            OrderStore::customer_stats(&self.inner).await
        }
    }

    fn service() -> OrderService {
        let store: Arc<dyn OrderStore> = Arc::new(MemoryStore::new());
        let feed = OrderFeed::new(Arc::clone(&store));
        OrderService::new(store, feed)
    }

    fn request() -> CreateOrderRequest {
        CreateOrderRequest {
            restaurant_id: Some("r1".to_string()),
            items: vec![OrderItem {
                product_id: ProductId::new("p1"),
                name: "Adana Kebap".to_string(),
                price: Lira::from_kurus(25000),
                quantity: 1,
                notes: None,
            }],
            customer_info: Some(CustomerInfoInput {
                name: Some("Ayşe".to_string()),
                phone: Some("05551112233".to_string()),
                email: None,
            }),
            total_amount: Some(Lira::from_kurus(25000)),
            ..CreateOrderRequest::default()
        }
    }

    fn bad_request_message(result: Result<NewOrder, AppError>) -> String {
        match result {
            Err(AppError::BadRequest(message)) => message,
            other => panic!("expected bad request, got {other:?}"),
        }
    }

    #[test]
    fn test_validation_messages() {
        let mut req = request();
        req.restaurant_id = Some("  ".to_string());
        assert_eq!(bad_request_message(req.validate()), "Restoran bilgisi eksik");

        let mut req = request();
        req.items.clear();
        assert_eq!(
            bad_request_message(req.validate()),
            "Sipariş en az bir ürün içermelidir"
        );

        let mut req = request();
        req.customer_info = None;
        assert_eq!(bad_request_message(req.validate()), "Müşteri bilgileri eksik");

        let mut req = request();
        req.customer_info = Some(CustomerInfoInput {
            name: Some("Ayşe".to_string()),
            ..CustomerInfoInput::default()
        });
        assert_eq!(bad_request_message(req.validate()), "Telefon numarası gerekli");

        let mut req = request();
        req.total_amount = Some(Lira::ZERO);
        assert_eq!(bad_request_message(req.validate()), "Geçersiz sipariş tutarı");

        let mut req = request();
        req.items[0].quantity = 0;
        assert_eq!(bad_request_message(req.validate()), "Geçersiz ürün adedi");

        let mut req = request();
        req.items[0].price = Lira::from_kurus(-50000);
        assert_eq!(bad_request_message(req.validate()), "Geçersiz ürün fiyatı");

        let mut req = request();
        req.items[0].price = Lira::new(rust_decimal::Decimal::MAX);
        req.items[0].quantity = 100;
        assert_eq!(bad_request_message(req.validate()), "Geçersiz ürün fiyatı");

        let mut req = request();
        req.delivery_fee = Some(Lira::from_kurus(-100));
        assert_eq!(bad_request_message(req.validate()), "Geçersiz teslimat ücreti");
    }

    #[test]
    fn test_defaults_applied() {
        let order = request().validate().expect("valid");
        assert_eq!(order.payment_method, PaymentMethod::Cash);
        assert_eq!(order.delivery_fee, Lira::ZERO);
        assert_eq!(order.subtotal, Lira::from_kurus(25000));
        assert!(order.user_id.is_none());
    }

    #[tokio::test]
    async fn test_create_publishes_added() {
        let svc = service();
        let mut sub = svc
            .feed()
            .subscribe(OrderScope::All, DEFAULT_WINDOW)
            .await
            .expect("subscribe");

        let order = svc.create(request()).await.expect("create");
        let change = sub.next_change().await.expect("change");
        assert_eq!(change, ChangeEvent::Added(order.clone()));
        assert_eq!(svc.get(&order.id).await.expect("get"), order);
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let svc = service();
        let order = svc.create(request()).await.expect("create");

        let updated = svc
            .update_status(&order.id, OrderStatus::Confirmed)
            .await
            .expect("confirm");
        assert_eq!(updated.status, OrderStatus::Confirmed);

        svc.update_status(&order.id, OrderStatus::Delivered)
            .await
            .expect("deliver");
        let err = svc
            .update_status(&order.id, OrderStatus::Cancelled)
            .await
            .expect_err("terminal");
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = svc
            .update_status(&OrderId::new("missing"), OrderStatus::Confirmed)
            .await
            .expect_err("unknown");
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_concurrent_terminal_status_is_not_overwritten() {
        let store = Arc::new(RacingStore {
            inner: MemoryStore::new(),
            interloper: Mutex::new(None),
        });
        let orders: Arc<dyn OrderStore> = Arc::clone(&store) as Arc<dyn OrderStore>;
        let svc = OrderService::new(Arc::clone(&orders), OrderFeed::new(orders));
        let order = svc.create(request()).await.expect("create");

        // Delivered lands between this request's read and its write
        *store.interloper.lock().unwrap() = Some(OrderStatus::Delivered);
        let err = svc
            .update_status(&order.id, OrderStatus::Cancelled)
            .await
            .expect_err("stale write");
        match err {
            AppError::BadRequest(message) => assert!(message.contains("Teslim")),
            other => panic!("expected bad request, got {other:?}"),
        }

        let stored = svc.get(&order.id).await.expect("get");
        assert_eq!(stored.status, OrderStatus::Delivered);
    }

    #[tokio::test]
    async fn test_concurrent_non_terminal_change_is_retried() {
        let store = Arc::new(RacingStore {
            inner: MemoryStore::new(),
            interloper: Mutex::new(None),
        });
        let orders: Arc<dyn OrderStore> = Arc::clone(&store) as Arc<dyn OrderStore>;
        let svc = OrderService::new(Arc::clone(&orders), OrderFeed::new(orders));
        let order = svc.create(request()).await.expect("create");

        *store.interloper.lock().unwrap() = Some(OrderStatus::Confirmed);
        let updated = svc
            .update_status(&order.id, OrderStatus::Preparing)
            .await
            .expect("retried write");
        assert_eq!(updated.status, OrderStatus::Preparing);
    }
}
