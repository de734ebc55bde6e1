//! In-memory backend used for local development and tests.
//!
//! A single `MemoryStore` implements every store trait. Clones share state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use neyisek_core::{CategoryId, Lira, OrderId, OrderStatus, RestaurantId, TokenId, UserId};

use super::{
    AnalyticsStore, CollectionCounts, OrderScope, OrderStore, RepositoryError, RestaurantStore,
    TokenStore, UserStore,
};
use crate::models::{
    AnalyticsEvent, Category, CustomerStats, DeviceToken, Order, Restaurant, User,
};

#[derive(Default)]
struct Collections {
    users: HashMap<UserId, User>,
    restaurants: HashMap<RestaurantId, Restaurant>,
    categories: HashMap<CategoryId, Category>,
    orders: HashMap<OrderId, Order>,
    tokens: Vec<DeviceToken>,
    analytics: Vec<AnalyticsEvent>,
}

/// Shared in-memory collections.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Collections>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Collections> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Row counts per collection.
    #[must_use]
    pub fn counts(&self) -> CollectionCounts {
        let c = self.lock();
        let len = |n: usize| i64::try_from(n).unwrap_or(i64::MAX);
        CollectionCounts {
            users: len(c.users.len()),
            restaurants: len(c.restaurants.len()),
            categories: len(c.categories.len()),
            orders: len(c.orders.len()),
            fcm_tokens: len(c.tokens.len()),
        }
    }

    /// Every recorded telemetry event, oldest first.
    #[must_use]
    pub fn analytics_events(&self) -> Vec<AnalyticsEvent> {
        self.lock().analytics.clone()
    }

    /// Every token including inactive ones.
    #[must_use]
    pub fn tokens(&self) -> Vec<DeviceToken> {
        self.lock().tokens.clone()
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert(&self, order: &Order) -> Result<(), RepositoryError> {
        let mut c = self.lock();
        if c.orders.contains_key(&order.id) {
            return Err(RepositoryError::Conflict("order already exists".to_string()));
        }
        c.orders.insert(order.id.clone(), order.clone());
        Ok(())
    }

    async fn get(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.lock().orders.get(id).cloned())
    }

    async fn list(&self, scope: &OrderScope, limit: u32) -> Result<Vec<Order>, RepositoryError> {
        let c = self.lock();
        let mut orders: Vec<Order> = c
            .orders
            .values()
            .filter(|order| scope.contains(order))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(orders)
    }

    async fn update_status(
        &self,
        id: &OrderId,
        from: OrderStatus,
        to: OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>, RepositoryError> {
        let mut c = self.lock();
        Ok(c.orders
            .get_mut(id)
            .filter(|order| order.status == from)
            .map(|order| {
                order.status = to;
                order.updated_at = now;
                order.clone()
            }))
    }

    async fn customer_stats(&self) -> Result<Vec<CustomerStats>, RepositoryError> {
        let c = self.lock();
        let mut stats: HashMap<&UserId, CustomerStats> = HashMap::new();

        for order in c.orders.values() {
            if order.status == OrderStatus::Cancelled {
                continue;
            }
            let Some(user_id) = order.user_id.as_ref() else {
                continue;
            };
            let entry = stats.entry(user_id).or_insert_with(|| CustomerStats {
                user_id: user_id.clone(),
                order_count: 0,
                total_spent: Lira::ZERO,
                last_order_at: order.created_at,
            });
            entry.order_count += 1;
            entry.total_spent = entry.total_spent.saturating_add(order.total_amount);
            entry.last_order_at = entry.last_order_at.max(order.created_at);
        }

        Ok(stats.into_values().collect())
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn upsert(
        &self,
        user_id: &UserId,
        token: &str,
        platform: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<DeviceToken, RepositoryError> {
        let mut c = self.lock();

        if let Some(existing) = c.tokens.iter_mut().find(|t| t.token == token) {
            existing.user_id = user_id.clone();
            existing.active = true;
            if let Some(platform) = platform {
                existing.platform = Some(platform.to_string());
            }
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let record = DeviceToken {
            id: TokenId::generate(),
            user_id: user_id.clone(),
            token: token.to_string(),
            active: true,
            platform: platform.map(str::to_string),
            created_at: now,
            updated_at: now,
        };
        c.tokens.push(record.clone());
        Ok(record)
    }

    async fn active_for_users(
        &self,
        user_ids: &[UserId],
    ) -> Result<Vec<DeviceToken>, RepositoryError> {
        Ok(self
            .lock()
            .tokens
            .iter()
            .filter(|t| t.active && user_ids.contains(&t.user_id))
            .cloned()
            .collect())
    }

    async fn all_active(&self) -> Result<Vec<DeviceToken>, RepositoryError> {
        Ok(self
            .lock()
            .tokens
            .iter()
            .filter(|t| t.active)
            .cloned()
            .collect())
    }

    async fn deactivate(
        &self,
        tokens: &[String],
        now: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        let mut c = self.lock();
        let mut changed = 0;
        for record in c
            .tokens
            .iter_mut()
            .filter(|t| t.active && tokens.contains(&t.token))
        {
            record.active = false;
            record.updated_at = now;
            changed += 1;
        }
        Ok(changed)
    }
}

#[async_trait]
impl RestaurantStore for MemoryStore {
    async fn upsert(&self, restaurant: &Restaurant) -> Result<(), RepositoryError> {
        self.lock()
            .restaurants
            .insert(restaurant.id.clone(), restaurant.clone());
        Ok(())
    }

    async fn get(&self, id: &RestaurantId) -> Result<Option<Restaurant>, RepositoryError> {
        Ok(self.lock().restaurants.get(id).cloned())
    }

    async fn list_active(
        &self,
        category: Option<&CategoryId>,
    ) -> Result<Vec<Restaurant>, RepositoryError> {
        let c = self.lock();
        let mut restaurants: Vec<Restaurant> = c
            .restaurants
            .values()
            .filter(|r| r.is_active)
            .filter(|r| category.is_none_or(|cat| r.category_id.as_ref() == Some(cat)))
            .cloned()
            .collect();
        restaurants.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(restaurants)
    }

    async fn upsert_category(&self, category: &Category) -> Result<(), RepositoryError> {
        self.lock()
            .categories
            .insert(category.id.clone(), category.clone());
        Ok(())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let mut categories: Vec<Category> = self.lock().categories.values().cloned().collect();
        categories.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(categories)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn upsert(&self, user: &User) -> Result<(), RepositoryError> {
        self.lock().users.insert(user.uid.clone(), user.clone());
        Ok(())
    }

    async fn get(&self, uid: &UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.lock().users.get(uid).cloned())
    }
}

#[async_trait]
impl AnalyticsStore for MemoryStore {
    async fn insert(&self, event: &AnalyticsEvent) -> Result<(), RepositoryError> {
        self.lock().analytics.push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use neyisek_core::{PaymentMethod, ProductId};

    use super::*;
    use crate::models::{CustomerInfo, OrderItem};

    fn order(user: Option<&str>, restaurant: &str, total_kurus: i64, at: DateTime<Utc>) -> Order {
        Order {
            id: OrderId::generate(),
            user_id: user.map(UserId::new),
            restaurant_id: RestaurantId::new(restaurant),
            items: vec![OrderItem {
                product_id: ProductId::new("p1"),
                name: "Adana Kebap".to_string(),
                price: Lira::from_kurus(total_kurus),
                quantity: 1,
                notes: None,
            }],
            status: OrderStatus::Pending,
            subtotal: Lira::from_kurus(total_kurus),
            delivery_fee: Lira::ZERO,
            total_amount: Lira::from_kurus(total_kurus),
            customer_info: CustomerInfo {
                name: "Ayşe".to_string(),
                phone: "05551112233".to_string(),
                email: None,
            },
            delivery_address: None,
            payment_method: PaymentMethod::Cash,
            notes: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[tokio::test]
    async fn test_list_is_scoped_and_newest_first() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let older = order(Some("u1"), "r1", 10_000, now - Duration::minutes(5));
        let newer = order(Some("u1"), "r2", 20_000, now);
        let other = order(Some("u2"), "r1", 5_000, now);
        for o in [&older, &newer, &other] {
            OrderStore::insert(&store, o).await.unwrap();
        }

        let mine = store
            .list(&OrderScope::User(UserId::new("u1")), 50)
            .await
            .unwrap();
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].id, newer.id);
        assert_eq!(mine[1].id, older.id);

        let r1 = store
            .list(&OrderScope::Restaurant(RestaurantId::new("r1")), 1)
            .await
            .unwrap();
        assert_eq!(r1.len(), 1);
        assert_eq!(r1[0].id, other.id);
    }

    #[tokio::test]
    async fn test_customer_stats_skip_cancelled_and_guests() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let kept = order(Some("u1"), "r1", 60_000, now);
        let cancelled = order(Some("u1"), "r1", 90_000, now);
        let guest = order(None, "r1", 10_000, now);
        for o in [&kept, &cancelled, &guest] {
            OrderStore::insert(&store, o).await.unwrap();
        }
        store
            .update_status(&cancelled.id, OrderStatus::Pending, OrderStatus::Cancelled, now)
            .await
            .unwrap();

        let stats = store.customer_stats().await.unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].order_count, 1);
        assert_eq!(stats[0].total_spent, Lira::from_kurus(60_000));
    }

    #[tokio::test]
    async fn test_update_status_requires_expected_status() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let placed = order(Some("u1"), "r1", 20_000, now);
        OrderStore::insert(&store, &placed).await.unwrap();

        let delivered = store
            .update_status(&placed.id, OrderStatus::Pending, OrderStatus::Delivered, now)
            .await
            .unwrap();
        assert_eq!(delivered.map(|o| o.status), Some(OrderStatus::Delivered));

        // A writer that still believes the order is pending loses
        let stale = store
            .update_status(&placed.id, OrderStatus::Pending, OrderStatus::Cancelled, now)
            .await
            .unwrap();
        assert!(stale.is_none());
        let stored = OrderStore::get(&store, &placed.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Delivered);
    }

    #[tokio::test]
    async fn test_token_upsert_reactivates_and_reassigns() {
        let store = MemoryStore::new();
        let now = Utc::now();
        TokenStore::upsert(&store, &UserId::new("u1"), "tok", Some("web"), now)
            .await
            .unwrap();
        assert_eq!(store.deactivate(&["tok".to_string()], now).await.unwrap(), 1);
        assert!(store.all_active().await.unwrap().is_empty());

        let record = TokenStore::upsert(&store, &UserId::new("u2"), "tok", None, now)
            .await
            .unwrap();
        assert!(record.active);
        assert_eq!(record.user_id, UserId::new("u2"));
        assert_eq!(record.platform.as_deref(), Some("web"));
        assert_eq!(store.tokens().len(), 1);
    }
}
