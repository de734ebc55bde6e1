//! Persistence for the NeYisek collections.
//!
//! # Collections
//!
//! - `users` - Profiles keyed by identity-provider uid
//! - `restaurants` - Restaurant listings and their owner account
//! - `categories` - Cuisine categories
//! - `orders` - Orders with item snapshots (JSONB)
//! - `fcm_tokens` - Push messaging device tokens (soft-deleted)
//! - `analytics_events` - Client telemetry
//!
//! Every collection is accessed through an object-safe trait so handlers can
//! run against `PostgreSQL` in production and the in-memory backend in
//! development and tests.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p neyisek-cli -- migrate
//! ```

pub mod analytics;
pub mod memory;
pub mod orders;
pub mod restaurants;
pub mod tokens;
pub mod users;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use neyisek_core::{CategoryId, OrderId, OrderStatus, RestaurantId, UserId};

use crate::models::{
    AnalyticsEvent, Category, CustomerStats, DeviceToken, Order, Restaurant, User,
};

pub use analytics::PgAnalyticsRepository;
pub use memory::MemoryStore;
pub use orders::PgOrderRepository;
pub use restaurants::PgRestaurantRepository;
pub use tokens::PgTokenRepository;
pub use users::PgUserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate token).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Which orders a query or live subscription covers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OrderScope {
    /// Every order (admin panel).
    All,
    /// Orders placed by one customer.
    User(UserId),
    /// Orders received by one restaurant.
    Restaurant(RestaurantId),
}

impl OrderScope {
    /// Whether `order` falls inside this scope.
    #[must_use]
    pub fn contains(&self, order: &Order) -> bool {
        match self {
            Self::All => true,
            Self::User(user_id) => order.user_id.as_ref() == Some(user_id),
            Self::Restaurant(restaurant_id) => &order.restaurant_id == restaurant_id,
        }
    }
}

/// Order persistence.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert a new order.
    async fn insert(&self, order: &Order) -> Result<(), RepositoryError>;

    /// Get an order by id.
    async fn get(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Newest orders in scope, newest first.
    async fn list(&self, scope: &OrderScope, limit: u32) -> Result<Vec<Order>, RepositoryError>;

    /// Move an order from `from` to `to`, returning the updated order.
    ///
    /// Returns `None` if the order does not exist or its status is no
    /// longer `from`.
    async fn update_status(
        &self,
        id: &OrderId,
        from: OrderStatus,
        to: OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>, RepositoryError>;

    /// Aggregates per registered customer, excluding cancelled orders.
    async fn customer_stats(&self) -> Result<Vec<CustomerStats>, RepositoryError>;
}

/// Push messaging token persistence.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Register a token for a user, reactivating it if it already exists.
    async fn upsert(
        &self,
        user_id: &UserId,
        token: &str,
        platform: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<DeviceToken, RepositoryError>;

    /// Active tokens belonging to any of `user_ids`.
    async fn active_for_users(
        &self,
        user_ids: &[UserId],
    ) -> Result<Vec<DeviceToken>, RepositoryError>;

    /// Every active token.
    async fn all_active(&self) -> Result<Vec<DeviceToken>, RepositoryError>;

    /// Mark tokens inactive. Returns how many rows changed.
    async fn deactivate(&self, tokens: &[String], now: DateTime<Utc>)
    -> Result<u64, RepositoryError>;
}

/// Restaurant and category persistence.
#[async_trait]
pub trait RestaurantStore: Send + Sync {
    /// Insert or replace a restaurant.
    async fn upsert(&self, restaurant: &Restaurant) -> Result<(), RepositoryError>;

    /// Get a restaurant by id.
    async fn get(&self, id: &RestaurantId) -> Result<Option<Restaurant>, RepositoryError>;

    /// Active restaurants, optionally filtered by category, sorted by name.
    async fn list_active(
        &self,
        category: Option<&CategoryId>,
    ) -> Result<Vec<Restaurant>, RepositoryError>;

    /// Insert or replace a category.
    async fn upsert_category(&self, category: &Category) -> Result<(), RepositoryError>;

    /// All categories by sort order.
    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError>;
}

/// User profile persistence.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert or replace a user.
    async fn upsert(&self, user: &User) -> Result<(), RepositoryError>;

    /// Get a user by uid.
    async fn get(&self, uid: &UserId) -> Result<Option<User>, RepositoryError>;
}

/// Telemetry sink persistence.
#[async_trait]
pub trait AnalyticsStore: Send + Sync {
    /// Append an event.
    async fn insert(&self, event: &AnalyticsEvent) -> Result<(), RepositoryError>;
}

/// Row counts per collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionCounts {
    pub users: i64,
    pub restaurants: i64,
    pub categories: i64,
    pub orders: i64,
    pub fcm_tokens: i64,
}

/// The set of repositories the application runs against.
#[derive(Clone)]
pub struct Repositories {
    pub orders: Arc<dyn OrderStore>,
    pub tokens: Arc<dyn TokenStore>,
    pub restaurants: Arc<dyn RestaurantStore>,
    pub users: Arc<dyn UserStore>,
    pub analytics: Arc<dyn AnalyticsStore>,
    backend: Backend,
}

#[derive(Clone)]
enum Backend {
    Postgres(PgPool),
    Memory(MemoryStore),
}

impl Repositories {
    /// Repositories backed by `PostgreSQL`.
    #[must_use]
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            orders: Arc::new(PgOrderRepository::new(pool.clone())),
            tokens: Arc::new(PgTokenRepository::new(pool.clone())),
            restaurants: Arc::new(PgRestaurantRepository::new(pool.clone())),
            users: Arc::new(PgUserRepository::new(pool.clone())),
            analytics: Arc::new(PgAnalyticsRepository::new(pool.clone())),
            backend: Backend::Postgres(pool),
        }
    }

    /// Repositories backed by one shared in-memory store.
    #[must_use]
    pub fn in_memory(store: MemoryStore) -> Self {
        Self {
            orders: Arc::new(store.clone()),
            tokens: Arc::new(store.clone()),
            restaurants: Arc::new(store.clone()),
            users: Arc::new(store.clone()),
            analytics: Arc::new(store.clone()),
            backend: Backend::Memory(store),
        }
    }

    /// Check that the backend is reachable.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the database does not answer.
    pub async fn ping(&self) -> Result<(), RepositoryError> {
        match &self.backend {
            Backend::Postgres(pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
                Ok(())
            }
            Backend::Memory(_) => Ok(()),
        }
    }

    /// Count rows in every collection.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a count query fails.
    pub async fn counts(&self) -> Result<CollectionCounts, RepositoryError> {
        match &self.backend {
            Backend::Postgres(pool) => {
                let count = |table: &'static str| {
                    let pool = pool.clone();
                    async move {
                        let sql = format!("SELECT COUNT(*) FROM {table}");
                        sqlx::query_scalar::<_, i64>(&sql).fetch_one(&pool).await
                    }
                };
                Ok(CollectionCounts {
                    users: count("users").await?,
                    restaurants: count("restaurants").await?,
                    categories: count("categories").await?,
                    orders: count("orders").await?,
                    fcm_tokens: count("fcm_tokens").await?,
                })
            }
            Backend::Memory(store) => Ok(store.counts()),
        }
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Map a unique violation to `RepositoryError::Conflict`.
fn map_unique_violation(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}
