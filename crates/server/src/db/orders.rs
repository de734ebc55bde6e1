//! Order repository for `PostgreSQL`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;

use neyisek_core::{Lira, OrderId, OrderStatus, PaymentMethod, RestaurantId, UserId};

use super::{OrderScope, OrderStore, RepositoryError, map_unique_violation};
use crate::models::{CustomerInfo, CustomerStats, Order, OrderItem};

const ORDER_COLUMNS: &str = "id, user_id, restaurant_id, items, status, subtotal, delivery_fee, \
     total_amount, customer_info, delivery_address, payment_method, notes, created_at, updated_at";

/// Repository for the `orders` table.
#[derive(Clone)]
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: Option<UserId>,
    restaurant_id: RestaurantId,
    items: Json<Vec<OrderItem>>,
    status: String,
    subtotal: Decimal,
    delivery_fee: Decimal,
    total_amount: Decimal,
    customer_info: Json<CustomerInfo>,
    delivery_address: Option<String>,
    payment_method: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<OrderStatus>()
            .map_err(RepositoryError::DataCorruption)?;
        let payment_method = row
            .payment_method
            .parse::<PaymentMethod>()
            .map_err(RepositoryError::DataCorruption)?;

        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            restaurant_id: row.restaurant_id,
            items: row.items.0,
            status,
            subtotal: Lira::new(row.subtotal),
            delivery_fee: Lira::new(row.delivery_fee),
            total_amount: Lira::new(row.total_amount),
            customer_info: row.customer_info.0,
            delivery_address: row.delivery_address,
            payment_method,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct StatsRow {
    user_id: UserId,
    order_count: i64,
    total_spent: Decimal,
    last_order_at: DateTime<Utc>,
}

#[async_trait]
impl OrderStore for PgOrderRepository {
    async fn insert(&self, order: &Order) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO orders (id, user_id, restaurant_id, items, status, subtotal, delivery_fee,
                                total_amount, customer_info, delivery_address, payment_method,
                                notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ",
        )
        .bind(&order.id)
        .bind(order.user_id.as_ref())
        .bind(&order.restaurant_id)
        .bind(Json(&order.items))
        .bind(order.status.as_str())
        .bind(order.subtotal.amount())
        .bind(order.delivery_fee.amount())
        .bind(order.total_amount.amount())
        .bind(Json(&order.customer_info))
        .bind(order.delivery_address.as_deref())
        .bind(order.payment_method.to_string())
        .bind(order.notes.as_deref())
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "order"))?;

        Ok(())
    }

    async fn get(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Order::try_from).transpose()
    }

    async fn list(&self, scope: &OrderScope, limit: u32) -> Result<Vec<Order>, RepositoryError> {
        let limit = i64::from(limit);
        let rows = match scope {
            OrderScope::All => {
                let sql =
                    format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC LIMIT $1");
                sqlx::query_as::<_, OrderRow>(&sql)
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
            OrderScope::User(user_id) => {
                let sql = format!(
                    "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 \
                     ORDER BY created_at DESC LIMIT $2"
                );
                sqlx::query_as::<_, OrderRow>(&sql)
                    .bind(user_id)
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
            OrderScope::Restaurant(restaurant_id) => {
                let sql = format!(
                    "SELECT {ORDER_COLUMNS} FROM orders WHERE restaurant_id = $1 \
                     ORDER BY created_at DESC LIMIT $2"
                );
                sqlx::query_as::<_, OrderRow>(&sql)
                    .bind(restaurant_id)
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.into_iter().map(Order::try_from).collect()
    }

    async fn update_status(
        &self,
        id: &OrderId,
        from: OrderStatus,
        to: OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>, RepositoryError> {
        let sql = format!(
            "UPDATE orders SET status = $3, updated_at = $4 \
             WHERE id = $1 AND status = $2 RETURNING {ORDER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .bind(from.as_str())
            .bind(to.as_str())
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Order::try_from).transpose()
    }

    async fn customer_stats(&self) -> Result<Vec<CustomerStats>, RepositoryError> {
        let rows = sqlx::query_as::<_, StatsRow>(
            r"
            SELECT user_id,
                   COUNT(*) AS order_count,
                   COALESCE(SUM(total_amount), 0) AS total_spent,
                   MAX(created_at) AS last_order_at
            FROM orders
            WHERE user_id IS NOT NULL AND status <> 'cancelled'
            GROUP BY user_id
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| CustomerStats {
                user_id: row.user_id,
                order_count: u32::try_from(row.order_count).unwrap_or(u32::MAX),
                total_spent: Lira::new(row.total_spent),
                last_order_at: row.last_order_at,
            })
            .collect())
    }
}
