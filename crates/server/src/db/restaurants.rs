//! Restaurant and category repository for `PostgreSQL`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use neyisek_core::{CategoryId, Lira, RestaurantId, UserId};

use super::{RepositoryError, RestaurantStore};
use crate::models::{Category, Restaurant};

const RESTAURANT_COLUMNS: &str = "id, name, owner_id, category_id, description, address, phone, \
     rating, delivery_time_minutes, minimum_order, delivery_fee, is_open, is_active, latitude, \
     longitude, created_at";

/// Repository for the `restaurants` and `categories` tables.
#[derive(Clone)]
pub struct PgRestaurantRepository {
    pool: PgPool,
}

impl PgRestaurantRepository {
    /// Create a new restaurant repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct RestaurantRow {
    id: RestaurantId,
    name: String,
    owner_id: UserId,
    category_id: Option<CategoryId>,
    description: Option<String>,
    address: String,
    phone: Option<String>,
    rating: f64,
    delivery_time_minutes: i32,
    minimum_order: Decimal,
    delivery_fee: Decimal,
    is_open: bool,
    is_active: bool,
    latitude: Option<f64>,
    longitude: Option<f64>,
    created_at: DateTime<Utc>,
}

impl From<RestaurantRow> for Restaurant {
    fn from(row: RestaurantRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            owner_id: row.owner_id,
            category_id: row.category_id,
            description: row.description,
            address: row.address,
            phone: row.phone,
            rating: row.rating,
            delivery_time_minutes: u32::try_from(row.delivery_time_minutes).unwrap_or_default(),
            minimum_order: Lira::new(row.minimum_order),
            delivery_fee: Lira::new(row.delivery_fee),
            is_open: row.is_open,
            is_active: row.is_active,
            latitude: row.latitude,
            longitude: row.longitude,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: CategoryId,
    name: String,
    icon: Option<String>,
    sort_order: i32,
}

#[async_trait]
impl RestaurantStore for PgRestaurantRepository {
    async fn upsert(&self, restaurant: &Restaurant) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO restaurants (id, name, owner_id, category_id, description, address, phone,
                                     rating, delivery_time_minutes, minimum_order, delivery_fee,
                                     is_open, is_active, latitude, longitude, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            ON CONFLICT (id) DO UPDATE
                SET name = EXCLUDED.name,
                    owner_id = EXCLUDED.owner_id,
                    category_id = EXCLUDED.category_id,
                    description = EXCLUDED.description,
                    address = EXCLUDED.address,
                    phone = EXCLUDED.phone,
                    rating = EXCLUDED.rating,
                    delivery_time_minutes = EXCLUDED.delivery_time_minutes,
                    minimum_order = EXCLUDED.minimum_order,
                    delivery_fee = EXCLUDED.delivery_fee,
                    is_open = EXCLUDED.is_open,
                    is_active = EXCLUDED.is_active,
                    latitude = EXCLUDED.latitude,
                    longitude = EXCLUDED.longitude
            ",
        )
        .bind(&restaurant.id)
        .bind(&restaurant.name)
        .bind(&restaurant.owner_id)
        .bind(restaurant.category_id.as_ref())
        .bind(restaurant.description.as_deref())
        .bind(&restaurant.address)
        .bind(restaurant.phone.as_deref())
        .bind(restaurant.rating)
        .bind(i32::try_from(restaurant.delivery_time_minutes).unwrap_or(i32::MAX))
        .bind(restaurant.minimum_order.amount())
        .bind(restaurant.delivery_fee.amount())
        .bind(restaurant.is_open)
        .bind(restaurant.is_active)
        .bind(restaurant.latitude)
        .bind(restaurant.longitude)
        .bind(restaurant.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: &RestaurantId) -> Result<Option<Restaurant>, RepositoryError> {
        let sql = format!("SELECT {RESTAURANT_COLUMNS} FROM restaurants WHERE id = $1");
        let row = sqlx::query_as::<_, RestaurantRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    async fn list_active(
        &self,
        category: Option<&CategoryId>,
    ) -> Result<Vec<Restaurant>, RepositoryError> {
        let sql = format!(
            "SELECT {RESTAURANT_COLUMNS} FROM restaurants \
             WHERE is_active AND ($1::TEXT IS NULL OR category_id = $1) \
             ORDER BY name"
        );
        let rows = sqlx::query_as::<_, RestaurantRow>(&sql)
            .bind(category)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn upsert_category(&self, category: &Category) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO categories (id, name, icon, sort_order)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
                SET name = EXCLUDED.name, icon = EXCLUDED.icon, sort_order = EXCLUDED.sort_order
            ",
        )
        .bind(&category.id)
        .bind(&category.name)
        .bind(category.icon.as_deref())
        .bind(category.sort_order)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, icon, sort_order FROM categories ORDER BY sort_order, name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| Category {
                id: row.id,
                name: row.name,
                icon: row.icon,
                sort_order: row.sort_order,
            })
            .collect())
    }
}
