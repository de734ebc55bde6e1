//! Restaurant and category domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use neyisek_core::{CategoryId, Lira, RestaurantId, UserId};

/// A restaurant listed on the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Restaurant {
    pub id: RestaurantId,
    pub name: String,
    /// The user account that manages this restaurant.
    pub owner_id: UserId,
    pub category_id: Option<CategoryId>,
    pub description: Option<String>,
    pub address: String,
    pub phone: Option<String>,
    pub rating: f64,
    pub delivery_time_minutes: u32,
    pub minimum_order: Lira,
    pub delivery_fee: Lira,
    pub is_open: bool,
    pub is_active: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// A cuisine category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub icon: Option<String>,
    pub sort_order: i32,
}
