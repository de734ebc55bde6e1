//! Seed data for the catalog collections.
//!
//! A seed file lists categories, users and restaurants. References are
//! checked before anything is written: a restaurant's category and owner
//! must be defined in the same file or already exist in the store.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use neyisek_core::{CategoryId, Email, Lira, RestaurantId, UserId, UserRole};

use crate::db::{Repositories, RepositoryError};
use crate::models::{Category, Restaurant, User};

/// Contents of a seed file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SeedFile {
    #[serde(default)]
    pub categories: Vec<SeedCategory>,
    #[serde(default)]
    pub users: Vec<SeedUser>,
    #[serde(default)]
    pub restaurants: Vec<SeedRestaurant>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedCategory {
    pub id: CategoryId,
    pub name: String,
    pub icon: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedUser {
    pub uid: UserId,
    pub email: Email,
    pub display_name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedRestaurant {
    pub id: RestaurantId,
    pub name: String,
    pub owner_id: UserId,
    pub category_id: Option<CategoryId>,
    pub description: Option<String>,
    pub address: String,
    pub phone: Option<String>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default = "default_delivery_time")]
    pub delivery_time_minutes: u32,
    #[serde(default)]
    pub minimum_order: Lira,
    #[serde(default)]
    pub delivery_fee: Lira,
    #[serde(default = "default_true")]
    pub is_open: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

const fn default_delivery_time() -> u32 {
    30
}

const fn default_true() -> bool {
    true
}

/// Counts of records written by [`apply`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub categories: usize,
    pub users: usize,
    pub restaurants: usize,
}

impl SeedFile {
    /// Total number of records in the file.
    #[must_use]
    pub fn len(&self) -> usize {
        self.categories.len() + self.users.len() + self.restaurants.len()
    }

    /// Whether the file defines no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Problems that can be found without looking at the store.
    ///
    /// Covers duplicate ids, blank names and ratings outside 0..=5.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        let mut seen = HashSet::new();
        for category in &self.categories {
            if category.id.is_blank() {
                errors.push("category with blank id".to_string());
            } else if !seen.insert(category.id.as_str()) {
                errors.push(format!("duplicate category id: {}", category.id));
            }
            if category.name.trim().is_empty() {
                errors.push(format!("category {} has no name", category.id));
            }
        }

        let mut seen = HashSet::new();
        for user in &self.users {
            if user.uid.is_blank() {
                errors.push("user with blank uid".to_string());
            } else if !seen.insert(user.uid.as_str()) {
                errors.push(format!("duplicate user uid: {}", user.uid));
            }
        }

        let mut seen = HashSet::new();
        for restaurant in &self.restaurants {
            if restaurant.id.is_blank() {
                errors.push("restaurant with blank id".to_string());
            } else if !seen.insert(restaurant.id.as_str()) {
                errors.push(format!("duplicate restaurant id: {}", restaurant.id));
            }
            if restaurant.name.trim().is_empty() {
                errors.push(format!("restaurant {} has no name", restaurant.id));
            }
            if !(0.0..=5.0).contains(&restaurant.rating) {
                errors.push(format!(
                    "restaurant {} has rating {} outside 0-5",
                    restaurant.id, restaurant.rating
                ));
            }
        }

        errors
    }

    /// Check restaurant references against the file and the store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be read.
    pub async fn validate_references(
        &self,
        repos: &Repositories,
    ) -> Result<Vec<String>, RepositoryError> {
        let mut categories: HashSet<CategoryId> =
            self.categories.iter().map(|c| c.id.clone()).collect();
        categories.extend(
            repos
                .restaurants
                .list_categories()
                .await?
                .into_iter()
                .map(|c| c.id),
        );
        let users: HashSet<&UserId> = self.users.iter().map(|u| &u.uid).collect();

        let mut errors = Vec::new();
        for restaurant in &self.restaurants {
            if let Some(category) = &restaurant.category_id {
                if !categories.contains(category) {
                    errors.push(format!(
                        "restaurant {} references unknown category {category}",
                        restaurant.id
                    ));
                }
            }

            if !users.contains(&restaurant.owner_id)
                && repos.users.get(&restaurant.owner_id).await?.is_none()
            {
                errors.push(format!(
                    "restaurant {} references unknown owner {}",
                    restaurant.id, restaurant.owner_id
                ));
            }
        }
        Ok(errors)
    }
}

/// Upsert every record in the file. Categories and users go first so
/// restaurants never point at missing rows.
///
/// # Errors
///
/// Returns the first `RepositoryError`; earlier records stay written.
pub async fn apply(
    repos: &Repositories,
    seed: SeedFile,
    now: DateTime<Utc>,
) -> Result<SeedSummary, RepositoryError> {
    let mut summary = SeedSummary::default();

    for category in seed.categories {
        repos
            .restaurants
            .upsert_category(&Category {
                id: category.id,
                name: category.name,
                icon: category.icon,
                sort_order: category.sort_order,
            })
            .await?;
        summary.categories += 1;
    }

    for user in seed.users {
        repos
            .users
            .upsert(&User {
                uid: user.uid,
                email: user.email,
                display_name: user.display_name,
                phone_number: user.phone_number,
                address: user.address,
                role: user.role,
                is_admin: user.is_admin,
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .await?;
        summary.users += 1;
    }

    for restaurant in seed.restaurants {
        tracing::debug!(id = %restaurant.id, "Seeding restaurant");
        repos
            .restaurants
            .upsert(&Restaurant {
                id: restaurant.id,
                name: restaurant.name,
                owner_id: restaurant.owner_id,
                category_id: restaurant.category_id,
                description: restaurant.description,
                address: restaurant.address,
                phone: restaurant.phone,
                rating: restaurant.rating,
                delivery_time_minutes: restaurant.delivery_time_minutes,
                minimum_order: restaurant.minimum_order,
                delivery_fee: restaurant.delivery_fee,
                is_open: restaurant.is_open,
                is_active: restaurant.is_active,
                latitude: restaurant.latitude,
                longitude: restaurant.longitude,
                created_at: now,
            })
            .await?;
        summary.restaurants += 1;
    }

    Ok(summary)
}
