//! User domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use neyisek_core::{Email, UserId, UserRole};

/// A registered user.
///
/// Authentication itself is handled by the identity provider; this record
/// holds the profile keyed by the provider's uid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub uid: UserId,
    pub email: Email,
    pub display_name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const fn default_true() -> bool {
    true
}
