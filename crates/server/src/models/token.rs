//! Push messaging device tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use neyisek_core::{TokenId, UserId};

/// A registered push messaging token for one device of a user.
///
/// Tokens are never deleted; a failed delivery flips `active` to false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceToken {
    pub id: TokenId,
    pub user_id: UserId,
    pub token: String,
    pub active: bool,
    pub platform: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
