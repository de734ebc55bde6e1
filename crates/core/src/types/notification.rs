//! Push notification kinds and audience segments.

use serde::{Deserialize, Serialize};

/// Kind tag of a push notification request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    OrderUpdate,
    NewOrder,
    Promotion,
    DeliveryUpdate,
    RestaurantApplication,
}

/// The notification `type` tag was not one of the known kinds.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown notification type: {0}")]
pub struct UnknownNotificationKind(pub String);

impl NotificationKind {
    /// Wire representation of the tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OrderUpdate => "order_update",
            Self::NewOrder => "new_order",
            Self::Promotion => "promotion",
            Self::DeliveryUpdate => "delivery_update",
            Self::RestaurantApplication => "restaurant_application",
        }
    }
}

impl std::str::FromStr for NotificationKind {
    type Err = UnknownNotificationKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "order_update" => Ok(Self::OrderUpdate),
            "new_order" => Ok(Self::NewOrder),
            "promotion" => Ok(Self::Promotion),
            "delivery_update" => Ok(Self::DeliveryUpdate),
            "restaurant_application" => Ok(Self::RestaurantApplication),
            other => Err(UnknownNotificationKind(other.to_string())),
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Customer audience for broadcast notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    /// Lifetime spend at or above [`Segment::VIP_SPEND_THRESHOLD_TL`].
    Vip,
    /// Order count at or above [`Segment::LOYAL_ORDER_THRESHOLD`].
    Loyal,
    /// Ordered before, but nothing in the last [`Segment::INACTIVE_DAYS`] days.
    Inactive,
    /// Every registered device.
    All,
}

impl Segment {
    /// Minimum lifetime spend in lira for the VIP segment.
    pub const VIP_SPEND_THRESHOLD_TL: i64 = 1000;
    /// Minimum number of orders for the loyal segment.
    pub const LOYAL_ORDER_THRESHOLD: u32 = 10;
    /// Days without an order before a customer counts as inactive.
    pub const INACTIVE_DAYS: i64 = 30;
}
