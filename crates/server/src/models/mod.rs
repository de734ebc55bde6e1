//! Domain models.
//!
//! Validated domain objects, separate from database row types. All types
//! serialize with camelCase field names, matching the browser clients.

pub mod analytics;
pub mod order;
pub mod restaurant;
pub mod token;
pub mod user;

pub use analytics::{AnalyticsEvent, AnalyticsKind};
pub use order::{CustomerInfo, CustomerStats, NewOrder, Order, OrderItem};
pub use restaurant::{Category, Restaurant};
pub use token::DeviceToken;
pub use user::User;
