//! Business logic and external service wrappers.
//!
//! # Services
//!
//! - `orders` - Order placement and status changes (publishes to the order feed)
//! - `notifications` - Push notification targeting and fan-out
//! - `fcm` - Firebase Cloud Messaging HTTP v1 client
//! - `ai` - Gemini-backed assistant features with deterministic fallbacks
//! - `email` - Transactional email via SMTP
//! - `maps` - Geocoding
//! - `analytics` - Client telemetry sink
//! - `fallback` - Default-on-failure combinator shared by the AI endpoints

pub mod ai;
pub mod analytics;
pub mod email;
pub mod fallback;
pub mod fcm;
pub mod maps;
pub mod notifications;
pub mod orders;

pub use ai::AiService;
pub use analytics::AnalyticsService;
pub use email::EmailService;
pub use maps::MapsClient;
pub use notifications::NotificationService;
pub use orders::OrderService;
