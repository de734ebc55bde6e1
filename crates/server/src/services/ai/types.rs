//! Request and response schemas for the AI endpoints.
//!
//! Requests reject unknown fields so a body meant for another endpoint is a
//! 400 rather than a silently defaulted call.

use neyisek_core::Lira;
use serde::{Deserialize, Serialize};

/// Most recommendations a caller may ask for.
pub const MAX_RECOMMENDATIONS: u8 = 10;
pub const DEFAULT_RECOMMENDATIONS: u8 = 5;

// =============================================================================
// Chatbot
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

/// What the client knows about where the user is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChatContext {
    pub user_name: Option<String>,
    pub current_page: Option<String>,
    pub cart_item_count: Option<u32>,
    pub restaurant_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChatbotRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
    #[serde(default)]
    pub context: Option<ChatContext>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatbotReply {
    pub reply: String,
}

// =============================================================================
// Recommendations
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RecommendationsRequest {
    pub user_id: Option<String>,
    #[serde(default)]
    pub preferences: Vec<String>,
    /// Names of recently ordered dishes.
    #[serde(default)]
    pub recent_orders: Vec<String>,
    pub limit: Option<u8>,
}

impl RecommendationsRequest {
    /// Requested count, clamped to the allowed range.
    #[must_use]
    pub fn effective_limit(&self) -> usize {
        usize::from(
            self.limit
                .unwrap_or(DEFAULT_RECOMMENDATIONS)
                .clamp(1, MAX_RECOMMENDATIONS),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub name: String,
    pub reason: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendations {
    pub recommendations: Vec<Recommendation>,
}

// =============================================================================
// Search
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SearchRequest {
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchIntent {
    pub intent: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub cuisine: Option<String>,
    #[serde(default)]
    pub max_price: Option<f64>,
}

// =============================================================================
// Cross-sell
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CartItem {
    pub name: String,
    pub price: Lira,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CrossSellRequest {
    pub cart_items: Vec<CartItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossSell {
    pub suggestions: Vec<Suggestion>,
}

// =============================================================================
// Pricing
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DemandLevel {
    Low,
    #[default]
    Normal,
    High,
}

impl DemandLevel {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "düşük",
            Self::Normal => "normal",
            Self::High => "yüksek",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PricedItem {
    pub name: String,
    pub price: Lira,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PricingRequest {
    pub restaurant_id: Option<String>,
    pub items: Vec<PricedItem>,
    #[serde(default)]
    pub demand_level: DemandLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceAdjustment {
    pub name: String,
    pub current_price: Lira,
    pub suggested_price: Lira,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingAdvice {
    pub strategy: String,
    pub adjustments: Vec<PriceAdjustment>,
}
