//! Client telemetry events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which telemetry endpoint received the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyticsKind {
    Engagement,
    Performance,
    PerformanceAlert,
}

impl AnalyticsKind {
    /// Database representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Engagement => "engagement",
            Self::Performance => "performance",
            Self::PerformanceAlert => "performance_alert",
        }
    }
}

/// A free-form telemetry payload stamped with its arrival time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEvent {
    pub kind: AnalyticsKind,
    pub payload: serde_json::Map<String, serde_json::Value>,
    pub received_at: DateTime<Utc>,
}
