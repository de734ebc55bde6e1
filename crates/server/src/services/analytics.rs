//! Client telemetry sink.

use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use crate::db::AnalyticsStore;
use crate::error::AppError;
use crate::models::{AnalyticsEvent, AnalyticsKind};

/// Stamps telemetry events and stores them.
#[derive(Clone)]
pub struct AnalyticsService {
    store: Arc<dyn AnalyticsStore>,
}

impl AnalyticsService {
    #[must_use]
    pub fn new(store: Arc<dyn AnalyticsStore>) -> Self {
        Self { store }
    }

    /// Record one event.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` if `body` is not a JSON object, or
    /// `AppError::Database` if the sink rejects the write.
    #[instrument(skip(self, body), fields(kind = kind.as_str()))]
    pub async fn record(
        &self,
        kind: AnalyticsKind,
        body: serde_json::Value,
    ) -> Result<AnalyticsEvent, AppError> {
        let serde_json::Value::Object(payload) = body else {
            return Err(AppError::BadRequest("Geçersiz analiz verisi".to_string()));
        };

        let event = AnalyticsEvent {
            kind,
            payload,
            received_at: Utc::now(),
        };

        match kind {
            AnalyticsKind::PerformanceAlert => {
                tracing::warn!(payload = %serde_json::Value::Object(event.payload.clone()), "Performance alert");
            }
            AnalyticsKind::Engagement | AnalyticsKind::Performance => {
                tracing::info!(fields = event.payload.len(), "Analytics event received");
            }
        }

        self.store.insert(&event).await?;
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::db::MemoryStore;

    #[tokio::test]
    async fn test_event_is_stamped_and_stored() {
        let store = MemoryStore::new();
        let service = AnalyticsService::new(Arc::new(store.clone()));

        let before = Utc::now();
        let event = service
            .record(AnalyticsKind::Engagement, json!({ "page": "/restoranlar", "duration": 12 }))
            .await
            .expect("record");
        assert!(event.received_at >= before);

        let stored = store.analytics_events();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].payload["page"], "/restoranlar");
    }

    #[tokio::test]
    async fn test_non_object_rejected() {
        let service = AnalyticsService::new(Arc::new(MemoryStore::new()));
        let result = service
            .record(AnalyticsKind::Performance, json!([1, 2, 3]))
            .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
