//! Telemetry repository for `PostgreSQL`.

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::types::Json;

use super::{AnalyticsStore, RepositoryError};
use crate::models::AnalyticsEvent;

/// Repository for the append-only `analytics_events` table.
#[derive(Clone)]
pub struct PgAnalyticsRepository {
    pool: PgPool,
}

impl PgAnalyticsRepository {
    /// Create a new analytics repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AnalyticsStore for PgAnalyticsRepository {
    async fn insert(&self, event: &AnalyticsEvent) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO analytics_events (kind, payload, received_at) VALUES ($1, $2, $3)")
            .bind(event.kind.as_str())
            .bind(Json(&event.payload))
            .bind(event.received_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
