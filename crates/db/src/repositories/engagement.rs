use sqlx::Row;

use gearbook_core::domain::customer::CustomerId;
use gearbook_core::domain::engagement::ScoreEvent;

use super::{EngagementStore, RepositoryError};
use crate::DbPool;

pub struct SqlEngagementStore {
    pool: DbPool,
}

impl SqlEngagementStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl EngagementStore for SqlEngagementStore {
    /// The pulled baseline: newest score snapshot for the customer, zero
    /// when the customer has no engagement history yet.
    async fn aggregate_score(&self, id: &CustomerId) -> Result<f64, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT value FROM engagement_events
            WHERE customer_id = ?
            ORDER BY recorded_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| row.get::<f64, _>("value")).unwrap_or(0.0))
    }

    async fn record_event(&self, event: ScoreEvent) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO engagement_events (customer_id, value, recorded_at) VALUES (?, ?, ?)",
        )
        .bind(event.customer_id.to_string())
        .bind(event.value)
        .bind(event.recorded_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use gearbook_core::domain::customer::CustomerId;
    use gearbook_core::domain::engagement::ScoreEvent;

    use super::SqlEngagementStore;
    use crate::repositories::EngagementStore;
    use crate::{connect_with_settings, migrations};

    async fn store() -> SqlEngagementStore {
        let pool = connect_with_settings("sqlite::memory:", 1, 5)
            .await
            .expect("in-memory pool connects");
        migrations::run_pending(&pool).await.expect("migrations apply");
        SqlEngagementStore::new(pool)
    }

    #[tokio::test]
    async fn aggregate_returns_zero_without_history() {
        let store = store().await;
        let score = store.aggregate_score(&CustomerId::new()).await.expect("aggregate runs");
        assert_eq!(score, 0.0);
    }

    #[tokio::test]
    async fn aggregate_returns_the_newest_snapshot() {
        let store = store().await;
        let customer_id = CustomerId::new();
        let now = Utc::now();

        for (value, age) in [(42.0, 60), (57.0, 0), (12.0, 120)] {
            store
                .record_event(ScoreEvent {
                    customer_id,
                    value,
                    recorded_at: now - Duration::minutes(age),
                })
                .await
                .expect("insert succeeds");
        }

        let score = store.aggregate_score(&customer_id).await.expect("aggregate runs");
        assert_eq!(score, 57.0);
    }

    #[tokio::test]
    async fn aggregate_is_scoped_to_one_customer() {
        let store = store().await;
        let ours = CustomerId::new();
        let theirs = CustomerId::new();
        let now = Utc::now();

        store
            .record_event(ScoreEvent { customer_id: ours, value: 10.0, recorded_at: now })
            .await
            .expect("insert succeeds");
        store
            .record_event(ScoreEvent { customer_id: theirs, value: 99.0, recorded_at: now })
            .await
            .expect("insert succeeds");

        let score = store.aggregate_score(&ours).await.expect("aggregate runs");
        assert_eq!(score, 10.0);
    }
}
