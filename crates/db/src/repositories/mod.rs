use async_trait::async_trait;
use thiserror::Error;

use gearbook_core::domain::customer::{CustomerId, CustomerRecord};
use gearbook_core::domain::engagement::ScoreEvent;
use gearbook_core::patch::RecordPatch;

pub mod customer;
pub mod engagement;
pub mod memory;

pub use customer::SqlCustomerStore;
pub use engagement::SqlEngagementStore;
pub use memory::{InMemoryCustomerStore, InMemoryEngagementStore};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("customer `{0}` not found")]
    NotFound(CustomerId),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Row store keyed by customer id. `upsert` persists a whole-record
/// snapshot; `update_fields` applies a partial column update. Both return
/// the stored row so callers can observe server-assigned fields.
#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn find_by_id(&self, id: &CustomerId) -> Result<Option<CustomerRecord>, RepositoryError>;

    async fn upsert(&self, record: CustomerRecord) -> Result<CustomerRecord, RepositoryError>;

    async fn update_fields(
        &self,
        id: &CustomerId,
        patch: RecordPatch,
    ) -> Result<CustomerRecord, RepositoryError>;
}

/// Engagement score boundary: a server-side aggregate callable by customer
/// id, plus the insert path the change feed mirrors.
#[async_trait]
pub trait EngagementStore: Send + Sync {
    async fn aggregate_score(&self, id: &CustomerId) -> Result<f64, RepositoryError>;

    async fn record_event(&self, event: ScoreEvent) -> Result<(), RepositoryError>;
}
