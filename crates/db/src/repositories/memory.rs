//! In-memory store fakes for session and validation tests. The write
//! paths can be told to fail so persistence-error handling is testable
//! without a real backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use gearbook_core::domain::customer::{CustomerId, CustomerRecord};
use gearbook_core::domain::engagement::ScoreEvent;
use gearbook_core::patch::RecordPatch;

use super::{CustomerStore, EngagementStore, RepositoryError};

#[derive(Default)]
pub struct InMemoryCustomerStore {
    records: RwLock<HashMap<Uuid, CustomerRecord>>,
    fail_writes: AtomicBool,
}

impl InMemoryCustomerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, every write fails with `RepositoryError::Unavailable`
    /// until cleared. Reads are unaffected.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn record_count(&self) -> usize {
        self.records.read().await.len()
    }

    fn check_writable(&self) -> Result<(), RepositoryError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("write failure injected".to_string()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl CustomerStore for InMemoryCustomerStore {
    async fn find_by_id(&self, id: &CustomerId) -> Result<Option<CustomerRecord>, RepositoryError> {
        let records = self.records.read().await;
        Ok(records.get(&id.0).cloned())
    }

    async fn upsert(&self, mut record: CustomerRecord) -> Result<CustomerRecord, RepositoryError> {
        self.check_writable()?;

        let id = record.id.unwrap_or_else(CustomerId::new);
        record.id = Some(id);
        record.updated_at = Some(Utc::now());

        let mut records = self.records.write().await;
        records.insert(id.0, record.clone());
        Ok(record)
    }

    async fn update_fields(
        &self,
        id: &CustomerId,
        patch: RecordPatch,
    ) -> Result<CustomerRecord, RepositoryError> {
        self.check_writable()?;

        let mut records = self.records.write().await;
        let record = records.get_mut(&id.0).ok_or(RepositoryError::NotFound(*id))?;

        patch
            .apply(record)
            .map_err(|err| RepositoryError::Decode(err.to_string()))?;
        record.updated_at = Some(Utc::now());
        Ok(record.clone())
    }
}

#[derive(Default)]
pub struct InMemoryEngagementStore {
    scores: RwLock<HashMap<Uuid, f64>>,
    fail_reads: AtomicBool,
}

impl InMemoryEngagementStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub async fn seed_score(&self, id: CustomerId, value: f64) {
        self.scores.write().await.insert(id.0, value);
    }
}

#[async_trait::async_trait]
impl EngagementStore for InMemoryEngagementStore {
    async fn aggregate_score(&self, id: &CustomerId) -> Result<f64, RepositoryError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("read failure injected".to_string()));
        }
        let scores = self.scores.read().await;
        Ok(scores.get(&id.0).copied().unwrap_or(0.0))
    }

    async fn record_event(&self, event: ScoreEvent) -> Result<(), RepositoryError> {
        let mut scores = self.scores.write().await;
        scores.insert(event.customer_id.0, event.value);
        Ok(())
    }
}
