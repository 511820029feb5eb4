//! Optimistic field writes with rollback.
//!
//! Every write lands in the published record before the backend confirms
//! it, so readers never wait on the network. The published view is always
//! the last server-confirmed record plus the still-pending writes replayed
//! in issue order; a confirmation advances the base, a rejection drops out
//! of the replay. Overlapping rejections therefore unwind independently
//! without resurrecting each other.

use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tracing::warn;
use uuid::Uuid;

use gearbook_core::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink};
use gearbook_core::domain::customer::{CustomerId, CustomerRecord};
use gearbook_core::patch::{PendingChange, RecordPatch};
use gearbook_db::repositories::CustomerStore;

use crate::errors::SessionError;

struct PendingMutation {
    id: Uuid,
    patch: RecordPatch,
}

struct MutationState {
    /// Last server-confirmed record. The published view is this plus every
    /// entry in the ledger replayed in issue order.
    base: CustomerRecord,
    ledger: Vec<PendingMutation>,
}

impl MutationState {
    fn rebuild(&self) -> CustomerRecord {
        let mut next = self.base.clone();
        for pending in &self.ledger {
            if let Err(error) = pending.patch.apply(&mut next) {
                warn!(%error, "pending write no longer applies, skipping it");
            }
        }
        next
    }
}

pub struct OptimisticMutationCache {
    customer_id: CustomerId,
    session_id: Option<String>,
    store: Arc<dyn CustomerStore>,
    audit: Arc<dyn AuditSink>,
    state: Mutex<MutationState>,
    published: watch::Sender<CustomerRecord>,
}

impl OptimisticMutationCache {
    /// The record must already be persisted; optimistic writes address it
    /// by id.
    pub fn new(
        record: CustomerRecord,
        store: Arc<dyn CustomerStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self, SessionError> {
        let customer_id = record.id.ok_or(SessionError::Unpersisted)?;
        let (published, _) = watch::channel(record.clone());
        Ok(Self {
            customer_id,
            session_id: None,
            store,
            audit,
            state: Mutex::new(MutationState { base: record, ledger: Vec::new() }),
            published,
        })
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    /// Current view: backend truth plus every unconfirmed write.
    pub fn current(&self) -> CustomerRecord {
        self.published.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CustomerRecord> {
        self.published.subscribe()
    }

    pub async fn pending_count(&self) -> usize {
        self.state.lock().await.ledger.len()
    }

    pub async fn update_field(
        &self,
        field: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Result<Vec<PendingChange>, SessionError> {
        self.update_fields(RecordPatch::new().set(field, value)).await
    }

    /// Applies a multi-field write optimistically, then confirms it with
    /// the backend. On rejection the cache rolls back before returning.
    pub async fn update_fields(
        &self,
        patch: RecordPatch,
    ) -> Result<Vec<PendingChange>, SessionError> {
        if patch.is_empty() {
            return Ok(Vec::new());
        }
        let mutation_id = Uuid::new_v4();

        let changes = {
            let mut state = self.state.lock().await;
            let mut next = self.published.borrow().clone();
            let changes = patch.apply(&mut next)?;
            state.ledger.push(PendingMutation { id: mutation_id, patch: patch.clone() });
            self.published.send_replace(next);
            changes
        };

        match self.store.update_fields(&self.customer_id, patch).await {
            Ok(stored) => {
                self.confirm(mutation_id, stored, &changes).await;
                Ok(changes)
            }
            Err(error) => {
                let reason = error.to_string();
                self.roll_back(mutation_id, &reason).await;
                Err(SessionError::ConflictRollback(reason))
            }
        }
    }

    /// Reconciles a confirmed write: backend truth (server-assigned
    /// `updated_at` included) becomes the new base, with the still-pending
    /// writes replayed on top.
    async fn confirm(&self, mutation_id: Uuid, stored: CustomerRecord, changes: &[PendingChange]) {
        let mut state = self.state.lock().await;
        let Some(position) = state.ledger.iter().position(|pending| pending.id == mutation_id)
        else {
            return;
        };
        state.ledger.remove(position);
        state.base = stored;
        self.published.send_replace(state.rebuild());

        self.audit.emit(
            AuditEvent::new(
                Some(self.customer_id),
                self.session_id.clone(),
                "mutation.confirmed",
                AuditCategory::Mutation,
                "mutation-cache",
                AuditOutcome::Success,
            )
            .with_changes(changes.to_vec())
            .with_metadata("mutation_id", mutation_id.to_string()),
        );
    }

    /// Unwinds a rejected write by dropping it from the replay. Earlier
    /// writes that were themselves rejected are already gone from the
    /// ledger, so they cannot leak back in through a stale snapshot.
    async fn roll_back(&self, mutation_id: Uuid, reason: &str) {
        let mut state = self.state.lock().await;
        let Some(position) = state.ledger.iter().position(|pending| pending.id == mutation_id)
        else {
            return;
        };
        state.ledger.remove(position);
        self.published.send_replace(state.rebuild());

        self.audit.emit(
            AuditEvent::new(
                Some(self.customer_id),
                self.session_id.clone(),
                "mutation.rejected",
                AuditCategory::Mutation,
                "mutation-cache",
                AuditOutcome::Rejected,
            )
            .with_metadata("mutation_id", mutation_id.to_string())
            .with_metadata("reason", reason),
        );
    }
}
