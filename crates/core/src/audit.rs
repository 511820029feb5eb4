use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::customer::CustomerId;
use crate::patch::PendingChange;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditCategory {
    Validation,
    Autosave,
    Mutation,
    Realtime,
    System,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditOutcome {
    Success,
    Rejected,
    Failed,
}

/// One observable event in an editing session's history. Field-level
/// changes ride along so the external history recorder can replay them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: String,
    pub customer_id: Option<CustomerId>,
    pub session_id: Option<String>,
    pub event_type: String,
    pub category: AuditCategory,
    pub actor: String,
    pub outcome: AuditOutcome,
    pub changes: Vec<PendingChange>,
    pub metadata: BTreeMap<String, String>,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(
        customer_id: Option<CustomerId>,
        session_id: Option<String>,
        event_type: impl Into<String>,
        category: AuditCategory,
        actor: impl Into<String>,
        outcome: AuditOutcome,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            customer_id,
            session_id,
            event_type: event_type.into(),
            category,
            actor: actor.into(),
            outcome,
            changes: Vec::new(),
            metadata: BTreeMap::new(),
            occurred_at: Utc::now(),
        }
    }

    pub fn with_changes(mut self, changes: Vec<PendingChange>) -> Self {
        self.changes = changes;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

pub trait AuditSink: Send + Sync {
    fn emit(&self, event: AuditEvent);
}

#[derive(Clone, Default)]
pub struct InMemoryAuditSink {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl InMemoryAuditSink {
    pub fn events(&self) -> Vec<AuditEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl AuditSink for InMemoryAuditSink {
    fn emit(&self, event: AuditEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{AuditCategory, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink};
    use crate::domain::customer::CustomerId;
    use crate::patch::PendingChange;

    #[test]
    fn in_memory_sink_records_events_with_field_changes() {
        let sink = InMemoryAuditSink::default();
        let customer_id = CustomerId::new();

        sink.emit(
            AuditEvent::new(
                Some(customer_id),
                Some("session-7".to_owned()),
                "mutation.applied",
                AuditCategory::Mutation,
                "mutation-cache",
                AuditOutcome::Success,
            )
            .with_changes(vec![PendingChange {
                field: "email".to_owned(),
                old_value: json!(null),
                new_value: json!("ada@example.com"),
            }])
            .with_metadata("mutation_id", "m-1"),
        );

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].customer_id, Some(customer_id));
        assert_eq!(events[0].session_id.as_deref(), Some("session-7"));
        assert_eq!(events[0].changes.len(), 1);
        assert_eq!(events[0].changes[0].field, "email");
        assert!(events[0].metadata.contains_key("mutation_id"));
    }
}
