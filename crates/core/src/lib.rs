pub mod address_book;
pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod patch;
pub mod validation;

pub use address_book::window::{AddressWindow, HeightEstimate};
pub use address_book::{AddressBook, ReorderDraft};
pub use audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink};
pub use domain::address::{AddressEntry, AddressType};
pub use domain::customer::{
    CustomerId, CustomerRecord, CustomerType, FleetDetails, MarketingPreferences,
};
pub use domain::engagement::{EngagementScore, ScoreEvent, ScoreSource};
pub use errors::{DomainError, StructuralError};
pub use patch::{PendingChange, RecordPatch};
pub use validation::{
    lifecycle_stage, minimum_viable, validate_record, validate_shape, BusinessRuleEngine,
    LifecycleStage, RuleViolation, SessionMode, ValidationResult,
};
