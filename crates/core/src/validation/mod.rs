pub mod rules;
pub mod schema;
pub mod viability;

pub use rules::{
    lifecycle_stage, postal_code_matches_country, standard_rules, BusinessRule,
    BusinessRuleEngine, LifecycleStage, RuleViolation,
};
pub use schema::{validate_record, validate_shape, ValidationResult};
pub use viability::{minimum_viable, SessionMode};
