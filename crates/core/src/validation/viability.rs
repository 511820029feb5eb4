//! Minimum-viability gate for autosave.
//!
//! A draft can be dirty without being persistable; a save is only attempted
//! once the record identifies a customer well enough to upsert.

use crate::domain::customer::CustomerRecord;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionMode {
    Create,
    Edit,
}

pub fn minimum_viable(record: &CustomerRecord, mode: SessionMode) -> bool {
    if record.customer_type.is_none() {
        return false;
    }
    if !record.has_field("first_name") || !record.has_field("last_name") {
        return false;
    }
    match mode {
        SessionMode::Create => true,
        SessionMode::Edit => record.id.is_some(),
    }
}

#[cfg(test)]
mod tests {
    use super::{minimum_viable, SessionMode};
    use crate::domain::customer::{CustomerId, CustomerRecord, CustomerType};

    fn named_record() -> CustomerRecord {
        CustomerRecord {
            customer_type: Some(CustomerType::Personal),
            first_name: Some("Ada".to_string()),
            last_name: Some("Okafor".to_string()),
            ..CustomerRecord::new()
        }
    }

    #[test]
    fn create_mode_needs_type_and_both_names() {
        assert!(minimum_viable(&named_record(), SessionMode::Create));

        let untyped = CustomerRecord { customer_type: None, ..named_record() };
        assert!(!minimum_viable(&untyped, SessionMode::Create));

        let unnamed = CustomerRecord { last_name: Some("  ".to_string()), ..named_record() };
        assert!(!minimum_viable(&unnamed, SessionMode::Create));
    }

    #[test]
    fn edit_mode_additionally_needs_an_id() {
        assert!(!minimum_viable(&named_record(), SessionMode::Edit));

        let persisted = CustomerRecord { id: Some(CustomerId::new()), ..named_record() };
        assert!(minimum_viable(&persisted, SessionMode::Edit));
    }
}
