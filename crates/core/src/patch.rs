//! Dot-path field access over the JSON shape of a customer record.
//!
//! Edit sessions address fields the way the form does (`"email"`,
//! `"fleet_details.vehicle_count"`). Patches mutate a JSON copy of the
//! record and only commit back when every write lands, so a bad path never
//! leaves a half-applied record behind.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::customer::{CustomerRecord, FleetDetails, MarketingPreferences};
use crate::errors::StructuralError;

/// One observed field mutation, handed to the audit/history collaborator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PendingChange {
    pub field: String,
    pub old_value: Value,
    pub new_value: Value,
}

/// An ordered set of field writes applied as one unit.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordPatch {
    writes: Vec<(String, Value)>,
}

impl RecordPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.writes.push((field.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.writes.iter().map(|(field, _)| field.as_str())
    }

    /// Applies every write in order. Returns the changes actually observed,
    /// oldest first. The record is untouched if any write fails.
    pub fn apply(&self, record: &mut CustomerRecord) -> Result<Vec<PendingChange>, StructuralError> {
        let mut shape = serde_json::to_value(&*record).map_err(|err| {
            StructuralError::IncompatibleValue { path: String::new(), reason: err.to_string() }
        })?;

        let mut changes = Vec::with_capacity(self.writes.len());
        for (field, value) in &self.writes {
            let old_value = read_field(&shape, field)?.clone();
            materialize_parent(&mut shape, field)?;
            write_field(&mut shape, field, value.clone())?;
            changes.push(PendingChange {
                field: field.clone(),
                old_value,
                new_value: value.clone(),
            });
        }

        *record = serde_json::from_value(shape).map_err(|err| {
            let path = self.writes.last().map(|(field, _)| field.clone()).unwrap_or_default();
            StructuralError::IncompatibleValue { path, reason: err.to_string() }
        })?;

        Ok(changes)
    }
}

/// Resolves a dot-path against a JSON-shaped record. An optional sub-object
/// that has never been written is stored as null and reads as null the rest
/// of the way down.
pub fn read_field<'a>(root: &'a Value, path: &str) -> Result<&'a Value, StructuralError> {
    static NULL: Value = Value::Null;

    let mut current = root;
    for segment in path.split('.') {
        if current.is_null() {
            return Ok(&NULL);
        }
        let object = current
            .as_object()
            .ok_or_else(|| StructuralError::NotTraversable { path: path.to_string() })?;
        current = object
            .get(segment)
            .ok_or_else(|| StructuralError::UnknownFieldPath(path.to_string()))?;
    }
    Ok(current)
}

/// The first write through a null sub-object swaps in that sub-object's
/// default shape, so every leaf key exists for the write itself.
fn materialize_parent(shape: &mut Value, path: &str) -> Result<(), StructuralError> {
    let Some((head, _)) = path.split_once('.') else {
        return Ok(());
    };
    if !shape.get(head).is_some_and(Value::is_null) {
        return Ok(());
    }

    let default = match head {
        "fleet_details" => serde_json::to_value(FleetDetails::default()),
        "marketing_preferences" => serde_json::to_value(MarketingPreferences::default()),
        _ => return Err(StructuralError::NotTraversable { path: path.to_string() }),
    }
    .map_err(|err| StructuralError::IncompatibleValue {
        path: path.to_string(),
        reason: err.to_string(),
    })?;

    shape[head] = default;
    Ok(())
}

fn write_field(root: &mut Value, path: &str, value: Value) -> Result<(), StructuralError> {
    let mut segments = path.split('.').peekable();
    let mut current = root;

    loop {
        let segment = match segments.next() {
            Some(segment) if !segment.is_empty() => segment,
            _ => return Err(StructuralError::UnknownFieldPath(path.to_string())),
        };

        let object = current
            .as_object_mut()
            .ok_or_else(|| StructuralError::NotTraversable { path: path.to_string() })?;
        let slot = object
            .get_mut(segment)
            .ok_or_else(|| StructuralError::UnknownFieldPath(path.to_string()))?;

        if segments.peek().is_none() {
            *slot = value;
            return Ok(());
        }
        current = slot;
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{read_field, RecordPatch};
    use crate::domain::customer::CustomerRecord;
    use crate::errors::StructuralError;

    #[test]
    fn applies_writes_in_order_and_reports_pending_changes() {
        let mut record = CustomerRecord::new();
        let patch = RecordPatch::new()
            .set("first_name", "Nadia")
            .set("email", "nadia@example.com")
            .set("email", "nadia@garage.example");

        let changes = patch.apply(&mut record).expect("patch applies");

        assert_eq!(record.first_name.as_deref(), Some("Nadia"));
        assert_eq!(record.email.as_deref(), Some("nadia@garage.example"));
        assert_eq!(changes.len(), 3);
        assert_eq!(changes[1].old_value, json!(null));
        assert_eq!(changes[2].old_value, json!("nadia@example.com"));
        assert_eq!(changes[2].new_value, json!("nadia@garage.example"));
    }

    #[test]
    fn nested_write_materializes_fleet_details() {
        let mut record = CustomerRecord::new();
        let patch = RecordPatch::new()
            .set("fleet_details.vehicle_count", 12)
            .set("fleet_details.manager_name", "Rosa Vega");

        let changes = patch.apply(&mut record).expect("nested patch applies");

        let details = record.fleet_details.expect("fleet details created");
        assert_eq!(details.vehicle_count, 12);
        assert_eq!(details.manager_name.as_deref(), Some("Rosa Vega"));
        assert_eq!(details.manager_contact, None);
        // Neither leaf existed before its write.
        assert_eq!(changes[0].old_value, json!(null));
        assert_eq!(changes[1].old_value, json!(null));
    }

    #[test]
    fn nested_path_with_an_unknown_leaf_is_rejected() {
        let mut record = CustomerRecord::new();
        let patch = RecordPatch::new().set("fleet_details.wheel_size", 17);

        let error = patch.apply(&mut record).expect_err("unknown nested leaf rejected");

        assert!(matches!(
            error,
            StructuralError::UnknownFieldPath(ref path) if path == "fleet_details.wheel_size"
        ));
        assert_eq!(record.fleet_details, None);
    }

    #[test]
    fn marketing_preference_toggles_patch_in_place() {
        let mut record = CustomerRecord::new();
        RecordPatch::new()
            .set("marketing_preferences.email_opt_in", true)
            .apply(&mut record)
            .expect("toggle applies");

        assert!(record.marketing_preferences.email_opt_in);
        assert!(!record.marketing_preferences.sms_opt_in);
    }

    #[test]
    fn writing_through_a_scalar_field_is_not_traversable() {
        let mut record =
            CustomerRecord { first_name: Some("Ada".to_string()), ..CustomerRecord::new() };
        let patch = RecordPatch::new().set("first_name.initial", "A");

        let error = patch.apply(&mut record).expect_err("scalar is not traversable");
        assert!(matches!(error, StructuralError::NotTraversable { .. }));
    }

    #[test]
    fn unknown_path_fails_without_touching_the_record() {
        let mut record = CustomerRecord::new();
        let patch =
            RecordPatch::new().set("first_name", "Lena").set("favorite_color", "green");

        let error = patch.apply(&mut record).expect_err("unknown path rejected");

        assert!(matches!(error, StructuralError::UnknownFieldPath(ref path) if path == "favorite_color"));
        assert_eq!(record.first_name, None);
    }

    #[test]
    fn read_field_resolves_nested_paths() {
        let shape = json!({ "fleet_details": { "vehicle_count": 4 } });
        let value = read_field(&shape, "fleet_details.vehicle_count").expect("path resolves");
        assert_eq!(value, &json!(4));
    }

    #[test]
    fn read_field_treats_an_absent_sub_object_as_null() {
        let shape = json!({ "fleet_details": null });
        let value = read_field(&shape, "fleet_details.vehicle_count").expect("path resolves");
        assert!(value.is_null());
    }

    #[test]
    fn incompatible_value_is_rejected_as_structural() {
        let mut record = CustomerRecord::new();
        let patch = RecordPatch::new().set("loyalty_points", "a lot");

        let error = patch.apply(&mut record).expect_err("type mismatch rejected");
        assert!(matches!(error, StructuralError::IncompatibleValue { .. }));
    }
}
