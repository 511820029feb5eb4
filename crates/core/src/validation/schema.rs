//! Type-discriminated shape validation.
//!
//! Each customer type extends the personal required-field set; the record
//! is valid for exactly the set selected by its discriminator. Business
//! rules that depend on other fields live in [`crate::validation::rules`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::customer::{CustomerRecord, CustomerType};
use crate::errors::StructuralError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: BTreeMap<String, String>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self { is_valid: true, errors: BTreeMap::new() }
    }

    pub fn reject(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.insert(field.into(), message.into());
        self.is_valid = false;
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::valid()
    }
}

struct RequiredField {
    path: &'static str,
    message: &'static str,
}

/// Shared base: every customer type requires these.
const PERSONAL_REQUIRED: &[RequiredField] = &[
    RequiredField { path: "first_name", message: "First name is required" },
    RequiredField { path: "last_name", message: "Last name is required" },
    RequiredField { path: "email", message: "Email address is required" },
    RequiredField { path: "country", message: "Country is required" },
    RequiredField { path: "timezone", message: "Timezone is required" },
];

const BUSINESS_REQUIRED: &[RequiredField] = &[
    RequiredField {
        path: "business_classification_id",
        message: "Business classification is required",
    },
    RequiredField { path: "company_size", message: "Company size is required" },
];

const COMPANY_NAME_MIN_CHARS: usize = 2;

/// Validates the shape of a typed record against its customer type's
/// required-field set. Business-level problems come back as data; only a
/// missing discriminator is structural.
pub fn validate_record(record: &CustomerRecord) -> Result<ValidationResult, StructuralError> {
    let customer_type = record.customer_type.ok_or(StructuralError::MissingCustomerType)?;

    let mut result = ValidationResult::valid();
    for required in PERSONAL_REQUIRED {
        if !record.has_field(required.path) {
            result.reject(required.path, required.message);
        }
    }

    match customer_type {
        CustomerType::Personal => {}
        CustomerType::Business => {
            check_company_name(record, &mut result);
            for required in BUSINESS_REQUIRED {
                if !record.has_field(required.path) {
                    result.reject(required.path, required.message);
                }
            }
        }
        CustomerType::Fleet => {
            check_company_name(record, &mut result);
            if let Some(details) = &record.fleet_details {
                if details.vehicle_count < 1 {
                    result.reject(
                        "fleet_details.vehicle_count",
                        "Vehicle count must be at least 1",
                    );
                }
                if is_blank(details.manager_name.as_deref()) {
                    result.reject("fleet_details.manager_name", "Manager name is required");
                }
                if is_blank(details.manager_contact.as_deref()) {
                    result.reject("fleet_details.manager_contact", "Manager contact is required");
                }
            }
        }
    }

    Ok(result)
}

/// Validation boundary for JSON-shaped input. Rejects a malformed or
/// unrecognized discriminator before any field check runs.
pub fn validate_shape(shape: &Value) -> Result<ValidationResult, StructuralError> {
    let object = shape.as_object().ok_or(StructuralError::NotAnObject)?;

    match object.get("customer_type") {
        None | Some(Value::Null) => return Err(StructuralError::MissingCustomerType),
        Some(Value::String(raw)) => {
            if CustomerType::parse(raw).is_none() {
                return Err(StructuralError::UnknownCustomerType(raw.clone()));
            }
        }
        Some(other) => return Err(StructuralError::UnknownCustomerType(other.to_string())),
    }

    let record: CustomerRecord = serde_json::from_value(shape.clone()).map_err(|err| {
        StructuralError::IncompatibleValue { path: String::new(), reason: err.to_string() }
    })?;

    validate_record(&record)
}

fn check_company_name(record: &CustomerRecord, result: &mut ValidationResult) {
    match record.field("company_name") {
        None => result.reject("company_name", "Company name is required"),
        Some(name) if name.chars().count() < COMPANY_NAME_MIN_CHARS => result.reject(
            "company_name",
            "Company name must be at least 2 characters",
        ),
        Some(_) => {}
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map(str::trim).map_or(true, str::is_empty)
}
