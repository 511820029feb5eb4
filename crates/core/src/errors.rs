use thiserror::Error;

/// Malformed input that validation cannot report as field data. Fatal to the
/// operation that received it; callers catch it at the UI boundary.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StructuralError {
    #[error("record is not a JSON object")]
    NotAnObject,
    #[error("customer_type is missing")]
    MissingCustomerType,
    #[error("unrecognized customer_type `{0}`")]
    UnknownCustomerType(String),
    #[error("unknown field path `{0}`")]
    UnknownFieldPath(String),
    #[error("field path `{path}` does not traverse an object")]
    NotTraversable { path: String },
    #[error("field `{path}` rejected value: {reason}")]
    IncompatibleValue { path: String, reason: String },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error(transparent)]
    Structural(#[from] StructuralError),
    #[error("address index {index} is out of range for a book of {len} entries")]
    AddressIndexOutOfRange { index: usize, len: usize },
}

#[cfg(test)]
mod tests {
    use super::{DomainError, StructuralError};

    #[test]
    fn structural_errors_lift_into_domain_errors() {
        let error = DomainError::from(StructuralError::UnknownCustomerType("vendor".to_owned()));
        assert!(matches!(
            error,
            DomainError::Structural(StructuralError::UnknownCustomerType(ref raw)) if raw == "vendor"
        ));
    }
}
