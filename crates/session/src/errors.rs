use thiserror::Error;

use gearbook_core::errors::StructuralError;
use gearbook_db::RepositoryError;

/// Failures surfaced by an editing session. Validation problems never show
/// up here; they are returned as data by the validation layer.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("optimistic write rejected, cache rolled back: {0}")]
    ConflictRollback(String),
    #[error(transparent)]
    Structural(#[from] StructuralError),
    #[error("record has no id; persist it before mutating")]
    Unpersisted,
    #[error("editing session is closed")]
    Closed,
}

impl From<RepositoryError> for SessionError {
    fn from(error: RepositoryError) -> Self {
        Self::Persistence(error.to_string())
    }
}
