//! Editing-session services: debounced autosave, optimistic field writes
//! with rollback, and live engagement score synchronization.

pub mod autosave;
pub mod errors;
pub mod mutation;
pub mod score;

pub use autosave::{AutosaveCoordinator, AutosaveStatus};
pub use errors::SessionError;
pub use mutation::OptimisticMutationCache;
pub use score::EngagementScoreSynchronizer;
