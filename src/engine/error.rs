use thiserror::Error;

use crate::database::StoreError;

/// Domain error taxonomy for the role-transition engine.
///
/// Every variant is raised before or during the update transaction; a
/// returned error always means the graph was left untouched (the session
/// rolls back on drop). The engine performs no retries - role changes are
/// not safe to blindly reapply.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed or missing required field in the request payload.
    #[error("{0}")]
    Validation(String),

    /// Caller lacks permission for the requested change.
    #[error("{0}")]
    Authorization(String),

    /// Referenced user or department does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Duplicate email or otherwise inconsistent state.
    #[error("{0}")]
    Conflict(String),

    /// An organizational rule forbids the change (e.g. no department head
    /// exists in the target department, or a self-reference was requested).
    #[error("{0}")]
    DomainRule(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
