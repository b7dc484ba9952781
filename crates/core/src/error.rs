use crate::runtime::RuntimeError;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// User input could not be normalized into a hostname.
    #[error("Invalid domain: {0}")]
    InvalidDomain(String),

    /// A caller passed an argument the operation does not accept.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A row the orchestrator expected to exist is missing.
    ///
    /// Raised by launch and finalize; it means an internal invariant was
    /// violated, not that the client asked for something unknown.
    #[error("Entity not found: {entity} for {key}")]
    NotFound { entity: &'static str, key: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}
