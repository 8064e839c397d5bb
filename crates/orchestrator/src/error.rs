//! Engine error types.

use thiserror::Error;

use common::SagaId;
use instance_store::StoreError;

/// Errors raised by the orchestrator's public surface.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A saga with this id already exists.
    #[error("Saga '{0}' has already been started")]
    AlreadyStarted(SagaId),

    /// No saga instance with this id.
    #[error("Saga not found: {0}")]
    NotFound(SagaId),

    /// The instance store failed.
    #[error("Instance store error: {0}")]
    Store(#[from] StoreError),
}

/// Convenience type alias for engine results.
pub type Result<T> = std::result::Result<T, EngineError>;
