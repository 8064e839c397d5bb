//! Payment engine error types.

use thiserror::Error;

use domain::DomainError;
use orchestrator::EngineError;

/// Errors raised by the payment engine's public surface.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The payment request failed validation.
    #[error("Invalid payment: {0}")]
    Domain(#[from] DomainError),

    /// The orchestration engine rejected the operation.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Convenience type alias for payment engine results.
pub type Result<T> = std::result::Result<T, PaymentError>;
