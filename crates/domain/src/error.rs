//! Domain error types.

use thiserror::Error;

/// Errors raised while validating payment input.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The instructed amount is zero or negative.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// The payment reference is missing or blank.
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    /// The currency is not a three-letter ISO 4217 code.
    #[error("Invalid currency: {0}")]
    InvalidCurrency(String),
}
