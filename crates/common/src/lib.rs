//! Shared identifiers and the failure taxonomy used across the payment
//! saga engine.

pub mod error;
pub mod types;

pub use error::{ActivityError, ErrorKind};
pub use types::{CompletionToken, SagaId};
