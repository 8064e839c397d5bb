//! Payment saga orchestration engine.
//!
//! Drives saga instances through statically declared step graphs: levels of
//! independent steps run concurrently on a bounded worker pool, failed
//! attempts retry under a capped-exponential [`RetryPolicy`], steps can park
//! on an external [`CompletionBridge`] token without holding a worker, and
//! unrecoverable failures unwind committed steps through a LIFO
//! [`CompensationStack`]. Every transition is persisted through the
//! `instance-store` seam.

pub mod bridge;
pub mod compensation;
pub mod definition;
pub mod engine;
pub mod error;
pub mod executor;
pub mod retry;
pub mod signal;

pub use bridge::{CompletionBridge, CompletionOutcome, CompletionResult, Delivery};
pub use compensation::CompensationStack;
pub use definition::{
    SagaDefinition, SagaDefinitionBuilder, StepDescriptor, StepOutcome,
};
pub use engine::{EngineConfig, Orchestrator, SagaHandle, StatusSnapshot};
pub use error::{EngineError, Result};
pub use executor::{ActivityContext, ActivityOptions};
pub use retry::RetryPolicy;
pub use signal::{SignalHub, SignalOutcome};
