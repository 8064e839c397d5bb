//! Payment processing pipelines built on the saga orchestrator.
//!
//! Four saga definitions — domestic, cross-border, refund and reporting —
//! share one [`PaymentContext`] and one collaborator set ([`Services`]).
//! [`PaymentEngine`] wires them to the orchestrator and chains detached
//! child sagas (refund after a failed post, report after a refund). The
//! [`BatchScheduler`] feeds the engine synthetic domestic payments on a
//! timer.

pub mod batch;
pub mod context;
pub mod engine;
pub mod error;
pub mod sagas;
pub mod services;
pub mod steps;

pub use batch::{BatchScheduler, BatchSummary, PaymentIntake};
pub use context::{ChainKind, ChainRequest, PaymentContext, Services};
pub use engine::{PaymentEngine, PaymentType};
pub use error::{PaymentError, Result};
