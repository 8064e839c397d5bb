//! Durable records of saga executions.
//!
//! A [`SagaInstance`] is the persistent view of one pipeline run: its status,
//! the steps that committed, the completion token it is parked on (if any),
//! the failure that ended it and the compensations that ran. The engine
//! writes the record through the [`InstanceStore`] trait at every save-point;
//! an in-memory store backs tests and embedded runs, PostgreSQL backs
//! production.

pub mod error;
pub mod instance;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use instance::{CompensationRecord, FailureDetail, SagaInstance, SagaStatus, SagaType};
pub use memory::InMemoryInstanceStore;
pub use postgres::PgInstanceStore;
pub use store::InstanceStore;
