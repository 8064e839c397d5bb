use async_trait::async_trait;

use common::SagaId;

use crate::{Result, SagaInstance};

/// Persistence seam for saga instance records.
///
/// The engine writes through this trait at every save-point: on start, after
/// each committed step group, when a step parks on a completion token, after
/// each executed compensation and on the terminal transition. `save` must be
/// an upsert keyed by the instance id.
#[async_trait]
pub trait InstanceStore: Send + Sync {
    /// Loads an instance by id, `None` when no record exists.
    async fn load(&self, id: &SagaId) -> Result<Option<SagaInstance>>;

    /// Inserts or replaces the instance record.
    async fn save(&self, instance: &SagaInstance) -> Result<()>;
}
