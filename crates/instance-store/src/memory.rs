use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use common::SagaId;

use crate::{Result, SagaInstance, store::InstanceStore};

/// In-memory instance store for tests and embedded runs.
///
/// Clones share the same underlying map.
#[derive(Clone, Default)]
pub struct InMemoryInstanceStore {
    instances: Arc<RwLock<HashMap<SagaId, SagaInstance>>>,
}

impl InMemoryInstanceStore {
    /// Creates a new empty in-memory instance store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored instances.
    pub async fn instance_count(&self) -> usize {
        self.instances.read().await.len()
    }

    /// Removes all stored instances.
    pub async fn clear(&self) {
        self.instances.write().await.clear();
    }
}

#[async_trait]
impl InstanceStore for InMemoryInstanceStore {
    async fn load(&self, id: &SagaId) -> Result<Option<SagaInstance>> {
        Ok(self.instances.read().await.get(id).cloned())
    }

    async fn save(&self, instance: &SagaInstance) -> Result<()> {
        self.instances
            .write()
            .await
            .insert(instance.id.clone(), instance.clone());
        Ok(())
    }
}
