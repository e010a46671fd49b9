use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::{
    history::{HistoryStore, StoreError},
    models::Reading,
};

/// In-process, append-only [`HistoryStore`].
///
/// Wrapped in `Arc` so it can be cheaply cloned and shared across tasks; every
/// clone sees the same archive. Used for local runs (`HISTORY_BACKEND=memory`)
/// and tests.
#[derive(Clone, Default)]
pub struct InMemoryHistoryStore {
    inner: Arc<RwLock<Vec<Reading>>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every archived reading, in insertion order.
    pub async fn all(&self) -> Vec<Reading> {
        self.inner.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Number of archived entries carrying `id`; greater than one after redelivery.
    pub async fn count_by_id(&self, id: Uuid) -> usize {
        self.inner.read().await.iter().filter(|r| r.id == id).count()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn add(&self, reading: &Reading) -> Result<(), StoreError> {
        self.inner.write().await.push(reading.clone());
        Ok(())
    }
}
