//! Record store for local deployment metadata

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

use crate::models::{DeploymentRecord, NewDeployment};

/// Storage backend for deployment records
///
/// Records are append-only: there is no update or delete.
#[async_trait]
pub trait DeploymentStore: Send + Sync {
    /// Assign the next id and store a pending record
    async fn create(&self, deployment: NewDeployment) -> DeploymentRecord;

    async fn get(&self, id: u64) -> Option<DeploymentRecord>;

    /// All records in id order
    async fn list(&self) -> Vec<DeploymentRecord>;
}

/// Volatile in-memory store; contents are lost on restart
pub struct MemoryStore {
    next_id: AtomicU64,
    deployments: RwLock<BTreeMap<u64, DeploymentRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            deployments: RwLock::new(BTreeMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeploymentStore for MemoryStore {
    async fn create(&self, deployment: NewDeployment) -> DeploymentRecord {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let record = DeploymentRecord::pending(id, deployment);

        self.deployments.write().await.insert(id, record.clone());

        debug!("Stored deployment record {} ({})", id, record.name);
        record
    }

    async fn get(&self, id: u64) -> Option<DeploymentRecord> {
        self.deployments.read().await.get(&id).cloned()
    }

    async fn list(&self) -> Vec<DeploymentRecord> {
        self.deployments.read().await.values().cloned().collect()
    }
}
