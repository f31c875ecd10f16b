// ABOUTME: In-memory entity store.
// ABOUTME: Holds state for the life of the process only; used by tests and embedders.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::snapshot::Snapshot;
use super::{ApplicationEdit, EntityStore, StoreError};
use crate::model::{Application, DeploymentRecord, DeploymentStatus};
use crate::types::{AppName, RecordId};

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<Snapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn create_application(&self, app: Application) -> Result<(), StoreError> {
        self.state.write().create_application(app)
    }

    async fn application(&self, name: &AppName) -> Result<Option<Application>, StoreError> {
        Ok(self.state.read().application(name))
    }

    async fn applications(&self) -> Result<Vec<Application>, StoreError> {
        Ok(self.state.read().applications())
    }

    async fn update_application(
        &self,
        name: &AppName,
        edit: ApplicationEdit<'_>,
    ) -> Result<bool, StoreError> {
        self.state.write().update_application(name, edit)
    }

    async fn delete_application(&self, name: &AppName) -> Result<(), StoreError> {
        self.state.write().delete_application(name)
    }

    async fn create_record(&self, record: DeploymentRecord) -> Result<(), StoreError> {
        self.state.write().create_record(record)
    }

    async fn mark_build_triggered(&self, id: &RecordId) -> Result<(), StoreError> {
        self.state.write().mark_build_triggered(id)
    }

    async fn close_record(
        &self,
        id: &RecordId,
        status: DeploymentStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<DeploymentRecord>, StoreError> {
        self.state.write().close_record(id, status, at)
    }

    async fn open_record(&self, name: &AppName) -> Result<Option<DeploymentRecord>, StoreError> {
        Ok(self.state.read().open_record(name))
    }

    async fn open_records(&self) -> Result<Vec<DeploymentRecord>, StoreError> {
        Ok(self.state.read().open_records())
    }

    async fn latest_completed_record(
        &self,
        name: &AppName,
    ) -> Result<Option<DeploymentRecord>, StoreError> {
        Ok(self.state.read().latest_completed_record(name))
    }

    async fn records(&self, name: &AppName) -> Result<Vec<DeploymentRecord>, StoreError> {
        Ok(self.state.read().records(name))
    }
}
