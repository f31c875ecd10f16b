// ABOUTME: Per-application deployment lock backed by open deployment records.
// ABOUTME: An application is locked while one of its records has no end time.

use chrono::Utc;
use std::sync::Arc;

use super::DeployError;
use crate::model::{DeploymentRecord, DeploymentStatus};
use crate::store::EntityStore;
use crate::types::{AppName, RecordId};

/// Acquires, inspects and releases deployment locks.
#[derive(Clone)]
pub struct LockManager {
    store: Arc<dyn EntityStore>,
}

impl std::fmt::Debug for LockManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockManager").finish_non_exhaustive()
    }
}

impl LockManager {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// The open record of `app`, if a deployment is in flight.
    pub async fn find_open_record(
        &self,
        app: &AppName,
    ) -> Result<Option<DeploymentRecord>, DeployError> {
        Ok(self.store.open_record(app).await?)
    }

    /// Start a new deployment attempt, acquiring the lock.
    ///
    /// Fails with [`DeployError::LockHeld`] if another attempt is open, even
    /// when the caller checked beforehand.
    pub async fn open(&self, app: &AppName) -> Result<DeploymentRecord, DeployError> {
        let record = DeploymentRecord::open(app);
        self.store.create_record(record.clone()).await?;
        tracing::info!(app = %app, record = %record.id, "deployment lock acquired");
        Ok(record)
    }

    /// Cancel the open attempt of `app`, if any. Returns the cancelled record.
    pub async fn force_cancel(
        &self,
        app: &AppName,
    ) -> Result<Option<DeploymentRecord>, DeployError> {
        let Some(open) = self.find_open_record(app).await? else {
            return Ok(None);
        };
        let cancelled = self.finalize(&open.id, DeploymentStatus::Cancelled).await?;
        if let Some(record) = &cancelled {
            tracing::warn!(app = %app, record = %record.id, "cancelled open deployment");
        }
        Ok(cancelled)
    }

    /// Close a record now with `status`. A record that is already closed is left as is.
    pub async fn finalize(
        &self,
        id: &RecordId,
        status: DeploymentStatus,
    ) -> Result<Option<DeploymentRecord>, DeployError> {
        let closed = self.store.close_record(id, status, Utc::now()).await?;
        if let Some(record) = &closed {
            tracing::info!(app = %record.application, record = %id, %status, "deployment lock released");
        }
        Ok(closed)
    }

    pub async fn mark_build_triggered(&self, id: &RecordId) -> Result<(), DeployError> {
        Ok(self.store.mark_build_triggered(id).await?)
    }

    /// Whether archives and config of `app` may be changed right now.
    pub async fn can_modify(&self, app: &AppName) -> Result<bool, DeployError> {
        Ok(self.find_open_record(app).await?.is_none())
    }

    /// Fail with a conflict naming the in-flight deployment if `app` is locked.
    pub async fn ensure_can_modify(&self, app: &AppName) -> Result<(), DeployError> {
        match self.find_open_record(app).await? {
            Some(record) => Err(DeployError::ModificationLocked {
                app: app.to_string(),
                record: Box::new(record),
            }),
            None => Ok(()),
        }
    }
}
