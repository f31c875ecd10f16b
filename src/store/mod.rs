// ABOUTME: Entity store for applications and deployment records.
// ABOUTME: Defines the EntityStore trait plus in-memory and JSON file backends.

mod file;
mod memory;
mod snapshot;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

use crate::model::{Application, DeploymentRecord, DeploymentStatus};
use crate::types::{AppName, RecordId};

/// Errors from the entity store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("there is already an application called '{0}'")]
    ApplicationExists(String),

    #[error("no application called '{0}'")]
    ApplicationNotFound(String),

    #[error("no deployment record with id {0}")]
    RecordNotFound(String),

    /// An open record already exists for the application.
    #[error("'{app}' already has an open deployment: {record}")]
    LockHeld {
        app: String,
        record: Box<DeploymentRecord>,
    },

    #[error("timed out waiting for the state lock {}", .0.display())]
    Busy(PathBuf),

    #[error("state file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("state file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// A change to one application, applied under the store's write lock.
///
/// Returning `false` abandons the change and leaves the stored application as it was.
pub type ApplicationEdit<'a> = Box<dyn FnOnce(&mut Application) -> bool + Send + 'a>;

/// Persistence for applications and their deployment records.
///
/// Implementations must make `create_record` and `update_application` atomic
/// with respect to the open-record check: at most one record per application
/// may have no end time, and no application changes while one is open.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Persist a new application. Fails if the name is taken.
    async fn create_application(&self, app: Application) -> Result<(), StoreError>;

    async fn application(&self, name: &AppName) -> Result<Option<Application>, StoreError>;

    /// All applications, ordered by name.
    async fn applications(&self) -> Result<Vec<Application>, StoreError>;

    /// Apply `edit` to an application atomically.
    ///
    /// Refuses with `LockHeld` while the application has an open record, so
    /// the check and the change cannot interleave with a deploy starting.
    /// Returns whether the edit was kept.
    async fn update_application(
        &self,
        name: &AppName,
        edit: ApplicationEdit<'_>,
    ) -> Result<bool, StoreError>;

    /// Delete an application together with all of its deployment records.
    async fn delete_application(&self, name: &AppName) -> Result<(), StoreError>;

    /// Insert a new open record, refusing if the application already has one.
    async fn create_record(&self, record: DeploymentRecord) -> Result<(), StoreError>;

    async fn mark_build_triggered(&self, id: &RecordId) -> Result<(), StoreError>;

    /// Close a record if it is still open.
    ///
    /// Returns the closed record, or `None` if it had already been closed.
    async fn close_record(
        &self,
        id: &RecordId,
        status: DeploymentStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<DeploymentRecord>, StoreError>;

    /// The record of `name` with no end time, if any.
    async fn open_record(&self, name: &AppName) -> Result<Option<DeploymentRecord>, StoreError>;

    /// Every open record across all applications.
    async fn open_records(&self) -> Result<Vec<DeploymentRecord>, StoreError>;

    /// Most recent COMPLETED record of `name` by start time.
    async fn latest_completed_record(
        &self,
        name: &AppName,
    ) -> Result<Option<DeploymentRecord>, StoreError>;

    /// All records of `name`, newest first.
    async fn records(&self, name: &AppName) -> Result<Vec<DeploymentRecord>, StoreError>;
}
