// ABOUTME: Error type for deployment lifecycle operations with SNAFU context selectors.
// ABOUTME: kind() classifies errors as not-found, conflict or infrastructure failures.

use snafu::Snafu;
use std::path::PathBuf;

use crate::cluster::ClusterError;
use crate::model::{ArchiveError, BuildState, ConfigKind, DeploymentRecord, DeploymentState};
use crate::scripts::ScriptError;
use crate::staging::{PackagingError, StagingError};
use crate::store::StoreError;
use crate::types::{AppNameError, BuildName};

/// Errors from catalog mutations, deploys and status queries.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum DeployError {
    #[snafu(display("no application called '{name}'"))]
    ApplicationNotFound { name: String },

    #[snafu(display("application '{app}' has no archive called '{file_name}'"))]
    ArchiveNotFound { app: String, file_name: String },

    #[snafu(display("application '{app}' has no database connection '{jndi_name}'"))]
    DatabaseNotFound { app: String, jndi_name: String },

    #[snafu(display("there is already an application called '{name}'"))]
    ApplicationExists { name: String },

    #[snafu(display("invalid application name: {source}"))]
    InvalidName { source: AppNameError },

    #[snafu(display("application '{app}' already has an archive called '{file_name}'"))]
    ArchiveExists { app: String, file_name: String },

    #[snafu(display("only .war archives are supported, got '{file_name}'"))]
    UnsupportedArchive { file_name: String },

    #[snafu(display("'{file_name}' is not a valid archive: {source}"))]
    InvalidArchive {
        file_name: String,
        source: ArchiveError,
    },

    #[snafu(display(
        "'{file_name}' contains {} which is already supplied by '{existing}' in application '{app}'",
        kind.file_name()
    ))]
    DuplicateConfigKind {
        app: String,
        file_name: String,
        kind: ConfigKind,
        existing: String,
    },

    #[snafu(display("application '{app}' already has a database connection '{jndi_name}'"))]
    DatabaseExists { app: String, jndi_name: String },

    #[snafu(display("application '{app}' has no archives to deploy"))]
    NoArchives { app: String },

    #[snafu(display("can only refresh a running application; '{app}' is {state}"))]
    RefreshNotRunning { app: String, state: DeploymentState },

    #[snafu(display("'{app}' is already building/deploying ({record}); use force to override"))]
    LockHeld {
        app: String,
        record: Box<DeploymentRecord>,
    },

    #[snafu(display("'{app}' cannot be modified while a deployment is in progress ({record})"))]
    ModificationLocked {
        app: String,
        record: Box<DeploymentRecord>,
    },

    #[snafu(display(
        "'{app}' is active (deployment {deployment}, build {build}); use force to delete"
    ))]
    ApplicationActive {
        app: String,
        deployment: DeploymentState,
        build: BuildState,
    },

    #[snafu(display("store error: {source}"))]
    Store { source: StoreError },

    /// The build is running on the cluster but its record was not updated.
    #[snafu(display("build {build} of '{app}' was submitted but could not be recorded: {source}"))]
    BuildNotRecorded {
        app: String,
        build: BuildName,
        source: Box<DeployError>,
    },

    #[snafu(display("cluster error: {source}"))]
    Cluster { source: ClusterError },

    #[snafu(display("script error: {source}"))]
    Script { source: ScriptError },

    #[snafu(display("failed to stage config: {source}"))]
    Staging { source: StagingError },

    #[snafu(display("failed to package build input: {source}"))]
    Packaging { source: PackagingError },

    #[snafu(display("workspace error at {}: {source}", path.display()))]
    Workspace {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployErrorKind {
    /// An application, archive or database connection does not exist.
    NotFound,
    /// The request conflicts with current state or is invalid. Nothing was changed.
    Conflict,
    /// An external collaborator failed.
    Infrastructure,
}

impl DeployError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> DeployErrorKind {
        match self {
            DeployError::ApplicationNotFound { .. }
            | DeployError::ArchiveNotFound { .. }
            | DeployError::DatabaseNotFound { .. } => DeployErrorKind::NotFound,

            DeployError::ApplicationExists { .. }
            | DeployError::InvalidName { .. }
            | DeployError::ArchiveExists { .. }
            | DeployError::UnsupportedArchive { .. }
            | DeployError::InvalidArchive { .. }
            | DeployError::DuplicateConfigKind { .. }
            | DeployError::DatabaseExists { .. }
            | DeployError::NoArchives { .. }
            | DeployError::RefreshNotRunning { .. }
            | DeployError::LockHeld { .. }
            | DeployError::ModificationLocked { .. }
            | DeployError::ApplicationActive { .. } => DeployErrorKind::Conflict,

            DeployError::Store { .. }
            | DeployError::BuildNotRecorded { .. }
            | DeployError::Cluster { .. }
            | DeployError::Script { .. }
            | DeployError::Staging { .. }
            | DeployError::Packaging { .. }
            | DeployError::Workspace { .. } => DeployErrorKind::Infrastructure,
        }
    }

    /// The open deployment that blocked the request, for lock conflicts.
    pub fn blocking_record(&self) -> Option<&DeploymentRecord> {
        match self {
            DeployError::LockHeld { record, .. } | DeployError::ModificationLocked { record, .. } => {
                Some(record)
            }
            _ => None,
        }
    }
}

impl From<StoreError> for DeployError {
    fn from(source: StoreError) -> Self {
        match source {
            StoreError::ApplicationNotFound(name) => DeployError::ApplicationNotFound { name },
            StoreError::ApplicationExists(name) => DeployError::ApplicationExists { name },
            StoreError::LockHeld { app, record } => DeployError::LockHeld { app, record },
            source => DeployError::Store { source },
        }
    }
}

impl From<ClusterError> for DeployError {
    fn from(source: ClusterError) -> Self {
        DeployError::Cluster { source }
    }
}

impl From<ScriptError> for DeployError {
    fn from(source: ScriptError) -> Self {
        DeployError::Script { source }
    }
}

impl From<StagingError> for DeployError {
    fn from(source: StagingError) -> Self {
        DeployError::Staging { source }
    }
}

impl From<PackagingError> for DeployError {
    fn from(source: PackagingError) -> Self {
        DeployError::Packaging { source }
    }
}

impl From<AppNameError> for DeployError {
    fn from(source: AppNameError) -> Self {
        DeployError::InvalidName { source }
    }
}
