// ABOUTME: Domain model for managed applications and their deployment history.
// ABOUTME: Applications own archives, config overrides, database connections and records.

mod application;
mod archive;
mod config_kind;
mod database;
mod record;
mod state;

pub use application::{Application, ConfigBlobs};
pub use archive::{Archive, ArchiveError, ConfigFiles};
pub use config_kind::{ConfigKind, ParseConfigKindError};
pub use database::{DatabaseConnection, DatabaseKind, ParseDatabaseKindError};
pub use record::{DeploymentRecord, DeploymentStatus};
pub use state::{AppState, BuildState, DeploymentState, StageState};
