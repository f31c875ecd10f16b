// ABOUTME: Type-safe identifiers and validated domain types.
// ABOUTME: Uses phantom types to keep record and build identifiers apart.

mod app_name;
mod id;

pub use app_name::{AppName, AppNameError};
pub use id::{BuildName, Id, RecordId};
