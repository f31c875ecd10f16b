// ABOUTME: Library root for shipyard - the deployment lifecycle manager.
// ABOUTME: The main binary is in main.rs.

pub mod catalog;
pub mod cluster;
pub mod config;
pub mod deploy;
pub mod diagnostics;
pub mod error;
pub mod model;
pub mod output;
pub mod probe;
pub mod scripts;
pub mod staging;
pub mod status;
pub mod store;
pub mod types;
pub mod workspace;
