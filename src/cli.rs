// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Args, Parser, Subcommand};
use shipyard::model::{ConfigKind, DatabaseKind};
use shipyard::types::AppName;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "shipyard")]
#[command(about = "Build and deploy applications on a cluster orchestrator")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print final results
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print JSON lines instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new shipyard.yml configuration file
    Init {
        /// Cluster namespace to deploy into
        #[arg(short, long)]
        namespace: Option<String>,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Log in to the cluster and reconcile deployments until interrupted
    Serve,

    /// Manage applications
    #[command(subcommand)]
    App(AppCommand),

    /// Manage an application's archives
    #[command(subcommand)]
    Archive(ArchiveCommand),

    /// Manage an application's config overrides
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Manage an application's database connections
    #[command(subcommand)]
    Db(DbCommand),

    /// Build and deploy an application
    Deploy {
        app: AppName,

        /// Cancel an in-flight deployment first
        #[arg(short, long)]
        force: bool,

        /// Rebuild an already running application
        #[arg(short, long, conflicts_with = "cancel")]
        refresh: bool,

        /// Cancel the running build instead of deploying
        #[arg(long, conflicts_with = "force")]
        cancel: bool,
    },

    /// Remove an application's builds and deployments from the cluster
    Stop { app: AppName },

    /// Show deployment, build and stage state
    Status { app: AppName },

    /// Show hostnames routed to an application
    Routes { app: AppName },

    /// Show deployment attempts, newest first
    History { app: AppName },
}

#[derive(Subcommand)]
pub enum AppCommand {
    /// Create an application
    Create { name: String },

    /// Delete an application from the cluster and locally
    Delete {
        name: AppName,

        /// Delete even while deployed or building
        #[arg(short, long)]
        force: bool,
    },

    /// List applications
    List,

    /// Show an application's archives, config and databases
    Show { name: AppName },
}

#[derive(Subcommand)]
pub enum ArchiveCommand {
    /// Upload a new .war archive
    Add { app: AppName, path: PathBuf },

    /// Replace an existing archive with a new upload of the same name
    Replace { app: AppName, path: PathBuf },

    /// Remove an archive
    Remove { app: AppName, file_name: String },

    /// List archives
    List { app: AppName },
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print an override (xml, cli or yml)
    Get { app: AppName, kind: ConfigKind },

    /// Set an override from a file
    Set {
        app: AppName,
        kind: ConfigKind,
        path: PathBuf,
    },

    /// Remove an override
    Clear { app: AppName, kind: ConfigKind },
}

#[derive(Subcommand)]
pub enum DbCommand {
    /// Add a database connection
    Add(DbAddArgs),

    /// Remove a database connection by JNDI name
    Remove { app: AppName, jndi_name: String },

    /// List database connections
    List { app: AppName },
}

#[derive(Args)]
pub struct DbAddArgs {
    pub app: AppName,

    #[arg(long)]
    pub jndi_name: String,

    #[arg(long, default_value = "postgres")]
    pub kind: DatabaseKind,

    #[arg(long)]
    pub url: String,

    #[arg(long)]
    pub username: String,

    /// Password; read from SHIPYARD_DB_PASSWORD when omitted
    #[arg(long, env = "SHIPYARD_DB_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn deploy_flags_parse() {
        let cli = Cli::try_parse_from(["shipyard", "deploy", "demo", "--force", "--refresh"]).unwrap();
        match cli.command {
            Commands::Deploy {
                app,
                force,
                refresh,
                cancel,
            } => {
                assert_eq!(app.as_str(), "demo");
                assert!(force && refresh && !cancel);
            }
            _ => panic!("expected deploy"),
        }
    }

    #[test]
    fn invalid_app_name_is_rejected() {
        assert!(Cli::try_parse_from(["shipyard", "status", "Bad_Name"]).is_err());
    }

    #[test]
    fn cancel_conflicts_with_force() {
        assert!(Cli::try_parse_from(["shipyard", "deploy", "demo", "--cancel", "--force"]).is_err());
    }
}
