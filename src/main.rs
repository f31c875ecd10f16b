// ABOUTME: Entry point for the shipyard CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use commands::Context;
use shipyard::config::{self, Config};
use shipyard::error::Result;
use shipyard::output::{Output, OutputMode};
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = OutputMode::from_flags(cli.quiet, cli.json);

    if let Err(e) = run(cli, mode).await {
        Output::new(mode).error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, mode: OutputMode) -> Result<()> {
    let cwd = env::current_dir()?;

    if let Commands::Init { namespace, force } = &cli.command {
        config::init_config(&cwd, namespace.as_deref(), *force)?;
        Output::new(mode).success(&format!("Created {}", config::CONFIG_FILENAME));
        return Ok(());
    }

    let config = Config::locate(cli.config.as_deref(), &cwd)?;
    let mut ctx = Context::new(config, Output::new(mode));

    match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Serve => commands::serve(&ctx).await,
        Commands::App(command) => commands::app(&ctx, command).await,
        Commands::Archive(command) => commands::archive(&ctx, command).await,
        Commands::Config(command) => commands::config(&ctx, command).await,
        Commands::Db(command) => commands::db(&ctx, command).await,
        Commands::Deploy {
            app,
            force,
            refresh,
            cancel,
        } => commands::deploy(&mut ctx, app, force, refresh, cancel).await,
        Commands::Stop { app } => commands::stop(&ctx, app).await,
        Commands::Status { app } => commands::status(&ctx, app).await,
        Commands::Routes { app } => commands::routes(&ctx, app).await,
        Commands::History { app } => commands::history(&ctx, app).await,
    }
}
