// ABOUTME: Handlers for application, archive, config override and database commands.
// ABOUTME: Thin wrappers over the catalog that render results through Output.

use serde::Serialize;
use shipyard::error::Result;
use shipyard::model::{Application, Archive, DatabaseConnection};
use std::path::Path;

use super::Context;
use crate::cli::{AppCommand, ArchiveCommand, ConfigCommand, DbAddArgs, DbCommand};
use shipyard::error::Error;

/// Database connection as shown to users; the password is never printed.
#[derive(Serialize)]
struct DatabaseView<'a> {
    jndi_name: &'a str,
    kind: String,
    url: &'a str,
    username: &'a str,
}

impl<'a> From<&'a DatabaseConnection> for DatabaseView<'a> {
    fn from(c: &'a DatabaseConnection) -> Self {
        Self {
            jndi_name: &c.jndi_name,
            kind: c.kind.to_string(),
            url: &c.url,
            username: &c.username,
        }
    }
}

#[derive(Serialize)]
struct ApplicationView<'a> {
    name: &'a str,
    archives: &'a [Archive],
    configs: Vec<String>,
    databases: Vec<DatabaseView<'a>>,
    last_archive_change: String,
    last_config_change: String,
}

impl<'a> From<&'a Application> for ApplicationView<'a> {
    fn from(app: &'a Application) -> Self {
        Self {
            name: app.name.as_str(),
            archives: &app.archives,
            configs: app.configs.kinds().map(|k| k.to_string()).collect(),
            databases: app.databases.iter().map(DatabaseView::from).collect(),
            last_archive_change: app.last_archive_change.to_rfc3339(),
            last_config_change: app.last_config_change.to_rfc3339(),
        }
    }
}

fn archive_line(archive: &Archive) -> String {
    let kinds: Vec<String> = archive.config_files.kinds().map(|k| k.to_string()).collect();
    if kinds.is_empty() {
        archive.file_name.clone()
    } else {
        format!("{} (contains {})", archive.file_name, kinds.join(", "))
    }
}

fn file_name_of(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| Error::InvalidArgument(format!("not a file path: {}", path.display())))
}

pub async fn app(ctx: &Context, command: AppCommand) -> Result<()> {
    let catalog = ctx.catalog();
    match command {
        AppCommand::Create { name } => {
            let app = catalog.create_app(&name).await?;
            ctx.output.success(&format!("Created application {}", app.name));
        }
        AppCommand::Delete { name, force } => {
            catalog.delete_app(&name, force).await?;
            ctx.output.success(&format!("Deleted application {name}"));
        }
        AppCommand::List => {
            let apps = catalog.list_apps().await?;
            let lines: Vec<String> = apps.iter().map(|a| a.name.to_string()).collect();
            let views: Vec<ApplicationView> = apps.iter().map(ApplicationView::from).collect();
            ctx.output.data(&lines, &views);
        }
        AppCommand::Show { name } => {
            let app = catalog.get_app(&name).await?;
            let mut lines = vec![format!("Application: {}", app.name)];
            lines.push(format!("Archives: {}", app.archives.len()));
            for archive in &app.archives {
                lines.push(format!("  {}", archive_line(archive)));
            }
            let configs: Vec<String> = app.configs.kinds().map(|k| k.to_string()).collect();
            if !configs.is_empty() {
                lines.push(format!("Config overrides: {}", configs.join(", ")));
            }
            for db in &app.databases {
                lines.push(format!("Database: {} ({})", db.jndi_name, db.kind));
            }
            lines.push(format!("Last archive change: {}", app.last_archive_change.to_rfc3339()));
            lines.push(format!("Last config change: {}", app.last_config_change.to_rfc3339()));
            ctx.output.data(&lines, &ApplicationView::from(&app));
        }
    }
    Ok(())
}

pub async fn archive(ctx: &Context, command: ArchiveCommand) -> Result<()> {
    let catalog = ctx.catalog();
    match command {
        ArchiveCommand::Add { app, path } => {
            let contents = std::fs::read(&path)?;
            let archive = catalog.add_archive(&app, &file_name_of(&path)?, &contents).await?;
            ctx.output
                .success(&format!("Added {} to {app}", archive_line(&archive)));
        }
        ArchiveCommand::Replace { app, path } => {
            let contents = std::fs::read(&path)?;
            let archive = catalog
                .replace_archive(&app, &file_name_of(&path)?, &contents)
                .await?;
            ctx.output
                .success(&format!("Replaced {} in {app}", archive_line(&archive)));
        }
        ArchiveCommand::Remove { app, file_name } => {
            catalog.remove_archive(&app, &file_name).await?;
            ctx.output.success(&format!("Removed {file_name} from {app}"));
        }
        ArchiveCommand::List { app } => {
            let archives = catalog.list_archives(&app).await?;
            let lines: Vec<String> = archives.iter().map(archive_line).collect();
            ctx.output.data(&lines, &archives);
        }
    }
    Ok(())
}

pub async fn config(ctx: &Context, command: ConfigCommand) -> Result<()> {
    let catalog = ctx.catalog();
    match command {
        ConfigCommand::Get { app, kind } => match catalog.config(&app, kind).await? {
            Some(contents) => {
                let lines: Vec<String> = contents.lines().map(str::to_string).collect();
                ctx.output.data(&lines, &contents);
            }
            None => ctx.output.data(&[], &Option::<String>::None),
        },
        ConfigCommand::Set { app, kind, path } => {
            let contents = std::fs::read_to_string(&path)?;
            catalog.set_config(&app, kind, contents).await?;
            ctx.output
                .success(&format!("Set {} override for {app}", kind.file_name()));
        }
        ConfigCommand::Clear { app, kind } => {
            if catalog.clear_config(&app, kind).await? {
                ctx.output
                    .success(&format!("Cleared {} override for {app}", kind.file_name()));
            } else {
                ctx.output
                    .success(&format!("{app} has no {} override", kind.file_name()));
            }
        }
    }
    Ok(())
}

pub async fn db(ctx: &Context, command: DbCommand) -> Result<()> {
    let catalog = ctx.catalog();
    match command {
        DbCommand::Add(DbAddArgs {
            app,
            jndi_name,
            kind,
            url,
            username,
            password,
        }) => {
            catalog
                .add_database(
                    &app,
                    DatabaseConnection {
                        jndi_name: jndi_name.clone(),
                        kind,
                        url,
                        username,
                        password,
                    },
                )
                .await?;
            ctx.output
                .success(&format!("Added database {jndi_name} to {app}"));
        }
        DbCommand::Remove { app, jndi_name } => {
            catalog.remove_database(&app, &jndi_name).await?;
            ctx.output
                .success(&format!("Removed database {jndi_name} from {app}"));
        }
        DbCommand::List { app } => {
            let databases = catalog.list_databases(&app).await?;
            let lines: Vec<String> = databases
                .iter()
                .map(|d| format!("{} ({}) {}", d.jndi_name, d.kind, d.url))
                .collect();
            let views: Vec<DatabaseView> = databases.iter().map(DatabaseView::from).collect();
            ctx.output.data(&lines, &views);
        }
    }
    Ok(())
}
