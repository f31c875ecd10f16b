// ABOUTME: Materializes an application's resolved config files into its staging directory.
// ABOUTME: Application blobs override archive files; database connections adjust xml and cli.

mod cli_script;
mod packaging;
mod server_config;

pub use cli_script::{backup_path, prepend_commands};
pub use packaging::{PackagingError, package_dir};
pub use server_config::{ServerConfigError, merge_layers, parse_layers};

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::model::{Application, Archive, ArchiveError, ConfigKind, DatabaseConnection};

#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read embedded config from {archive}: {source}")]
    Archive {
        archive: String,
        #[source]
        source: ArchiveError,
    },

    #[error("invalid server-config.xml: {source}")]
    ServerConfig {
        #[from]
        source: ServerConfigError,
    },
}

/// Files written into a staging directory that must be removed after packaging.
#[derive(Debug, Default)]
pub struct StagedFiles {
    paths: Vec<PathBuf>,
}

impl StagedFiles {
    pub fn push(&mut self, path: PathBuf) {
        if !self.paths.contains(&path) {
            self.paths.push(path);
        }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Write the resolved config of `app` into `dir`, recording every file written.
///
/// `staged` is filled in as files are written so that a partial failure can
/// still be cleaned up by the caller.
pub fn materialize(
    app: &Application,
    dir: &Path,
    staged: &mut StagedFiles,
) -> Result<(), StagingError> {
    for kind in app.configs.kinds() {
        if let Some(contents) = app.configs.get(kind) {
            let path = dir.join(kind.file_name());
            write(&path, contents)?;
            staged.push(path);
        }
    }

    if !app.databases.is_empty() {
        adjust_for_databases(app, dir, staged)?;
    }

    tracing::debug!(app = %app.name, files = staged.paths().len(), "staged config files");
    Ok(())
}

fn adjust_for_databases(
    app: &Application,
    dir: &Path,
    staged: &mut StagedFiles,
) -> Result<(), StagingError> {
    let xml_path = dir.join(ConfigKind::Xml.file_name());
    let base = current_contents(app, dir, ConfigKind::Xml)?;
    let merged = merge_layers(base.as_deref(), &layers(&app.databases))?;
    write(&xml_path, &merged)?;
    staged.push(xml_path);

    let cli_path = dir.join(ConfigKind::Cli.file_name());
    if !cli_path.exists()
        && let Some(embedded) = current_contents(app, dir, ConfigKind::Cli)?
    {
        write(&cli_path, &embedded)?;
    }
    let backup = prepend_commands(&cli_path, &commands(&app.databases)).map_err(|source| {
        StagingError::Write {
            path: cli_path.clone(),
            source,
        }
    })?;
    staged.push(cli_path);
    if let Some(backup) = backup {
        staged.push(backup);
    }
    Ok(())
}

/// Contents of `kind` as the build would see it: the staged file if one was
/// written, else the copy embedded in whichever archive supplies it.
fn current_contents(
    app: &Application,
    dir: &Path,
    kind: ConfigKind,
) -> Result<Option<String>, StagingError> {
    let staged = dir.join(kind.file_name());
    if staged.exists() {
        return fs::read_to_string(&staged)
            .map(Some)
            .map_err(|source| StagingError::Write {
                path: staged,
                source,
            });
    }
    let Some(archive) = app.archive_supplying(kind, "") else {
        return Ok(None);
    };
    Archive::read_config(&dir.join(&archive.file_name), kind).map_err(|source| {
        StagingError::Archive {
            archive: archive.file_name.clone(),
            source,
        }
    })
}

/// Server layers required by the connections, deduplicated and sorted.
pub fn layers(connections: &[DatabaseConnection]) -> Vec<String> {
    connections
        .iter()
        .map(|c| c.kind.layer().to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// CLI operations provisioning the connections: one driver per kind, then one
/// datasource per connection.
pub fn commands(connections: &[DatabaseConnection]) -> Vec<String> {
    let kinds: BTreeSet<_> = connections.iter().map(|c| c.kind).collect();
    let drivers = kinds.into_iter().map(|kind| {
        format!(
            "/subsystem=datasources/jdbc-driver={name}:add(driver-name=\"{name}\", driver-module-name=\"{}\", driver-xa-datasource-class-name=\"{}\")",
            kind.module(),
            kind.xa_datasource_class(),
            name = kind.driver_name(),
        )
    });
    let datasources = connections.iter().map(|c| {
        format!(
            "/subsystem=datasources/data-source=\"{jndi}\":add(jndi-name=\"{jndi}\", user-name=\"{}\", password=\"{}\", driver-name=\"{}\", connection-url=\"{}\")",
            c.username,
            c.password,
            c.kind.driver_name(),
            c.url,
            jndi = c.jndi_name,
        )
    });
    drivers.chain(datasources).collect()
}

fn write(path: &Path, contents: &str) -> Result<(), StagingError> {
    fs::write(path, contents).map_err(|source| StagingError::Write {
        path: path.to_path_buf(),
        source,
    })
}
