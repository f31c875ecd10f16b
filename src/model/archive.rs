// ABOUTME: Deployable archives and detection of the config files they embed.
// ABOUTME: Archives are zip files; embedded config lives under WEB-INF/classes/META-INF.

use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use thiserror::Error;

use super::ConfigKind;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("not a readable archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("I/O error reading archive: {0}")]
    Io(#[from] std::io::Error),
}

/// Which config kinds an archive supplies internally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFiles {
    pub xml: bool,
    pub cli: bool,
    pub yml: bool,
}

impl ConfigFiles {
    pub fn contains(&self, kind: ConfigKind) -> bool {
        match kind {
            ConfigKind::Xml => self.xml,
            ConfigKind::Cli => self.cli,
            ConfigKind::Yml => self.yml,
        }
    }

    pub fn insert(&mut self, kind: ConfigKind) {
        match kind {
            ConfigKind::Xml => self.xml = true,
            ConfigKind::Cli => self.cli = true,
            ConfigKind::Yml => self.yml = true,
        }
    }

    pub fn kinds(&self) -> impl Iterator<Item = ConfigKind> + '_ {
        ConfigKind::ALL.into_iter().filter(|k| self.contains(*k))
    }

    pub fn is_empty(&self) -> bool {
        self.kinds().next().is_none()
    }

    /// Scan archive bytes for embedded config files.
    pub fn inspect(bytes: &[u8]) -> Result<Self, ArchiveError> {
        Self::inspect_reader(Cursor::new(bytes))
    }

    fn inspect_reader<R: Read + Seek>(reader: R) -> Result<Self, ArchiveError> {
        let archive = zip::ZipArchive::new(reader)?;
        let mut found = ConfigFiles::default();
        for name in archive.file_names() {
            if let Some(kind) = ConfigKind::ALL.into_iter().find(|k| k.archive_entry() == name) {
                found.insert(kind);
            }
        }
        tracing::debug!(xml = found.xml, cli = found.cli, yml = found.yml, "inspected archive");
        Ok(found)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Archive {
    pub file_name: String,
    pub config_files: ConfigFiles,
}

impl Archive {
    pub fn new(file_name: impl Into<String>, config_files: ConfigFiles) -> Self {
        Self {
            file_name: file_name.into(),
            config_files,
        }
    }

    /// Read the embedded config file of `kind` from the archive stored at `path`.
    pub fn read_config(path: &Path, kind: ConfigKind) -> Result<Option<String>, ArchiveError> {
        let file = std::fs::File::open(path)?;
        let mut archive = zip::ZipArchive::new(file)?;
        let mut entry = match archive.by_name(&kind.archive_entry()) {
            Ok(entry) => entry,
            Err(zip::result::ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut contents = String::new();
        entry.read_to_string(&mut contents)?;
        Ok(Some(contents))
    }
}
