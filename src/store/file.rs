// ABOUTME: JSON state-file entity store for the command-line front end.
// ABOUTME: Every operation loads, mutates and rewrites the file while holding a lock file.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use super::snapshot::Snapshot;
use super::{ApplicationEdit, EntityStore, StoreError};
use crate::model::{Application, DeploymentRecord, DeploymentStatus};
use crate::types::{AppName, RecordId};

/// How long to wait for another process to release the state lock.
const LOCK_TIMEOUT: Duration = Duration::from_secs(10);

const LOCK_RETRY: Duration = Duration::from_millis(5);

/// A lock file this old was left behind by a process that died holding it.
const STALE_LOCK: Duration = Duration::from_secs(60);

/// Store persisted as a single JSON document.
///
/// Every operation holds `<path>.lock`, created atomically, from load to
/// save, so separate processes sharing the file never interleave. The mutex
/// serializes access within one process. Writes go through a temporary file
/// and a rename so readers never observe a torn document.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `<path><suffix>`, next to the state file.
    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(suffix);
        PathBuf::from(name)
    }

    fn load(&self) -> Result<Snapshot, StoreError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Snapshot::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let tmp = self.sibling(".tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(snapshot)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn lock(&self) -> Result<LockFile, StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        LockFile::acquire(self.sibling(".lock"))
    }

    fn read<T>(&self, f: impl FnOnce(&Snapshot) -> T) -> Result<T, StoreError> {
        let _guard = self.guard.lock();
        let _lock = self.lock()?;
        let snapshot = self.load()?;
        Ok(f(&snapshot))
    }

    fn write<T>(
        &self,
        f: impl FnOnce(&mut Snapshot) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let _guard = self.guard.lock();
        let _lock = self.lock()?;
        let mut snapshot = self.load()?;
        let value = f(&mut snapshot)?;
        self.save(&snapshot)?;
        Ok(value)
    }
}

/// Exclusive hold on the state file, released when dropped.
#[derive(Debug)]
struct LockFile {
    path: PathBuf,
}

impl LockFile {
    /// Create the lock file, waiting while another holder has it.
    ///
    /// `create_new` fails if the file exists, so at most one process succeeds.
    /// Holders that died without cleaning up are broken after `STALE_LOCK`.
    fn acquire(path: PathBuf) -> Result<Self, StoreError> {
        let deadline = Instant::now() + LOCK_TIMEOUT;
        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    writeln!(
                        file,
                        "{} {}",
                        gethostname::gethostname().to_string_lossy(),
                        std::process::id()
                    )
                    .ok();
                    return Ok(Self { path });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
                Err(e) => return Err(e.into()),
            }

            if is_stale(&path) {
                tracing::warn!(path = %path.display(), "breaking stale state lock");
                match fs::remove_file(&path) {
                    Err(e) if e.kind() != ErrorKind::NotFound => return Err(e.into()),
                    _ => continue,
                }
            }
            if Instant::now() >= deadline {
                return Err(StoreError::Busy(path));
            }
            std::thread::sleep(LOCK_RETRY);
        }
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to release state lock");
        }
    }
}

fn is_stale(path: &Path) -> bool {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .is_some_and(|age| age > STALE_LOCK)
}

#[async_trait]
impl EntityStore for FileStore {
    async fn create_application(&self, app: Application) -> Result<(), StoreError> {
        self.write(|s| s.create_application(app))
    }

    async fn application(&self, name: &AppName) -> Result<Option<Application>, StoreError> {
        self.read(|s| s.application(name))
    }

    async fn applications(&self) -> Result<Vec<Application>, StoreError> {
        self.read(|s| s.applications())
    }

    async fn update_application(
        &self,
        name: &AppName,
        edit: ApplicationEdit<'_>,
    ) -> Result<bool, StoreError> {
        self.write(|s| s.update_application(name, edit))
    }

    async fn delete_application(&self, name: &AppName) -> Result<(), StoreError> {
        self.write(|s| s.delete_application(name))
    }

    async fn create_record(&self, record: DeploymentRecord) -> Result<(), StoreError> {
        self.write(|s| s.create_record(record))
    }

    async fn mark_build_triggered(&self, id: &RecordId) -> Result<(), StoreError> {
        self.write(|s| s.mark_build_triggered(id))
    }

    async fn close_record(
        &self,
        id: &RecordId,
        status: DeploymentStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<DeploymentRecord>, StoreError> {
        self.write(|s| s.close_record(id, status, at))
    }

    async fn open_record(&self, name: &AppName) -> Result<Option<DeploymentRecord>, StoreError> {
        self.read(|s| s.open_record(name))
    }

    async fn open_records(&self) -> Result<Vec<DeploymentRecord>, StoreError> {
        self.read(|s| s.open_records())
    }

    async fn latest_completed_record(
        &self,
        name: &AppName,
    ) -> Result<Option<DeploymentRecord>, StoreError> {
        self.read(|s| s.latest_completed_record(name))
    }

    async fn records(&self, name: &AppName) -> Result<Vec<DeploymentRecord>, StoreError> {
        self.read(|s| s.records(name))
    }
}
