// ABOUTME: Packs a staging directory into a gzip-compressed tarball for build submission.
// ABOUTME: The artifact is created in the system temp dir; the caller deletes it.

use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs;
use std::path::{Path, PathBuf};
use tar::Builder;

#[derive(Debug, thiserror::Error)]
pub enum PackagingError {
    #[error("staging directory {0} does not exist")]
    MissingDir(PathBuf),

    #[error("failed to package {dir}: {source}")]
    Io {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Pack every file under `dir` into a new `.tar.gz`, returning its path.
pub fn package_dir(dir: &Path) -> Result<PathBuf, PackagingError> {
    if !dir.is_dir() {
        return Err(PackagingError::MissingDir(dir.to_path_buf()));
    }
    let io_err = |source: std::io::Error| PackagingError::Io {
        dir: dir.to_path_buf(),
        source,
    };

    let artifact = tempfile::Builder::new()
        .prefix("shipyard-")
        .suffix(".tar.gz")
        .tempfile()
        .map_err(io_err)?;
    let (file, path) = artifact.keep().map_err(|e| io_err(e.error))?;

    if let Err(source) = write_tarball(file, dir) {
        let _ = fs::remove_file(&path);
        return Err(io_err(source));
    }

    tracing::debug!(dir = %dir.display(), artifact = %path.display(), "packaged staging directory");
    Ok(path)
}

fn write_tarball(file: fs::File, dir: &Path) -> std::io::Result<()> {
    let enc = GzEncoder::new(file, Compression::default());
    let mut builder = Builder::new(enc);
    builder.append_dir_all(".", dir)?;
    let enc = builder.into_inner()?;
    enc.finish()?;
    Ok(())
}
