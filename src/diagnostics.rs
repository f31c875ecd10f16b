// ABOUTME: Diagnostics accumulator for non-fatal warnings during a deploy.
// ABOUTME: Cleanup failures are collected here and logged instead of failing the deploy.

use std::path::Path;

/// Collects non-fatal warnings during deployment operations.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!(kind = ?warning.kind, "{}", warning.message);
        self.warnings.push(warning);
    }

    /// Get all collected warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Check if any warnings were collected.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Remove a file, recording a warning instead of failing.
    ///
    /// A file that is already gone is not a failure.
    pub fn remove_file(&mut self, path: &Path, kind: WarningKind) {
        match std::fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => self.warn(Warning {
                kind,
                message: format!("could not delete {}: {e}", path.display()),
            }),
        }
    }
}

/// A non-fatal warning collected during deployment.
#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

/// Categories of warnings that can occur during deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// Temporary build artifact could not be deleted.
    ArtifactCleanup,
    /// A config file written into the staging directory could not be deleted.
    StagedFileCleanup,
}
