// ABOUTME: Wraps the server init CLI script in a batch with generated commands.
// ABOUTME: The user's script is kept as a .bak file and restored if the rewrite fails.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Backup location for a script at `path`.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".bak");
    path.with_file_name(name)
}

/// Batch body: generated commands first, then the user's commands.
pub fn batch(commands: &[String], user_commands: &[String]) -> String {
    let mut lines = Vec::with_capacity(commands.len() + user_commands.len() + 2);
    lines.push("batch");
    lines.extend(commands.iter().map(String::as_str));
    lines.extend(user_commands.iter().map(String::as_str));
    lines.push("run-batch");
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Rewrite the script at `path` with `commands` prepended inside a batch.
///
/// Returns the backup path when an existing script was moved aside. Does
/// nothing when there are no commands.
pub fn prepend_commands(path: &Path, commands: &[String]) -> io::Result<Option<PathBuf>> {
    if commands.is_empty() {
        return Ok(None);
    }

    let mut backup = None;
    let mut user_commands = Vec::new();
    if path.exists() {
        user_commands = fs::read_to_string(path)?
            .lines()
            .map(str::to_string)
            .collect();
        let bak = backup_path(path);
        if bak.exists() {
            fs::remove_file(&bak)?;
        }
        fs::rename(path, &bak)?;
        backup = Some(bak);
    }

    if let Err(e) = fs::write(path, batch(commands, &user_commands)) {
        if let Some(bak) = &backup
            && !path.exists()
            && let Err(restore) = fs::rename(bak, path)
        {
            tracing::warn!(path = %path.display(), error = %restore, "could not restore CLI script backup");
        }
        return Err(e);
    }

    Ok(backup)
}
