//! Atomic output files
//!
//! Reports are built fully in memory and then written once: content goes to a
//! sibling `.tmp` file which is renamed over the target, so a failed run never
//! leaves a half-written report behind.

use pvs_common::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Write bytes to `path` via temp file + rename, creating parent directories
pub fn write_atomically(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let temp_path = temp_path_for(path);
    std::fs::write(&temp_path, content)?;
    if let Err(e) = std::fs::rename(&temp_path, path) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(e.into());
    }

    debug!(path = %path.display(), bytes = content.len(), "Wrote output file");
    Ok(())
}

/// Serialize rows as CSV and write them atomically
pub fn write_csv<H, R, C>(path: &Path, headers: &[H], rows: R) -> Result<()>
where
    H: AsRef<[u8]>,
    R: IntoIterator<Item = Vec<C>>,
    C: AsRef<[u8]>,
{
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(&row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| Error::Io(e.into_error()))?;
    write_atomically(path, &bytes)
}

/// Write newline-terminated lines atomically
pub fn write_lines<S: AsRef<str>>(path: &Path, lines: &[S]) -> Result<()> {
    let mut content = String::new();
    for line in lines {
        content.push_str(line.as_ref());
        content.push('\n');
    }
    write_atomically(path, content.as_bytes())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
