use crate::error::{AppError, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Write `content` to `path` through a temp file in the same directory, then rename.
/// Readers never observe a half-written file.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent)?;

    let mut temp = tempfile::NamedTempFile::new_in(&parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path)
        .map_err(|e| AppError::Io(format!("Failed to persist {}: {}", path.display(), e.error)))?;
    Ok(())
}

/// Resolve `file` against the home directory unless it is already absolute
pub fn resolve_in_home(file: &str) -> PathBuf {
    let path = PathBuf::from(file);
    if path.is_absolute() {
        return path;
    }
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(path),
        None => path,
    }
}
