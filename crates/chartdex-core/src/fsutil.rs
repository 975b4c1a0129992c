//! Filesystem helpers

use std::io::Write;
use std::path::Path;

use crate::error::{CoreError, Result};

/// Default mode for files written by chartdex
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Write `data` to `dest` so readers never observe a partial file
///
/// The content goes to a temporary file in the destination directory, is
/// flushed to disk, and is then renamed over `dest`. `mode` is applied on
/// Unix and ignored elsewhere.
pub fn atomic_write_file(dest: &Path, data: &[u8], mode: u32) -> Result<()> {
    let dir = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(".chartdex-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| CoreError::FileAccess {
            path: dir.display().to_string(),
            message: format!("failed to create temporary file: {}", e),
        })?;

    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(mode))?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    tmp.persist(dest).map_err(|e| CoreError::FileAccess {
        path: dest.display().to_string(),
        message: format!("failed to move file into place: {}", e.error),
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write_creates_file() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("index.yaml");

        atomic_write_file(&dest, b"apiVersion: v1\n", DEFAULT_FILE_MODE).unwrap();

        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "apiVersion: v1\n");
    }

    #[test]
    fn test_atomic_write_replaces_and_leaves_no_temp_files() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("index.yaml");
        std::fs::write(&dest, "old").unwrap();

        atomic_write_file(&dest, b"new", DEFAULT_FILE_MODE).unwrap();

        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "new");
        let names: Vec<_> = std::fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_atomic_write_sets_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("index.json");
        atomic_write_file(&dest, b"{}", 0o600).unwrap();

        let mode = std::fs::metadata(&dest).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_atomic_write_missing_directory() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("missing").join("index.yaml");
        assert!(atomic_write_file(&dest, b"x", DEFAULT_FILE_MODE).is_err());
    }
}
