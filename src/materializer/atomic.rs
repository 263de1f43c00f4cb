//! Write-to-temp-then-rename
//!
//! The temp file lives in the destination's directory so the final rename
//! stays on one filesystem. Until [`StagedFile::commit`] runs, the
//! destination is untouched; dropping a [`StagedFile`] removes its temp file.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{Builder, TempPath};

use crate::error::{RegkitError, Result};

fn write_error(path: &Path, e: impl std::fmt::Display) -> RegkitError {
    RegkitError::Write {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}

/// Content written next to its destination, not yet renamed into place
#[derive(Debug)]
pub struct StagedFile {
    temp: TempPath,
    destination: PathBuf,
}

impl StagedFile {
    pub fn temp_path(&self) -> &Path {
        &self.temp
    }

    /// Rename the staged file over the destination
    pub fn commit(self) -> Result<PathBuf> {
        let destination = self.destination;
        self.temp
            .persist(&destination)
            .map_err(|e| write_error(&destination, e.error))?;
        Ok(destination)
    }
}

/// Stage `content` for `destination`, creating parent directories as needed.
///
/// An existing destination's permissions are carried over to the new file.
pub fn stage(destination: &Path, content: &[u8]) -> Result<StagedFile> {
    let parent = match destination.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| write_error(parent, e))?;

    let file_name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut temp = Builder::new()
        .prefix(&format!(".{file_name}."))
        .suffix(".regkit.tmp")
        .tempfile_in(parent)
        .map_err(|e| write_error(destination, e))?;

    temp.write_all(content)
        .map_err(|e| write_error(temp.path(), e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| write_error(temp.path(), e))?;

    let permissions = match fs::metadata(destination) {
        Ok(existing) => Some(existing.permissions()),
        Err(_) => default_permissions(),
    };
    if let Some(permissions) = permissions {
        fs::set_permissions(temp.path(), permissions).map_err(|e| write_error(temp.path(), e))?;
    }

    Ok(StagedFile {
        temp: temp.into_temp_path(),
        destination: destination.to_path_buf(),
    })
}

/// Temp files are created owner-only; new destinations get regular file permissions
#[cfg(unix)]
fn default_permissions() -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<fs::Permissions> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_stage_and_commit_creates_parents() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("tools/calc/tool.py");

        let staged = stage(&dest, b"x = 1\n").unwrap();
        assert!(staged.temp_path().exists());
        assert!(!dest.exists());
        assert_eq!(staged.temp_path().parent(), dest.parent());

        staged.commit().unwrap();
        assert_eq!(fs::read_to_string(&dest).unwrap(), "x = 1\n");
    }

    #[test]
    fn test_crash_before_rename_leaves_original() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("tool.py");
        fs::write(&dest, "original").unwrap();

        let staged = stage(&dest, b"replacement").unwrap();
        let temp_path = staged.temp_path().to_path_buf();
        assert_eq!(fs::read_to_string(&temp_path).unwrap(), "replacement");
        assert_eq!(fs::read_to_string(&dest).unwrap(), "original");

        drop(staged);
        assert!(!temp_path.exists());
        assert_eq!(fs::read_to_string(&dest).unwrap(), "original");
    }

    #[test]
    fn test_commit_replaces_existing() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("README.md");
        fs::write(&dest, "old").unwrap();

        stage(&dest, b"new").unwrap().commit().unwrap();
        assert_eq!(fs::read_to_string(&dest).unwrap(), "new");

        let leftovers: Vec<_> = fs::read_dir(temp.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let fresh = temp.path().join("fresh.py");
        stage(&fresh, b"").unwrap().commit().unwrap();
        assert_eq!(fs::metadata(&fresh).unwrap().permissions().mode() & 0o777, 0o644);

        let script = temp.path().join("run.sh");
        fs::write(&script, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        stage(&script, b"#!/bin/sh\necho hi\n").unwrap().commit().unwrap();
        assert_eq!(fs::metadata(&script).unwrap().permissions().mode() & 0o777, 0o755);
    }

    #[test]
    fn test_failed_commit_removes_temp_file() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("tool.py");

        let staged = stage(&dest, b"x = 1\n").unwrap();
        let temp_path = staged.temp_path().to_path_buf();
        // a non-empty directory cannot be renamed over
        fs::create_dir(&dest).unwrap();
        fs::write(dest.join("keep.txt"), "").unwrap();

        let err = staged.commit().unwrap_err();
        assert!(matches!(err, RegkitError::Write { .. }));
        assert!(!temp_path.exists());
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_parent_is_a_file() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("tools");
        fs::write(&blocker, "not a directory").unwrap();

        let err = stage(&blocker.join("tool.py"), b"").unwrap_err();
        assert!(matches!(err, RegkitError::Write { .. }));
    }
}
