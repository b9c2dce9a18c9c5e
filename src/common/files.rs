//! Staged file replacement.
//!
//! A [`StagedFile`] holds the complete new content of a file in a temporary
//! sibling, already carrying the final mode and the original owner. Nothing
//! visible changes until [`StagedFile::commit`] renames it into place, so a
//! caller can stage several files and only commit once all of them staged.

use std::fs;
use std::io::Write;
use std::os::unix::fs::{fchown, MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// New content for `target`, written but not yet visible.
#[derive(Debug)]
pub struct StagedFile {
    target: PathBuf,
    temp: NamedTempFile,
}

/// Write `content` to a temporary file next to `target` with `mode`.
///
/// If `target` already exists its owner and group are copied onto the
/// staged file.
pub fn stage_file<C: AsRef<[u8]>>(target: &Path, content: C, mode: u32) -> Result<StagedFile> {
    let dir = target.parent().unwrap_or_else(|| Path::new("."));
    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut temp = tempfile::Builder::new()
        .prefix(&format!(".{}.", file_name))
        .tempfile_in(dir)
        .map_err(|e| Error::io(dir, e))?;

    let tmp_path = temp.path().to_path_buf();
    temp.write_all(content.as_ref())
        .map_err(|e| Error::io(&tmp_path, e))?;
    temp.as_file()
        .set_permissions(fs::Permissions::from_mode(mode))
        .map_err(|e| Error::io(&tmp_path, e))?;

    if let Ok(meta) = fs::metadata(target) {
        fchown(temp.as_file(), Some(meta.uid()), Some(meta.gid()))
            .map_err(|e| Error::io(&tmp_path, e))?;
    }

    temp.as_file()
        .sync_all()
        .map_err(|e| Error::io(&tmp_path, e))?;

    Ok(StagedFile {
        target: target.to_path_buf(),
        temp,
    })
}

impl StagedFile {
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Atomically replace the target with the staged content.
    pub fn commit(self) -> Result<()> {
        let target = self.target;
        self.temp
            .persist(&target)
            .map_err(|e| Error::io(&target, e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_staged_content_invisible_until_commit() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("passwd");
        fs::write(&target, "old\n").unwrap();

        let staged = stage_file(&target, "new\n", 0o644).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "old\n");

        staged.commit().unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "new\n");
    }

    #[test]
    fn test_commit_applies_mode() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("shadow");
        fs::write(&target, "").unwrap();

        stage_file(&target, "x\n", 0o600).unwrap().commit().unwrap();
        let mode = fs::metadata(&target).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_dropped_stage_leaves_no_trace() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("group");
        fs::write(&target, "root:x:0:\n").unwrap();

        drop(stage_file(&target, "junk", 0o644).unwrap());

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("group")]);
        assert_eq!(fs::read_to_string(&target).unwrap(), "root:x:0:\n");
    }

    #[test]
    fn test_stage_into_missing_dir_fails() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("nope/passwd");
        assert!(matches!(
            stage_file(&target, "x", 0o644),
            Err(Error::Io { .. })
        ));
    }
}
