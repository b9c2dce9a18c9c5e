//! Recursive ownership sweep with excluded subtrees.
//!
//! Symlinks are never followed: the walk does not descend through them and
//! ownership is changed with `lchown`, so only the link itself is touched.

use std::fs;
use std::io;
use std::os::unix::fs::lchown;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::SweepErrors;

/// Lexically normalize a path: drop `.` and empty components and resolve
/// `..` against the preceding component. The filesystem is not consulted.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Paths excluded from the sweep, each covering its whole subtree.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    paths: Vec<PathBuf>,
}

impl ExclusionSet {
    /// Build from configured paths; empty entries are ignored.
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let paths = paths
            .into_iter()
            .filter(|p| !p.as_ref().as_os_str().is_empty())
            .map(|p| normalize(p.as_ref()))
            .collect();
        Self { paths }
    }

    /// True if `path` equals an excluded path or lies beneath one.
    ///
    /// Matching is per component, so `/data/cache` does not cover
    /// `/data/cachefile`.
    pub fn contains(&self, path: &Path) -> bool {
        let path = normalize(path);
        self.paths.iter().any(|ex| path.starts_with(ex))
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Changes ownership of a single filesystem object.
pub trait Chown {
    fn chown(&mut self, path: &Path, uid: u32, gid: u32) -> io::Result<()>;
}

/// `lchown(2)`: symlinks themselves, never their targets.
#[derive(Debug, Default, Clone, Copy)]
pub struct Lchown;

impl Chown for Lchown {
    fn chown(&mut self, path: &Path, uid: u32, gid: u32) -> io::Result<()> {
        lchown(path, Some(uid), Some(gid))
    }
}

/// Counters for one sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Entries yielded by the walk, excluded ones included.
    pub visited: usize,
    /// Entries whose ownership was changed.
    pub changed: usize,
    /// Excluded directories whose subtree was not walked.
    pub pruned: usize,
    /// Excluded non-directories.
    pub skipped: usize,
}

/// Sweep every root with `lchown`, returning all per-path failures jointly.
pub fn chown_dirs<R, P>(
    roots: R,
    excludes: &ExclusionSet,
    uid: u32,
    gid: u32,
) -> Result<SweepReport, SweepErrors>
where
    R: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let (report, errors) = sweep(roots, excludes, uid, gid, &mut Lchown);
    if errors.is_empty() {
        Ok(report)
    } else {
        Err(errors)
    }
}

/// Walk each root depth-first and apply `chown` to every non-excluded entry.
///
/// Empty and excluded roots are skipped, as are roots that do not exist.
/// Any other failure is recorded and the walk carries on.
pub fn sweep<R, P, C>(
    roots: R,
    excludes: &ExclusionSet,
    uid: u32,
    gid: u32,
    chown: &mut C,
) -> (SweepReport, SweepErrors)
where
    R: IntoIterator<Item = P>,
    P: AsRef<Path>,
    C: Chown,
{
    let mut report = SweepReport::default();
    let mut errors = SweepErrors::default();
    let mut seen: Vec<PathBuf> = Vec::new();

    for root in roots {
        let root = root.as_ref();
        if root.as_os_str().is_empty() {
            continue;
        }
        let root = normalize(root);
        if seen.contains(&root) {
            continue;
        }
        seen.push(root.clone());

        if excludes.contains(&root) {
            debug!(root = %root.display(), "root is excluded");
            continue;
        }

        match fs::symlink_metadata(&root) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(root = %root.display(), "root does not exist, skipping");
                continue;
            }
            Err(e) => {
                errors.push(&root, e);
                continue;
            }
        }

        let mut walk = WalkDir::new(&root)
            .follow_links(false)
            .follow_root_links(false)
            .into_iter();

        while let Some(entry) = walk.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
                    let err = e
                        .into_io_error()
                        .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "walk failed"));
                    errors.push(path, err);
                    continue;
                }
            };
            report.visited += 1;

            if excludes.contains(entry.path()) {
                if entry.file_type().is_dir() {
                    walk.skip_current_dir();
                    report.pruned += 1;
                } else {
                    report.skipped += 1;
                }
                continue;
            }

            match chown.chown(entry.path(), uid, gid) {
                Ok(()) => report.changed += 1,
                Err(e) => errors.push(entry.path(), e),
            }
        }
    }

    for (path, err) in &errors.failures {
        warn!(path = %path.display(), error = %err, "chown failed");
    }

    (report, errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/data//cache/")), PathBuf::from("/data/cache"));
        assert_eq!(normalize(Path::new("/data/./a/../b")), PathBuf::from("/data/b"));
        assert_eq!(normalize(Path::new("/..")), PathBuf::from("/"));
        assert_eq!(normalize(Path::new("a/../..")), PathBuf::from(".."));
        assert_eq!(normalize(Path::new("./")), PathBuf::from("."));
    }

    #[test]
    fn test_exclusion_exact_and_descendant() {
        let ex = ExclusionSet::new(["/data/cache"]);
        assert!(ex.contains(Path::new("/data/cache")));
        assert!(ex.contains(Path::new("/data/cache/x/y")));
        assert!(ex.contains(Path::new("/data/cache/")));
        assert!(!ex.contains(Path::new("/data")));
    }

    #[test]
    fn test_exclusion_is_boundary_aware() {
        let ex = ExclusionSet::new(["/data/cache"]);
        assert!(!ex.contains(Path::new("/data/cachefile")));
        assert!(!ex.contains(Path::new("/data/cache2/x")));
    }

    #[test]
    fn test_exclusion_ignores_empty_entries() {
        let ex = ExclusionSet::new(["", ""]);
        assert!(ex.is_empty());
        assert!(!ex.contains(Path::new("/")));
    }

    #[test]
    fn test_exclusion_normalizes_entries() {
        let ex = ExclusionSet::new(["/data/./cache//"]);
        assert!(ex.contains(Path::new("/data/cache/x")));
    }
}
