//! Shared test utilities for bootstrap tests.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::{symlink, MetadataExt};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const PASSWD: &str = "root:x:0:0:root:/root:/bin/bash\n\
                          daemon:x:1:1:daemon:/usr/sbin:/usr/sbin/nologin\n\
                          ubuntu:x:1000:1000:Ubuntu:/home/ubuntu:/bin/bash\n";

pub const GROUP: &str = "root:x:0:\n\
                         daemon:x:1:\n\
                         sudo:x:27:ubuntu\n\
                         ubuntu:x:1000:\n";

pub const SHADOW: &str = "root:*:19300:0:99999:7:::\n\
                          daemon:*:19300:0:99999:7:::\n\
                          ubuntu:!:19300:0:99999:7:::\n";

/// Scratch container filesystem: an etc dir, a home and a data tree.
pub struct TestEnv {
    /// Temporary directory (kept alive for lifetime of TestEnv)
    pub _temp_dir: TempDir,
    pub etc: PathBuf,
    pub home: PathBuf,
    pub data: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let base = temp_dir.path();

        let etc = base.join("etc");
        let home = base.join("home/dev106");
        let data = base.join("data");

        fs::create_dir_all(&etc).expect("Failed to create etc dir");
        fs::create_dir_all(&data).expect("Failed to create data dir");

        Self {
            _temp_dir: temp_dir,
            etc,
            home,
            data,
        }
    }

    /// Populate etc with the default fixture databases.
    pub fn with_databases(self) -> Self {
        self.write_databases(PASSWD, GROUP, SHADOW);
        self
    }

    pub fn write_databases(&self, passwd: &str, group: &str, shadow: &str) {
        fs::write(self.etc.join("passwd"), passwd).expect("Failed to write passwd");
        fs::write(self.etc.join("group"), group).expect("Failed to write group");
        fs::write(self.etc.join("shadow"), shadow).expect("Failed to write shadow");
    }

    pub fn read_etc(&self, name: &str) -> String {
        fs::read_to_string(self.etc.join(name)).expect("Failed to read database")
    }

    /// Lay out:
    /// ```text
    /// data/a
    /// data/sub/b
    /// data/cache/x
    /// data/cache/deep/y
    /// ```
    pub fn populate_data(&self) {
        for file in ["a", "sub/b", "cache/x", "cache/deep/y"] {
            create_file(&self.data.join(file));
        }
    }

    pub fn outside(&self, name: &str) -> PathBuf {
        self._temp_dir.path().join(name)
    }
}

pub fn create_file(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent dir");
    }
    fs::write(path, "content\n").expect("Failed to create file");
}

pub fn create_symlink(target: &Path, link: &Path) {
    symlink(target, link).expect("Failed to create symlink");
}

/// Real uid/gid of the test process.
pub fn current_ids() -> (u32, u32) {
    // SAFETY: getuid/getgid cannot fail.
    unsafe { (libc::getuid(), libc::getgid()) }
}

pub fn is_root() -> bool {
    // SAFETY: geteuid cannot fail.
    unsafe { libc::geteuid() == 0 }
}

/// (uid, gid) of the path itself, not following symlinks.
pub fn owner(path: &Path) -> (u32, u32) {
    let meta = fs::symlink_metadata(path).expect("Failed to stat");
    (meta.uid(), meta.gid())
}

/// Assert that a file contains expected content.
pub fn assert_file_contains(path: &Path, expected: &str) {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|_| panic!("Failed to read file: {}", path.display()));
    assert!(
        content.contains(expected),
        "File {} does not contain expected content.\nExpected to find: {}\nActual content: {}",
        path.display(),
        expected,
        content
    );
}
