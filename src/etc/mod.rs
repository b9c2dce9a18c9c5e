//! Identity store over `passwd`, `group` and `shadow`.
//!
//! The three files are loaded together, reconciled once in memory and
//! written back together. Nothing is cached past the bootstrap pass.
//!
//! # Write-back
//!
//! All three files are staged to temporary siblings first and only renamed
//! into place after every one of them was written. A failure while staging
//! leaves the originals untouched. The renames themselves are three separate
//! steps; a crash between them can still leave a mix of old and new files.
//!
//! No file locking is done: this process is assumed to be the only writer
//! during container startup.

pub mod group;
pub mod passwd;
pub mod record;
pub mod shadow;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::common::stage_file;
use crate::error::{Error, ParseError, Result};

pub use group::{GroupRecord, GroupTable};
pub use passwd::{AccountRecord, AccountTable};
pub use record::{DbKind, Record, Table};
pub use shadow::{CredentialRecord, CredentialTable};

/// The synthesized user the bootstrap maintains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerIdentity {
    pub name: String,
    pub uid: u32,
    pub gid: u32,
    pub home: String,
}

/// Locations of the three database files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EtcPaths {
    dir: PathBuf,
}

impl EtcPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, kind: DbKind) -> PathBuf {
        self.dir.join(kind.file_name())
    }
}

/// Loaded and parsed user databases.
#[derive(Debug, Clone)]
pub struct IdentityDatabase {
    pub accounts: AccountTable,
    pub groups: GroupTable,
    pub credentials: CredentialTable,
    root_shell: String,
    paths: EtcPaths,
}

impl IdentityDatabase {
    /// Read and parse all three databases under `dir`.
    ///
    /// Malformed lines are logged and dropped. Fails if a file cannot be
    /// read or no UID 0 account exists.
    pub fn load(dir: impl Into<PathBuf>) -> Result<Self> {
        let paths = EtcPaths::new(dir);
        let read = |kind: DbKind| {
            let path = paths.path(kind);
            fs::read(&path).map_err(|e| Error::io(path, e))
        };

        let passwd = read(DbKind::Passwd)?;
        let group = read(DbKind::Group)?;
        let shadow = read(DbKind::Shadow)?;

        let (db, errors) = Self::parse(paths, &passwd, &group, &shadow)?;
        for err in &errors {
            warn!(kind = %err.kind, line = err.line, "skipping line: {}", err.reason);
        }
        debug!(
            accounts = db.accounts.len(),
            groups = db.groups.len(),
            credentials = db.credentials.len(),
            skipped = errors.len(),
            "loaded identity database"
        );
        Ok(db)
    }

    /// Build a database from file contents, returning every rejected line.
    pub fn parse(
        paths: EtcPaths,
        passwd: impl AsRef<[u8]>,
        group: impl AsRef<[u8]>,
        shadow: impl AsRef<[u8]>,
    ) -> Result<(Self, Vec<ParseError>)> {
        let (accounts, mut errors) = AccountTable::parse(passwd);
        let (groups, group_errors) = GroupTable::parse(group);
        let (credentials, shadow_errors) = CredentialTable::parse(shadow);
        errors.extend(group_errors);
        errors.extend(shadow_errors);

        let root_shell = accounts
            .root_shell()
            .ok_or_else(|| Error::Integrity(paths.path(DbKind::Passwd)))?
            .to_string();

        let db = Self {
            accounts,
            groups,
            credentials,
            root_shell,
            paths,
        };
        Ok((db, errors))
    }

    /// Shell of the root account, used for the container user.
    pub fn root_shell(&self) -> &str {
        &self.root_shell
    }

    pub fn paths(&self) -> &EtcPaths {
        &self.paths
    }

    /// Drop every record that is, or collides with, the container identity,
    /// then install a fresh account/group/credential triple for it.
    ///
    /// Every account holding the requested UID and every group holding the
    /// requested GID is removed, root included. The root shell was captured
    /// at load time, so it survives an eviction of the root account.
    pub fn reconcile(&mut self, identity: &ContainerIdentity) {
        let name = identity.name.as_str();
        let mut removed_accounts = Vec::new();

        self.accounts.retain(|a| {
            let stale = a.name == name || a.uid == identity.uid;
            if stale && a.name != name {
                removed_accounts.push(a.name.clone());
            }
            !stale
        });
        self.groups
            .retain(|g| g.name != name && g.gid != identity.gid);
        self.credentials
            .retain(|c| c.name != name && !removed_accounts.contains(&c.name));

        if !removed_accounts.is_empty() {
            info!(
                uid = identity.uid,
                accounts = ?removed_accounts,
                "removed accounts holding the requested UID"
            );
        }

        self.groups
            .push(GroupRecord::new(name, identity.gid, &[name]));
        self.accounts.push(AccountRecord::new(
            name,
            identity.uid,
            identity.gid,
            &identity.home,
            &self.root_shell,
        ));
        self.credentials.push(CredentialRecord::container(name));
    }

    /// Replace all three files with the current tables.
    pub fn write_back(&self) -> Result<()> {
        let staged = [
            (DbKind::Passwd, self.accounts.render()),
            (DbKind::Group, self.groups.render()),
            (DbKind::Shadow, self.credentials.render()),
        ]
        .into_iter()
        .map(|(kind, content)| stage_file(&self.paths.path(kind), content, kind.mode()))
        .collect::<Result<Vec<_>>>()?;

        for file in staged {
            debug!(path = %file.target().display(), "committing");
            file.commit()?;
        }
        Ok(())
    }
}
