//! Account database: `name:x:uid:gid:comment:home:shell`.

use super::record::{parse_id, DbKind, Record, Table};
use crate::error::ParseError;

/// Comment field written for synthesized accounts.
pub const ACCOUNT_COMMENT: &str = "user";

pub type AccountTable = Table<AccountRecord>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRecord {
    pub name: String,
    pub password: String,
    pub uid: u32,
    pub gid: u32,
    pub comment: String,
    pub home: String,
    pub shell: String,
}

impl AccountRecord {
    /// A fresh account with the placeholder comment and shadowed password.
    pub fn new(name: &str, uid: u32, gid: u32, home: &str, shell: &str) -> Self {
        Self {
            name: name.to_string(),
            password: "x".to_string(),
            uid,
            gid,
            comment: ACCOUNT_COMMENT.to_string(),
            home: home.to_string(),
            shell: shell.to_string(),
        }
    }
}

impl Record for AccountRecord {
    const KIND: DbKind = DbKind::Passwd;
    const FIELDS: usize = 7;

    fn from_fields(fields: &[&str]) -> Result<Self, ParseError> {
        Ok(Self {
            name: fields[0].to_string(),
            password: fields[1].to_string(),
            uid: parse_id(Self::KIND, "UID", fields[2])?,
            gid: parse_id(Self::KIND, "GID", fields[3])?,
            comment: fields[4].to_string(),
            home: fields[5].to_string(),
            shell: fields[6].to_string(),
        })
    }

    fn to_line(&self) -> String {
        format!(
            "{}:{}:{}:{}:{}:{}:{}",
            self.name, self.password, self.uid, self.gid, self.comment, self.home, self.shell
        )
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Table<AccountRecord> {
    /// Shell of the first UID 0 account.
    pub fn root_shell(&self) -> Option<&str> {
        self.iter().find(|a| a.uid == 0).map(|a| a.shell.as_str())
    }
}
