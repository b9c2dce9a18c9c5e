//! Group database: `name:x:gid:member,member`.

use super::record::{parse_id, DbKind, Record, Table};
use crate::error::ParseError;

pub type GroupTable = Table<GroupRecord>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRecord {
    pub name: String,
    pub password: String,
    pub gid: u32,
    /// Member user names in file order.
    pub members: Vec<String>,
}

impl GroupRecord {
    pub fn new(name: &str, gid: u32, members: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            password: "x".to_string(),
            gid,
            members: members.iter().map(|m| m.to_string()).collect(),
        }
    }
}

impl Record for GroupRecord {
    const KIND: DbKind = DbKind::Group;
    const FIELDS: usize = 4;

    fn from_fields(fields: &[&str]) -> Result<Self, ParseError> {
        let members = fields[3]
            .split(',')
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(String::from)
            .collect();

        Ok(Self {
            name: fields[0].to_string(),
            password: fields[1].to_string(),
            gid: parse_id(Self::KIND, "GID", fields[2])?,
            members,
        })
    }

    fn to_line(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.name,
            self.password,
            self.gid,
            self.members.join(",")
        )
    }

    fn name(&self) -> &str {
        &self.name
    }
}
