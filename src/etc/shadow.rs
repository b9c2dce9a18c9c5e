//! Credential database:
//! `name:hash:lastchange:minage:maxage:warn:inactive:expire:reserved`.
//!
//! The four aging day-counts are optional. An empty field reads as 0 through
//! the accessors but is written back empty, so untouched lines survive a
//! load/write-back cycle unchanged.

use super::record::{DbKind, Record, Table};
use crate::error::ParseError;

/// "No password set, log in by other means". Not the `!` lock marker, which
/// makes PAM reject terminal sessions for the account.
pub const NO_PASSWORD_HASH: &str = "*";

/// Last password change, in days since the epoch, for synthesized entries.
pub const LAST_CHANGE_DAYS: i64 = 19300;

/// Maximum password age treated as "never expires".
pub const MAX_AGE_UNLIMITED: i64 = 99999;

pub const WARN_PERIOD_DAYS: i64 = 7;

pub type CredentialTable = Table<CredentialRecord>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub name: String,
    pub hash: String,
    pub last_change: Option<i64>,
    pub min_age: Option<i64>,
    pub max_age: Option<i64>,
    pub warn_period: Option<i64>,
    pub inactive: String,
    pub expire: String,
    pub reserved: String,
}

impl CredentialRecord {
    /// Entry for the container user: passwordless but not locked.
    pub fn container(name: &str) -> Self {
        Self {
            name: name.to_string(),
            hash: NO_PASSWORD_HASH.to_string(),
            last_change: Some(LAST_CHANGE_DAYS),
            min_age: Some(0),
            max_age: Some(MAX_AGE_UNLIMITED),
            warn_period: Some(WARN_PERIOD_DAYS),
            inactive: String::new(),
            expire: String::new(),
            reserved: String::new(),
        }
    }

    pub fn last_change(&self) -> i64 {
        self.last_change.unwrap_or(0)
    }

    pub fn min_age(&self) -> i64 {
        self.min_age.unwrap_or(0)
    }

    pub fn max_age(&self) -> i64 {
        self.max_age.unwrap_or(0)
    }

    pub fn warn_period(&self) -> i64 {
        self.warn_period.unwrap_or(0)
    }
}

fn parse_days(what: &str, value: &str) -> Result<Option<i64>, ParseError> {
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| ParseError::new(DbKind::Shadow, format!("invalid {} '{}'", what, value)))
}

fn days(value: Option<i64>) -> String {
    value.map(|d| d.to_string()).unwrap_or_default()
}

impl Record for CredentialRecord {
    const KIND: DbKind = DbKind::Shadow;
    const FIELDS: usize = 9;

    fn from_fields(fields: &[&str]) -> Result<Self, ParseError> {
        Ok(Self {
            name: fields[0].to_string(),
            hash: fields[1].to_string(),
            last_change: parse_days("last change", fields[2])?,
            min_age: parse_days("minimum age", fields[3])?,
            max_age: parse_days("maximum age", fields[4])?,
            warn_period: parse_days("warning period", fields[5])?,
            inactive: fields[6].to_string(),
            expire: fields[7].to_string(),
            reserved: fields[8].to_string(),
        })
    }

    fn to_line(&self) -> String {
        format!(
            "{}:{}:{}:{}:{}:{}:{}:{}:{}",
            self.name,
            self.hash,
            days(self.last_change),
            days(self.min_age),
            days(self.max_age),
            days(self.warn_period),
            self.inactive,
            self.expire,
            self.reserved
        )
    }

    fn name(&self) -> &str {
        &self.name
    }
}
