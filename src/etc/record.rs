//! Shared line codec for the colon-delimited user databases.

use std::fmt;

use crate::error::ParseError;

/// Which of the three databases a record or error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DbKind {
    Passwd,
    Group,
    Shadow,
}

impl DbKind {
    /// File name under the database directory.
    pub fn file_name(self) -> &'static str {
        match self {
            DbKind::Passwd => "passwd",
            DbKind::Group => "group",
            DbKind::Shadow => "shadow",
        }
    }

    /// Permission bits the file is written back with.
    pub fn mode(self) -> u32 {
        match self {
            DbKind::Shadow => 0o600,
            DbKind::Passwd | DbKind::Group => 0o644,
        }
    }
}

impl fmt::Display for DbKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// A single typed line of a user database.
///
/// Implementors only see a line that already split into exactly
/// [`Record::FIELDS`] colon-separated fields.
pub trait Record: Sized {
    const KIND: DbKind;
    const FIELDS: usize;

    fn from_fields(fields: &[&str]) -> Result<Self, ParseError>;

    fn to_line(&self) -> String;

    fn name(&self) -> &str;

    fn parse_line(line: &str) -> Result<Self, ParseError> {
        let fields: Vec<&str> = line.split(':').collect();
        if fields.len() != Self::FIELDS {
            return Err(ParseError::new(
                Self::KIND,
                format!(
                    "expected {} fields, found {}: '{}'",
                    Self::FIELDS,
                    fields.len(),
                    line
                ),
            ));
        }
        Self::from_fields(&fields)
    }
}

/// Ordered collection of records as they appear in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table<R> {
    entries: Vec<R>,
}

impl<R> Default for Table<R> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<R: Record> Table<R> {
    /// Parse file contents, returning the good records and one error per
    /// rejected line. Blank lines are neither.
    ///
    /// Lines are decoded one at a time, so a line that is not valid UTF-8
    /// is rejected on its own.
    pub fn parse(content: impl AsRef<[u8]>) -> (Self, Vec<ParseError>) {
        let mut entries = Vec::new();
        let mut errors = Vec::new();

        for (idx, raw) in content.as_ref().split(|&b| b == b'\n').enumerate() {
            let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
            if raw.is_empty() {
                continue;
            }
            let parsed = std::str::from_utf8(raw)
                .map_err(|e| ParseError::new(R::KIND, format!("not valid UTF-8: {e}")))
                .and_then(R::parse_line);
            match parsed {
                Ok(record) => entries.push(record),
                Err(e) => errors.push(e.at_line(idx + 1)),
            }
        }

        (Self { entries }, errors)
    }

    /// Serialize every record, one newline-terminated line each.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for record in &self.entries {
            out.push_str(&record.to_line());
            out.push('\n');
        }
        out
    }

    pub fn get(&self, name: &str) -> Option<&R> {
        self.entries.iter().find(|r| r.name() == name)
    }

    pub fn push(&mut self, record: R) {
        self.entries.push(record);
    }

    pub fn retain(&mut self, f: impl FnMut(&R) -> bool) {
        self.entries.retain(f);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, R> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse a required numeric id field (UID or GID).
pub(crate) fn parse_id(kind: DbKind, what: &str, value: &str) -> Result<u32, ParseError> {
    value
        .parse()
        .map_err(|_| ParseError::new(kind, format!("invalid {} '{}'", what, value)))
}
