//! Error types for the bootstrap pass.

use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::etc::DbKind;

/// Result type alias for bootstrap operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while bootstrapping the container identity.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The account database has no UID 0 entry.
    #[error("integrity error: no UID 0 account found in {}", .0.display())]
    Integrity(PathBuf),

    /// Reading or writing a file failed.
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// One or more paths could not be chowned.
    #[error(transparent)]
    Sweep(#[from] SweepErrors),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Missing or malformed identity configuration. Never fatal: the caller
/// skips the bootstrap pass.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{var} must be a non-negative integer, got '{value}'")]
    Invalid { var: &'static str, value: String },

    #[error("{0} is not valid UTF-8")]
    NotUnicode(&'static str),
}

/// A malformed line in one of the user databases. Reported per line and
/// never surfaced as an [`Error`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed {kind} line {line}: {reason}")]
pub struct ParseError {
    pub kind: DbKind,
    /// 1-based line number, 0 when parsing a detached line.
    pub line: usize,
    pub reason: String,
}

impl ParseError {
    pub(crate) fn new(kind: DbKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            line: 0,
            reason: reason.into(),
        }
    }

    pub(crate) fn at_line(mut self, line: usize) -> Self {
        self.line = line;
        self
    }
}

/// Every per-path failure collected during an ownership sweep.
#[derive(Debug, Default)]
pub struct SweepErrors {
    pub failures: Vec<(PathBuf, io::Error)>,
}

impl SweepErrors {
    pub fn push(&mut self, path: impl Into<PathBuf>, err: io::Error) {
        self.failures.push((path.into(), err));
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }
}

impl fmt::Display for SweepErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chown failed for {} path(s)", self.failures.len())?;
        for (path, err) in &self.failures {
            write!(f, "\n  {}: {}", path.display(), err)?;
        }
        Ok(())
    }
}

impl std::error::Error for SweepErrors {}
