//! Shared utilities across bootstrap modules.

pub mod files;

pub use files::{stage_file, StagedFile};
