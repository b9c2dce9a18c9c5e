//! dev106 container bootstrap.
//!
//! Maps a host user's UID/GID onto the in-container `dev106` identity,
//! hands selected directory trees over to it, and then serves as a minimal
//! PID 1. The binary in `main.rs` is a thin driver over these modules.

pub mod chown;
pub mod common;
pub mod config;
pub mod error;
pub mod etc;
pub mod init;
pub mod timing;

pub use error::{Error, Result};
