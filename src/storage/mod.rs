//! Storage Module.
//!
//! Persists the rendered key material when the operator asks for it.
//!
//! # Security
//! - Files are written atomically (write-sync-rename).
//! - Files are created owner read/write only (0600) on Unix.

pub mod raw_files;

pub use raw_files::write_restricted;

use std::path::PathBuf;

use thiserror::Error;

/// Errors related to storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Path has no file name component.
    #[error("invalid path {0}")]
    InvalidPath(PathBuf),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
