//! Raw File Storage.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

use super::StorageError;

/// Owner read/write only.
#[cfg(unix)]
const RESTRICTED_MODE: u32 = 0o600;

/// Writes `data` to `path` atomically with owner-only permissions.
///
/// The data lands in a temporary sibling first, which is synced and then
/// renamed over `path`. An existing file at `path` is replaced.
pub fn write_restricted<P: AsRef<Path>>(path: P, data: &[u8]) -> Result<(), StorageError> {
    let path = path.as_ref();
    let filename = path
        .file_name()
        .ok_or_else(|| StorageError::InvalidPath(path.to_path_buf()))?;
    let temp_path = path.with_file_name(format!(".{}.tmp", filename.to_string_lossy()));

    let io_err = |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(RESTRICTED_MODE);

    let mut file = options.open(&temp_path).map_err(io_err)?;
    // mode() only applies on creation; a stale temp file keeps its old bits.
    #[cfg(unix)]
    file.set_permissions(fs::Permissions::from_mode(RESTRICTED_MODE))
        .map_err(io_err)?;

    file.write_all(data).map_err(io_err)?;
    file.sync_all().map_err(io_err)?;
    drop(file);

    fs::rename(&temp_path, path).map_err(io_err)?;
    log::info!("wrote {} bytes to {}", data.len(), path.display());
    Ok(())
}
