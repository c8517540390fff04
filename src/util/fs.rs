//! Filesystem utilities.

use std::fs;
use std::path::Path;

use crate::core::errors::BuildError;

/// Remove a directory and all its contents, if it exists.
pub fn remove_dir_all_if_exists(path: &Path) -> Result<(), BuildError> {
    if path.exists() {
        fs::remove_dir_all(path).map_err(|source| BuildError::Io {
            action: "remove directory",
            path: path.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}
