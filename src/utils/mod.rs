//! Shared utilities: Arrow value extraction and parquet I/O.

pub mod arrow_utils;
pub mod io;

use std::path::Path;

use crate::error::Result;

/// Validates that a directory exists and is a directory.
pub fn validate_directory(dir: &Path) -> Result<()> {
    if !dir.exists() || !dir.is_dir() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Directory does not exist: {}", dir.display()),
        )
        .into());
    }
    Ok(())
}
