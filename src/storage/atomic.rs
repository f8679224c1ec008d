//! Write-to-temp-then-rename replacement of a file's contents.

use crate::config::{TEMP_PREFIX, TEMP_SUFFIX};
use crate::error::Result;
use std::io::Write;
use std::path::Path;
use tempfile::Builder;

/// Replace `path` with `contents` atomically.
///
/// The data goes to a temporary file in the same directory, is synced, takes
/// over the original's permissions, and is then renamed over `path`. On any
/// error before the rename the original is untouched and the temporary file
/// is removed.
pub fn replace_file(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let permissions = std::fs::metadata(path)?.permissions();

    let mut tmp = Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(TEMP_SUFFIX)
        .tempfile_in(parent)?;

    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    std::fs::set_permissions(tmp.path(), permissions)?;

    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
