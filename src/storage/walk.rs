//! Regular-file enumeration for directory runs.

use crate::config::{TEMP_PREFIX, TEMP_SUFFIX};
use crate::error::Error;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Result of scanning a directory tree.
#[derive(Debug, Default)]
pub struct Scan {
    /// Regular files, in walk order.
    pub files: Vec<PathBuf>,
    /// Symlinks, special files, leftover temp files and (optionally) hidden
    /// files.
    pub skipped: Vec<PathBuf>,
    /// Entries that could not be read.
    pub errors: Vec<Error>,
}

/// Collect every regular file under `root`.
///
/// Symbolic links are neither followed nor returned. The whole tree is
/// collected before any file is touched, so files created while processing
/// (temp files) are never picked up.
pub fn scan(root: &Path, skip_hidden: bool) -> Scan {
    let mut scan = Scan::default();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .min_depth(1)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                scan.errors.push(e.into());
                continue;
            }
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            continue;
        }

        let (hidden, leftover) = {
            let name = entry.file_name().to_string_lossy();
            (
                skip_hidden && name.starts_with('.'),
                name.starts_with(TEMP_PREFIX) && name.ends_with(TEMP_SUFFIX),
            )
        };
        if !file_type.is_file() || hidden || leftover {
            scan.skipped.push(entry.into_path());
            continue;
        }

        scan.files.push(entry.into_path());
    }

    scan
}
