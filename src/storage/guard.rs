//! Refuses to operate on protected locations.

use crate::config::{default_protected_paths, EngineConfig};
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Checks targets against a set of protected locations.
///
/// A target is rejected if it equals a protected location or is one of its
/// ancestors, compared after canonicalization.
#[derive(Debug, Clone)]
pub struct PathGuard {
    protected: Vec<PathBuf>,
}

impl PathGuard {
    /// Build a guard from the always-protected defaults plus the configured
    /// extras.
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_paths(
            default_protected_paths()
                .into_iter()
                .chain(config.protected_paths.iter().cloned()),
        )
    }

    /// Build a guard from an explicit set of locations.
    pub fn with_paths(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut protected: Vec<PathBuf> = paths.into_iter().map(|p| canonical_or_raw(&p)).collect();
        protected.sort();
        protected.dedup();
        Self { protected }
    }

    /// Resolve `path` and approve it, returning the canonical path.
    pub fn check(&self, path: &Path) -> Result<PathBuf> {
        let canonical = path.canonicalize()?;

        if let Some(hit) = self.protected.iter().find(|p| p.starts_with(&canonical)) {
            tracing::warn!(
                path = %canonical.display(),
                protected = %hit.display(),
                "refusing protected location"
            );
            return Err(Error::ProtectedPath(canonical));
        }
        Ok(canonical)
    }
}

fn canonical_or_raw(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
