//! Configuration constants and types for filecrypt.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;

/// Salt length for password-based key derivation.
pub const SALT_LEN: usize = 16;

/// Initialization vector length (one AES block).
pub const IV_LEN: usize = BLOCK_SIZE;

/// PBKDF2-HMAC-SHA256 iteration count used when nothing else is configured.
pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 100_000;

/// Minimum accepted iteration count.
pub const MIN_PBKDF2_ITERATIONS: u32 = 1;

/// Maximum accepted iteration count.
pub const MAX_PBKDF2_ITERATIONS: u32 = 10_000_000;

/// Prefix of the temporary files written next to each target.
pub const TEMP_PREFIX: &str = ".filecrypt-";

/// Suffix of those temporary files.
pub const TEMP_SUFFIX: &str = ".tmp";

/// Engine configuration.
///
/// Passed by value into [`Engine::new`](crate::Engine::new) and never mutated
/// afterwards. Tests lower `pbkdf2_iterations` to keep derivation fast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// PBKDF2 iteration count for password-derived keys.
    pub pbkdf2_iterations: u32,

    /// Extra locations to protect on top of the filesystem root and the
    /// home directory, which are always protected.
    pub protected_paths: Vec<PathBuf>,

    /// Skip dot-files during directory walks.
    pub skip_hidden: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pbkdf2_iterations: DEFAULT_PBKDF2_ITERATIONS,
            protected_paths: Vec::new(),
            skip_hidden: false,
        }
    }
}

impl EngineConfig {
    /// Load a configuration from a TOML file. Missing fields take defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Replace the iteration count.
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.pbkdf2_iterations = iterations;
        self
    }

    /// Add a location to the protected set.
    pub fn with_protected_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.protected_paths.push(path.into());
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_PBKDF2_ITERATIONS..=MAX_PBKDF2_ITERATIONS).contains(&self.pbkdf2_iterations) {
            return Err(Error::InvalidConfig(format!(
                "PBKDF2 iterations must be between {} and {}, got {}",
                MIN_PBKDF2_ITERATIONS, MAX_PBKDF2_ITERATIONS, self.pbkdf2_iterations
            )));
        }
        Ok(())
    }
}

/// Filesystem root plus the current user's home directory.
pub fn default_protected_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    #[cfg(windows)]
    paths.push(PathBuf::from("C:\\"));
    #[cfg(not(windows))]
    paths.push(PathBuf::from("/"));

    if let Some(home) = dirs::home_dir() {
        paths.push(home);
    }
    paths
}
