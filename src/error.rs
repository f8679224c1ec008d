//! Error types for filecrypt.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for filecrypt operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while encrypting or decrypting files.
#[derive(Error, Debug)]
pub enum Error {
    /// Key file does not exist.
    #[error("Key file not found: {0}")]
    KeyFileNotFound(PathBuf),

    /// Key file does not hold exactly 32 bytes.
    #[error("Invalid key in {path}: expected 32 bytes, found {len}")]
    InvalidKeyLength { path: PathBuf, len: usize },

    /// Refusing to overwrite an existing key file.
    #[error("Key file already exists: {0}")]
    KeyFileExists(PathBuf),

    /// Password is empty.
    #[error("Password must not be empty")]
    EmptyPassword,

    /// Padding check failed (wrong key, wrong IV or corrupted data).
    #[error("Decryption failed: wrong key or corrupted data")]
    InvalidPadding,

    /// Ciphertext is empty or not a multiple of the block size.
    #[error("Malformed ciphertext: {len} bytes is not a positive multiple of 16")]
    MalformedCiphertext { len: usize },

    /// Container is shorter than the header for its key mode.
    #[error("Malformed container: {len} bytes, need at least {min}")]
    MalformedContainer { len: usize, min: usize },

    /// Target resolves to a protected location.
    #[error("Refusing to touch protected location: {0}")]
    ProtectedPath(PathBuf),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A directory entry could not be read during a walk.
    #[error("Cannot read {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid engine configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Broad category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Key file missing, malformed or already present.
    Key,
    /// Plaintext could not be recovered.
    Crypto,
    /// Target is a protected location.
    Safety,
    /// Underlying read, write or rename failure.
    Io,
    /// Engine configuration is unusable.
    Config,
}

impl Error {
    /// The category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::KeyFileNotFound(_)
            | Error::InvalidKeyLength { .. }
            | Error::KeyFileExists(_)
            | Error::EmptyPassword => ErrorKind::Key,
            Error::InvalidPadding
            | Error::MalformedCiphertext { .. }
            | Error::MalformedContainer { .. } => ErrorKind::Crypto,
            Error::ProtectedPath(_) => ErrorKind::Safety,
            Error::Io(_) | Error::Walk { .. } => ErrorKind::Io,
            Error::InvalidConfig(_) => ErrorKind::Config,
        }
    }

    /// Whether this error must stop a whole invocation rather than one file.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Key | ErrorKind::Safety | ErrorKind::Config
        )
    }
}

impl From<walkdir::Error> for Error {
    fn from(e: walkdir::Error) -> Self {
        let path = e.path().map(|p| p.to_path_buf()).unwrap_or_default();
        let source = e
            .into_io_error()
            .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "filesystem loop"));
        Error::Walk { path, source }
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::InvalidConfig(e.to_string())
    }
}
