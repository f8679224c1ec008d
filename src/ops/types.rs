//! Task, operation and report types.

use crate::container::KeyMode;
use crate::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

/// Where the key for an operation comes from.
pub enum KeySource {
    /// Raw 32-byte key file.
    KeyFile(PathBuf),
    /// Password run through PBKDF2 with a per-file salt.
    Password(Zeroizing<String>),
}

impl KeySource {
    /// Key file source.
    pub fn key_file(path: impl Into<PathBuf>) -> Self {
        KeySource::KeyFile(path.into())
    }

    /// Password source.
    pub fn password(password: impl Into<String>) -> Self {
        KeySource::Password(Zeroizing::new(password.into()))
    }

    /// Container layout that goes with this source.
    pub fn mode(&self) -> KeyMode {
        match self {
            KeySource::KeyFile(_) => KeyMode::FileKey,
            KeySource::Password(_) => KeyMode::Password,
        }
    }
}

impl fmt::Debug for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySource::KeyFile(path) => f.debug_tuple("KeyFile").field(path).finish(),
            KeySource::Password(_) => f.write_str("Password([REDACTED])"),
        }
    }
}

/// Direction of a per-file transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOp {
    Encrypt,
    Decrypt,
}

impl fmt::Display for FileOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileOp::Encrypt => f.write_str("encrypt"),
            FileOp::Decrypt => f.write_str("decrypt"),
        }
    }
}

/// A single file or a directory tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    File(PathBuf),
    Directory(PathBuf),
}

/// Everything the engine can be asked to do.
#[derive(Debug)]
pub enum Operation {
    /// Write a fresh random key to a new file.
    GenerateKey { path: PathBuf },
    Encrypt { target: Target, key: KeySource },
    Decrypt { target: Target, key: KeySource },
}

/// Result of a successful [`Operation`].
#[derive(Debug)]
pub enum Outcome {
    /// Key written to this path.
    KeyGenerated(PathBuf),
    /// Single file rewritten in place.
    File(PathBuf),
    /// Directory walked; see the report for per-file results.
    Directory(BatchReport),
}

impl Outcome {
    /// False only for a directory run with at least one failed file.
    pub fn is_success(&self) -> bool {
        match self {
            Outcome::Directory(report) => report.is_success(),
            _ => true,
        }
    }
}

/// Lifecycle of one file.
///
/// `Pending -> KeyResolved -> Transformed -> Written`, or `Failed` from any
/// state before `Written`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    Pending,
    KeyResolved,
    Transformed,
    Written,
    Failed,
}

/// One file being encrypted or decrypted.
#[derive(Debug)]
pub struct FileTask {
    path: PathBuf,
    op: FileOp,
    state: FileState,
}

impl FileTask {
    /// New task in the `Pending` state.
    pub fn new(path: PathBuf, op: FileOp) -> Self {
        Self {
            path,
            op,
            state: FileState::Pending,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn op(&self) -> FileOp {
        self.op
    }

    pub fn state(&self) -> FileState {
        self.state
    }

    /// Move to the next state. Out-of-order transitions are ignored.
    pub fn advance(&mut self, next: FileState) {
        let allowed = matches!(
            (self.state, next),
            (FileState::Pending, FileState::KeyResolved)
                | (FileState::KeyResolved, FileState::Transformed)
                | (FileState::Transformed, FileState::Written)
                | (FileState::Pending, FileState::Failed)
                | (FileState::KeyResolved, FileState::Failed)
                | (FileState::Transformed, FileState::Failed)
        );
        if allowed {
            tracing::debug!(
                path = %self.path.display(),
                op = %self.op,
                from = ?self.state,
                to = ?next,
                "file state"
            );
            self.state = next;
        }
    }

    /// Consume the task into the path it was working on.
    pub fn into_path(self) -> PathBuf {
        self.path
    }
}

/// A file that could not be processed in a directory run.
#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: Error,
}

/// Per-file results of a directory run.
#[derive(Debug)]
pub struct BatchReport {
    /// Canonical root of the walk.
    pub root: PathBuf,
    pub op: FileOp,
    pub succeeded: Vec<PathBuf>,
    pub failed: Vec<FileFailure>,
    /// Entries deliberately left alone (symlinks, special files, the key
    /// file, leftover temp files).
    pub skipped: Vec<PathBuf>,
}

impl BatchReport {
    pub fn new(root: PathBuf, op: FileOp) -> Self {
        Self {
            root,
            op,
            succeeded: Vec::new(),
            failed: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// True when no file failed.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }

    /// Files attempted, successful or not.
    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}
