//! filecrypt
//!
//! Encrypts and decrypts files in place, one at a time or across a directory
//! tree, with AES-256-CBC. Keys come either from a raw 32-byte key file or
//! from a password through PBKDF2-HMAC-SHA256.
//!
//! # Architecture
//!
//! ```text
//! PathGuard → key (file | PBKDF2) → AES-256-CBC → container → temp file → rename
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use filecrypt::{Engine, EngineConfig, KeySource};
//! use std::path::Path;
//!
//! let engine = Engine::new(EngineConfig::default()).unwrap();
//! engine.generate_key(Path::new("./secret.key")).unwrap();
//!
//! let key = KeySource::key_file("./secret.key");
//! engine.encrypt_file(Path::new("./notes.txt"), &key).unwrap();
//! engine.decrypt_file(Path::new("./notes.txt"), &key).unwrap();
//! ```

pub mod config;
pub mod container;
pub mod crypto;
pub mod error;
pub mod ops;
pub mod storage;

pub use config::EngineConfig;
pub use container::KeyMode;
pub use error::{Error, ErrorKind, Result};
pub use ops::{BatchReport, Engine, FileOp, KeySource, Operation, Outcome, Target};
