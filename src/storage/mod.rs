//! Filesystem side of filecrypt.
//!
//! This module handles:
//! - Protected-location checks before any write
//! - Atomic temp-file-then-rename replacement
//! - Regular-file enumeration for directory runs

pub mod atomic;
pub mod guard;
pub mod walk;

pub use atomic::replace_file;
pub use guard::PathGuard;
pub use walk::{scan, Scan};
