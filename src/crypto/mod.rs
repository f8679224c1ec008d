//! Cryptographic operations for filecrypt.
//!
//! This module provides:
//! - AES-256-CBC encryption with PKCS#7 padding
//! - PBKDF2-HMAC-SHA256 password-based key derivation
//! - Raw key file generation and loading

mod cipher;
mod kdf;

pub use cipher::{decrypt, encrypt, random_iv, Cipher, Iv};
pub use kdf::{random_salt, KeyMaterial, KeyOrigin, Salt};
