//! Key material: random generation, key files and PBKDF2 derivation.

use crate::config::{KEY_LEN, SALT_LEN};
use crate::error::{Error, Result};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Salt for password-based key derivation.
pub type Salt = [u8; SALT_LEN];

/// Where a [`KeyMaterial`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOrigin {
    /// Random key or raw key file.
    FileBacked,
    /// PBKDF2 output for a password and salt.
    PasswordDerived,
}

/// A 256-bit AES key. Wiped from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial {
    bytes: [u8; KEY_LEN],
    #[zeroize(skip)]
    origin: KeyOrigin,
}

impl KeyMaterial {
    /// Wrap raw key bytes.
    pub fn new(bytes: [u8; KEY_LEN], origin: KeyOrigin) -> Self {
        Self { bytes, origin }
    }

    /// Generate a fresh random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self::new(bytes, KeyOrigin::FileBacked)
    }

    /// Load a raw 32-byte key file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let mut contents = match std::fs::read(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::KeyFileNotFound(path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };

        if contents.len() != KEY_LEN {
            let len = contents.len();
            contents.zeroize();
            return Err(Error::InvalidKeyLength {
                path: path.to_path_buf(),
                len,
            });
        }

        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(&contents);
        contents.zeroize();
        Ok(Self::new(bytes, KeyOrigin::FileBacked))
    }

    /// Derive a key from a password with PBKDF2-HMAC-SHA256.
    ///
    /// Deterministic for a given `(password, salt, iterations)`.
    pub fn derive_from_password(password: &str, salt: &Salt, iterations: u32) -> Result<Self> {
        if password.is_empty() {
            return Err(Error::EmptyPassword);
        }
        if iterations == 0 {
            return Err(Error::InvalidConfig(
                "PBKDF2 iterations must be at least 1".to_string(),
            ));
        }

        let mut bytes = [0u8; KEY_LEN];
        pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut bytes);
        Ok(Self::new(bytes, KeyOrigin::PasswordDerived))
    }

    /// Write this key to a new file, creating missing parent directories.
    /// Never overwrites an existing file.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = match options.open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(Error::KeyFileExists(path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };

        file.write_all(&self.bytes)?;
        file.sync_all()?;
        Ok(())
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// How this key was obtained.
    pub fn origin(&self) -> KeyOrigin {
        self.origin
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("origin", &self.origin)
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Generate a fresh random salt.
pub fn random_salt() -> Salt {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}
