//! On-disk container layout.
//!
//! ```text
//! File-key mode:  [ IV: 16 ][ ciphertext: N, N % 16 == 0 ]
//! Password mode:  [ salt: 16 ][ IV: 16 ][ ciphertext: N, N % 16 == 0 ]
//! ```
//!
//! No magic bytes or version: the mode is known from how the caller
//! obtains the key.

use crate::config::{BLOCK_SIZE, IV_LEN, SALT_LEN};
use crate::crypto::{Iv, Salt};
use crate::error::{Error, Result};

/// How the key for a container is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMode {
    /// Raw key file; no salt stored.
    FileKey,
    /// Password-derived key; salt stored in front of the IV.
    Password,
}

impl KeyMode {
    /// Header length (salt and IV) for this mode.
    pub fn header_len(self) -> usize {
        match self {
            KeyMode::FileKey => IV_LEN,
            KeyMode::Password => SALT_LEN + IV_LEN,
        }
    }

    /// Smallest valid container: header plus one block.
    pub fn min_len(self) -> usize {
        self.header_len() + BLOCK_SIZE
    }
}

/// A decoded container borrowing its ciphertext from the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container<'a> {
    /// Salt, present only in password mode.
    pub salt: Option<Salt>,
    /// CBC initialization vector.
    pub iv: Iv,
    /// Block-aligned ciphertext.
    pub ciphertext: &'a [u8],
}

/// Concatenate salt (password mode only), IV and ciphertext.
pub fn encode(mode: KeyMode, salt: Option<&Salt>, iv: &Iv, ciphertext: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(mode.header_len() + ciphertext.len());
    if mode == KeyMode::Password {
        if let Some(salt) = salt {
            out.extend_from_slice(salt);
        }
    }
    out.extend_from_slice(iv);
    out.extend_from_slice(ciphertext);
    out
}

/// Split a container into its salt, IV and ciphertext.
pub fn decode(mode: KeyMode, bytes: &[u8]) -> Result<Container<'_>> {
    let min = mode.min_len();
    if bytes.len() < min {
        return Err(Error::MalformedContainer {
            len: bytes.len(),
            min,
        });
    }

    let (salt, rest) = match mode {
        KeyMode::FileKey => (None, bytes),
        KeyMode::Password => {
            let (head, rest) = bytes.split_at(SALT_LEN);
            let mut salt = [0u8; SALT_LEN];
            salt.copy_from_slice(head);
            (Some(salt), rest)
        }
    };

    let (iv_bytes, ciphertext) = rest.split_at(IV_LEN);
    if ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(Error::MalformedCiphertext {
            len: ciphertext.len(),
        });
    }

    let mut iv = [0u8; IV_LEN];
    iv.copy_from_slice(iv_bytes);

    Ok(Container {
        salt,
        iv,
        ciphertext,
    })
}
