//! AES-256-CBC with PKCS#7 padding.
//!
//! There is no authentication tag. The padding check in [`Cipher::decrypt`]
//! is the only signal that the key, IV or ciphertext is wrong, and it is
//! probabilistic: roughly 1 in 256 wrong keys still yields valid-looking
//! padding.

use crate::config::{BLOCK_SIZE, IV_LEN};
use crate::crypto::kdf::KeyMaterial;
use crate::error::{Error, Result};
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::{Aes256, Block};
use rand::RngCore;

/// Initialization vector for CBC mode.
pub type Iv = [u8; IV_LEN];

/// AES-256-CBC cipher bound to one key.
pub struct Cipher {
    cipher: Aes256,
}

impl Cipher {
    /// Create a cipher from key material.
    pub fn new(key: &KeyMaterial) -> Self {
        let cipher = Aes256::new(GenericArray::from_slice(key.as_bytes()));
        Self { cipher }
    }

    /// Encrypt with a fresh random IV.
    ///
    /// Returns the IV and the padded ciphertext.
    pub fn encrypt(&self, plaintext: &[u8]) -> (Iv, Vec<u8>) {
        let iv = random_iv();
        let ciphertext = self.encrypt_with_iv(&iv, plaintext);
        (iv, ciphertext)
    }

    /// Encrypt with a caller-supplied IV.
    ///
    /// An IV must never be used twice with the same key; [`Cipher::encrypt`]
    /// is the right call outside of known-answer tests.
    pub fn encrypt_with_iv(&self, iv: &Iv, plaintext: &[u8]) -> Vec<u8> {
        let mut buffer = pad(plaintext);
        let mut prev = *iv;

        for chunk in buffer.chunks_exact_mut(BLOCK_SIZE) {
            xor_in_place(chunk, &prev);
            let mut block = Block::clone_from_slice(chunk);
            self.cipher.encrypt_block(&mut block);
            chunk.copy_from_slice(&block);
            prev.copy_from_slice(chunk);
        }

        buffer
    }

    /// Decrypt and strip the padding.
    pub fn decrypt(&self, iv: &Iv, ciphertext: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
            return Err(Error::MalformedCiphertext {
                len: ciphertext.len(),
            });
        }

        let mut buffer = ciphertext.to_vec();
        let mut prev = *iv;

        for chunk in buffer.chunks_exact_mut(BLOCK_SIZE) {
            let mut saved = [0u8; BLOCK_SIZE];
            saved.copy_from_slice(chunk);

            let mut block = Block::clone_from_slice(chunk);
            self.cipher.decrypt_block(&mut block);
            chunk.copy_from_slice(&block);
            xor_in_place(chunk, &prev);

            prev = saved;
        }

        let len = unpad(&buffer)?;
        buffer.truncate(len);
        Ok(buffer)
    }
}

/// Encrypt `plaintext` under `key` with a fresh IV.
pub fn encrypt(plaintext: &[u8], key: &KeyMaterial) -> (Iv, Vec<u8>) {
    Cipher::new(key).encrypt(plaintext)
}

/// Decrypt `ciphertext` under `key` and `iv`.
pub fn decrypt(iv: &Iv, ciphertext: &[u8], key: &KeyMaterial) -> Result<Vec<u8>> {
    Cipher::new(key).decrypt(iv, ciphertext)
}

/// Generate a fresh random IV.
pub fn random_iv() -> Iv {
    let mut iv = [0u8; IV_LEN];
    rand::thread_rng().fill_bytes(&mut iv);
    iv
}

/// PKCS#7 pad to a multiple of the block size. Always adds 1..=16 bytes.
fn pad(data: &[u8]) -> Vec<u8> {
    let pad_len = BLOCK_SIZE - data.len() % BLOCK_SIZE;
    let mut out = Vec::with_capacity(data.len() + pad_len);
    out.extend_from_slice(data);
    out.resize(data.len() + pad_len, pad_len as u8);
    out
}

/// Length of the unpadded data, or `InvalidPadding`.
// Not constant-time.
fn unpad(data: &[u8]) -> Result<usize> {
    let pad_len = match data.last() {
        Some(&b) => b as usize,
        None => return Err(Error::InvalidPadding),
    };
    if pad_len == 0 || pad_len > BLOCK_SIZE || pad_len > data.len() {
        return Err(Error::InvalidPadding);
    }

    let body = data.len() - pad_len;
    if data[body..].iter().any(|&b| b as usize != pad_len) {
        return Err(Error::InvalidPadding);
    }
    Ok(body)
}

fn xor_in_place(block: &mut [u8], other: &[u8; BLOCK_SIZE]) {
    for (b, o) in block.iter_mut().zip(other.iter()) {
        *b ^= o;
    }
}
