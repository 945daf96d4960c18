//! Key derivation, AEAD sealing and CSPRNG helpers
//!
//! Entropy failures are treated as fatal: the OS RNG panics rather than
//! handing back predictable nonces or delays.

use crate::error::{Error, Result};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::rngs::OsRng;
use rand::{Rng, RngCore};
use sha2::{Digest, Sha256};

/// Length of derived keys in bytes
pub const KEY_LEN: usize = 32;

/// AES-GCM nonce length in bytes
pub const NONCE_LEN: usize = 12;

/// AES-GCM tag length in bytes
pub const TAG_LEN: usize = 16;

/// Derive a 32-byte symmetric key as SHA-256 of the password
pub fn derive_key(password: &str) -> [u8; KEY_LEN] {
    Sha256::digest(password.as_bytes()).into()
}

/// Uniform sample in `[0, 1)` from the OS CSPRNG
///
/// # Panics
///
/// Panics if the operating system RNG is unavailable.
pub fn random_unit() -> f64 {
    OsRng.gen::<f64>()
}

/// AES-256-GCM sealer producing `nonce || ciphertext || tag`
#[derive(Clone)]
pub struct Sealer {
    cipher: Aes256Gcm,
}

impl Sealer {
    /// Build a sealer from a derived key
    pub fn new(key: &[u8; KEY_LEN]) -> Result<Self> {
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| Error::Crypto(format!("invalid key: {e}")))?;
        Ok(Self { cipher })
    }

    /// Build a sealer keyed by SHA-256 of `password`
    pub fn from_password(password: &str) -> Result<Self> {
        Self::new(&derive_key(password))
    }

    /// Encrypt under a fresh random nonce
    ///
    /// # Panics
    ///
    /// Panics if the operating system RNG is unavailable.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|e| Error::Crypto(format!("seal failed: {e}")))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    /// Decrypt a `nonce || ciphertext || tag` buffer
    pub fn open(&self, sealed: &[u8]) -> Result<Vec<u8>> {
        if sealed.len() < NONCE_LEN + TAG_LEN {
            return Err(Error::Crypto(format!(
                "sealed buffer too short: {} bytes",
                sealed.len()
            )));
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|e| Error::Crypto(format!("open failed: {e}")))
    }

    /// Size of a sealed buffer for `plaintext_len` input bytes
    pub const fn sealed_len(plaintext_len: usize) -> usize {
        NONCE_LEN + plaintext_len + TAG_LEN
    }
}

impl std::fmt::Debug for Sealer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sealer").finish_non_exhaustive()
    }
}
