//! CipherState: a symmetric key plus its nonce counter.

use zeroize::Zeroize;

use crate::core::{CryptoError, CIPHER_KEY_SIZE, MAX_NONCE};
use crate::crypto;

/// One direction of AEAD traffic.
///
/// Inside a [`SymmetricState`](super::SymmetricState) the key stays unset
/// until the first `mix_key`; in that state encryption is the identity
/// function, as Noise requires for messages sent before any DH.
/// CipherStates produced by `split` are always keyed.
pub struct CipherState {
    key: Option<[u8; CIPHER_KEY_SIZE]>,
    nonce: u64,
}

impl CipherState {
    /// A CipherState with no key yet.
    pub fn empty() -> Self {
        Self {
            key: None,
            nonce: 0,
        }
    }

    /// A keyed CipherState starting at nonce 0.
    pub fn new(key: [u8; CIPHER_KEY_SIZE]) -> Self {
        Self {
            key: Some(key),
            nonce: 0,
        }
    }

    /// Replace the key and reset the nonce.
    pub fn set_key(&mut self, key: [u8; CIPHER_KEY_SIZE]) {
        if let Some(old) = self.key.as_mut() {
            old.zeroize();
        }
        self.key = Some(key);
        self.nonce = 0;
    }

    /// Whether a key has been set.
    pub fn has_key(&self) -> bool {
        self.key.is_some()
    }

    /// The key, if set.
    ///
    /// # Security
    /// Handle with care - this exposes sensitive key material.
    pub fn key(&self) -> Option<&[u8; CIPHER_KEY_SIZE]> {
        self.key.as_ref()
    }

    /// The nonce the next encrypt or decrypt will use.
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Encrypt under the current nonce, then advance it.
    ///
    /// Without a key the plaintext is returned unchanged.
    pub fn encrypt_with_ad(&mut self, ad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let Some(key) = self.key.as_ref() else {
            return Ok(plaintext.to_vec());
        };
        if self.nonce > MAX_NONCE {
            return Err(CryptoError::NonceExhausted);
        }

        let ciphertext = crypto::encrypt(key, self.nonce, ad, plaintext)?;
        self.nonce += 1;
        Ok(ciphertext)
    }

    /// Decrypt under the current nonce, then advance it.
    ///
    /// A failed decryption leaves the nonce untouched. Without a key the
    /// ciphertext is returned unchanged.
    pub fn decrypt_with_ad(&mut self, ad: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let Some(key) = self.key.as_ref() else {
            return Ok(ciphertext.to_vec());
        };
        if self.nonce > MAX_NONCE {
            return Err(CryptoError::NonceExhausted);
        }

        let plaintext = crypto::decrypt(key, self.nonce, ad, ciphertext)?;
        self.nonce += 1;
        Ok(plaintext)
    }

    #[cfg(test)]
    pub(crate) fn set_nonce(&mut self, nonce: u64) {
        self.nonce = nonce;
    }
}

impl Drop for CipherState {
    fn drop(&mut self) {
        if let Some(key) = self.key.as_mut() {
            key.zeroize();
        }
    }
}

impl std::fmt::Debug for CipherState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherState")
            .field("has_key", &self.has_key())
            .field("nonce", &self.nonce)
            .finish()
    }
}
