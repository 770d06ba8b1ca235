//! SymmetricState: chaining key, transcript hash and the handshake cipher.

use zeroize::Zeroize;

use crate::core::{CryptoError, HASH_SIZE};
use crate::crypto;

use super::CipherState;

/// Running handshake key schedule.
///
/// `h` is the transcript hash over every public value and ciphertext in the
/// order they appear on the wire. Both peers must feed it identically or the
/// next decrypt fails.
pub struct SymmetricState {
    ck: [u8; HASH_SIZE],
    h: [u8; HASH_SIZE],
    cs: CipherState,
}

impl SymmetricState {
    /// `InitializeSymmetric(protocol_name)`.
    ///
    /// Names up to 32 bytes are zero-padded into `h`, longer names are
    /// hashed. The chaining key starts equal to `h`; no cipher key yet.
    pub fn initialize(protocol_name: &str) -> Self {
        let name = protocol_name.as_bytes();
        let h = if name.len() <= HASH_SIZE {
            let mut h = [0u8; HASH_SIZE];
            h[..name.len()].copy_from_slice(name);
            h
        } else {
            crypto::hash(name)
        };

        Self {
            ck: h,
            h,
            cs: CipherState::empty(),
        }
    }

    /// `h = H(h ‖ data)`.
    pub fn mix_hash(&mut self, data: &[u8]) {
        self.h = crypto::hash_concat(&self.h, data);
    }

    /// `(ck, k) = HKDF(ck, ikm)`; the cipher is rekeyed with `k` at nonce 0.
    pub fn mix_key(&mut self, input_key_material: &[u8]) -> Result<(), CryptoError> {
        let (ck, temp_k, mut unused) = crypto::hkdf(&self.ck, input_key_material)?;
        self.ck = ck;
        self.cs.set_key(temp_k);
        unused.zeroize();
        Ok(())
    }

    /// Encrypt with `h` as associated data (identity before the first
    /// `mix_key`), then mix the ciphertext into `h`.
    pub fn encrypt_and_hash(&mut self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let ciphertext = self.cs.encrypt_with_ad(&self.h, plaintext)?;
        self.mix_hash(&ciphertext);
        Ok(ciphertext)
    }

    /// Decrypt with `h` as associated data, then mix the received
    /// ciphertext (not the plaintext) into `h`.
    pub fn decrypt_and_hash(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let plaintext = self.cs.decrypt_with_ad(&self.h, ciphertext)?;
        self.mix_hash(ciphertext);
        Ok(plaintext)
    }

    /// Derive the two transport CipherStates from the final chaining key.
    ///
    /// The first protects initiator-to-responder traffic, the second the
    /// opposite direction.
    pub fn split(&self) -> Result<(CipherState, CipherState), CryptoError> {
        let (k1, k2, mut unused) = crypto::hkdf(&self.ck, &[])?;
        unused.zeroize();
        Ok((CipherState::new(k1), CipherState::new(k2)))
    }

    /// Current transcript hash.
    pub fn handshake_hash(&self) -> &[u8; HASH_SIZE] {
        &self.h
    }

    /// Whether `mix_key` has run at least once.
    pub fn has_key(&self) -> bool {
        self.cs.has_key()
    }

    #[cfg(test)]
    pub(crate) fn chaining_key(&self) -> &[u8; HASH_SIZE] {
        &self.ck
    }
}

impl Drop for SymmetricState {
    fn drop(&mut self) {
        self.ck.zeroize();
    }
}
