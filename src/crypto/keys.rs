//! X25519 key management
//!
//! Provides key generation, Diffie-Hellman and public-key validation for the
//! Noise handshakes.

use crate::core::{PRIVATE_KEY_SIZE, PUBLIC_KEY_SIZE};
use rand::rngs::OsRng;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroize;

/// An X25519 keypair, used both for static and ephemeral Noise keys.
///
/// The private key is zeroized on drop.
#[derive(Clone)]
pub struct KeyPair {
    /// Private key (32 bytes) - zeroized on drop
    private: [u8; PRIVATE_KEY_SIZE],
    /// Public key (32 bytes)
    public: [u8; PUBLIC_KEY_SIZE],
}

impl KeyPair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);

        Self {
            private: secret.to_bytes(),
            public: public.to_bytes(),
        }
    }

    /// Rebuild a keypair from its private half.
    pub fn from_private(private: [u8; PRIVATE_KEY_SIZE]) -> Self {
        let secret = StaticSecret::from(private);
        let public = PublicKey::from(&secret);

        Self {
            private: secret.to_bytes(),
            public: public.to_bytes(),
        }
    }

    /// Create a keypair from existing key material.
    ///
    /// The caller must ensure both halves belong together.
    pub fn from_bytes(private: [u8; PRIVATE_KEY_SIZE], public: [u8; PUBLIC_KEY_SIZE]) -> Self {
        Self { private, public }
    }

    /// Get the public key.
    pub fn public_key(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.public
    }

    /// Get the private key.
    ///
    /// # Security
    /// Handle with care - this exposes sensitive key material.
    pub fn private_key(&self) -> &[u8; PRIVATE_KEY_SIZE] {
        &self.private
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &hex::encode(self.public))
            .finish_non_exhaustive()
    }
}

impl Drop for KeyPair {
    fn drop(&mut self) {
        self.private.zeroize();
    }
}

/// X25519 scalar multiplication.
///
/// Returns the raw shared secret. Degenerate inputs are not special-cased;
/// callers validate remote keys with [`is_valid_public_key`] before they are
/// accepted into a handshake state.
pub fn dh(private_key: &[u8; PRIVATE_KEY_SIZE], public_key: &[u8; PUBLIC_KEY_SIZE]) -> [u8; 32] {
    let secret = StaticSecret::from(*private_key);
    let public = PublicKey::from(*public_key);
    secret.diffie_hellman(&public).to_bytes()
}

/// Check that a received X25519 public key contributes entropy.
///
/// Rejects the wrong length and every small-order point, canonical or not.
/// A clamped scalar is a multiple of the cofactor, so multiplying any
/// small-order point by it lands on the identity (all-zero output).
pub fn is_valid_public_key(public_key: &[u8]) -> bool {
    let Ok(bytes) = <[u8; PUBLIC_KEY_SIZE]>::try_from(public_key) else {
        return false;
    };

    let probe = StaticSecret::from([0x42; PRIVATE_KEY_SIZE]);
    probe
        .diffie_hellman(&PublicKey::from(bytes))
        .was_contributory()
}
