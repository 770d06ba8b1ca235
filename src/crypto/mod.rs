//! Primitive adapter
//!
//! Fixed-size-buffer wrappers over the primitives the handshakes are built
//! from:
//! - X25519 key generation, DH and public-key validation
//! - ChaCha20-Poly1305 AEAD
//! - SHA-256 and the three-output Noise HKDF

mod aead;
mod kdf;
mod keys;

pub use aead::{construct_nonce, decrypt, encrypt};
pub use kdf::{hash, hash_concat, hkdf};
pub use keys::{dh, is_valid_public_key, KeyPair};
