//! Protocol constants for the Noise handshakes.
//!
//! These values are fixed by the wire protocol and MUST NOT be changed.

use std::time::Duration;

// =============================================================================
// CRYPTOGRAPHIC CONSTANTS
// =============================================================================

/// X25519 public key size.
pub const PUBLIC_KEY_SIZE: usize = 32;

/// X25519 private key size.
pub const PRIVATE_KEY_SIZE: usize = 32;

/// ChaCha20-Poly1305 key size.
pub const CIPHER_KEY_SIZE: usize = 32;

/// SHA-256 output size.
pub const HASH_SIZE: usize = 32;

/// Poly1305 authentication tag size.
pub const AEAD_TAG_SIZE: usize = 16;

/// ChaCha20-Poly1305 (IETF) nonce size.
pub const AEAD_NONCE_SIZE: usize = 12;

/// HKDF output length: three chained 32-byte keys.
pub const HKDF_OUTPUT_SIZE: usize = 3 * HASH_SIZE;

/// Ed25519 public key size.
pub const ED25519_PUBLIC_KEY_SIZE: usize = 32;

/// Ed25519 signature size.
pub const ED25519_SIGNATURE_SIZE: usize = 64;

/// Largest nonce a CipherState may use. `u64::MAX` is reserved by Noise.
pub const MAX_NONCE: u64 = u64::MAX - 1;

// =============================================================================
// PROTOCOL NAMES
// =============================================================================

/// Protocol name for the XX pattern (and XX-fallback).
pub const PROTOCOL_NAME_XX: &str = "Noise_XX_25519_ChaChaPoly_SHA256";

/// Protocol name for the IK pattern.
pub const PROTOCOL_NAME_IK: &str = "Noise_IK_25519_ChaChaPoly_SHA256";

// =============================================================================
// PAYLOAD SIGNING PREFIXES
// =============================================================================

/// Prefix signed together with the Noise static public key.
pub const STATIC_KEY_DOMAIN: &[u8] = b"noise-libp2p-static-key:";

/// Prefix signed together with early application data.
pub const EARLY_DATA_DOMAIN: &[u8] = b"noise-libp2p-early-data:";

// =============================================================================
// FRAMING
// =============================================================================

/// Size of the big-endian length prefix in front of a handshake frame and
/// in front of the encrypted static key inside message 1 and message 2.
pub const LENGTH_PREFIX_SIZE: usize = 2;

/// Maximum frame length representable by the 2-byte prefix.
pub const MAX_FRAME_LEN: usize = u16::MAX as usize;

/// Largest transport plaintext that fits in one frame.
pub const MAX_PLAINTEXT_LEN: usize = MAX_FRAME_LEN - AEAD_TAG_SIZE;

/// Encrypted static key length (public key + tag).
pub const ENCRYPTED_STATIC_KEY_SIZE: usize = PUBLIC_KEY_SIZE + AEAD_TAG_SIZE;

// =============================================================================
// HANDSHAKE SCHEDULES
// =============================================================================

/// Number of handshake messages in XX.
pub const XX_HANDSHAKE_MESSAGES: u64 = 3;

/// Number of handshake messages in IK.
pub const IK_HANDSHAKE_MESSAGES: u64 = 2;

/// Default timeout for a whole handshake over a connection.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);
