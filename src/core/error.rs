//! Error types for the Noise handshakes.

use thiserror::Error;

/// Errors raised by the primitive adapter and the cipher states.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// AEAD decryption failed (invalid tag or corrupted).
    #[error("AEAD decryption failed (invalid tag or corrupted)")]
    DecryptionFailed,

    /// AEAD encryption failed.
    #[error("AEAD encryption failed")]
    EncryptionFailed,

    /// A step needed the local ephemeral key before one was generated.
    #[error("handshake state has no local ephemeral key")]
    MissingEphemeralKey,

    /// Nonce counter exhausted - session must terminate.
    #[error("nonce counter exhausted - session must terminate")]
    NonceExhausted,

    /// A received public key is not an acceptable curve point.
    #[error("invalid X25519 public key")]
    InvalidPublicKey,

    /// Key derivation failed.
    #[error("key derivation failed")]
    KeyDerivationFailed,
}

/// Errors raised while checking the identity bound into a handshake payload.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// The identifier derived from the payload key is not the expected one.
    #[error("peer id doesn't match libp2p public key")]
    PeerIdMismatch,

    /// The static-key or early-data signature does not verify.
    #[error("static key doesn't match to peer that signed payload")]
    InvalidSignature,

    /// The public-key container holds malformed key bytes.
    #[error("invalid identity public key")]
    InvalidPublicKey,

    /// The public-key container names a key type we cannot verify.
    #[error("unsupported identity key type: {0}")]
    UnsupportedKeyType(u64),

    /// The payload bytes could not be decoded.
    #[error("malformed handshake payload: {0}")]
    MalformedPayload(String),
}

/// Top-level handshake and session errors.
#[derive(Debug, Error)]
pub enum NoiseError {
    /// Out-of-order call, unrecognized message counter, or a session that
    /// already failed.
    #[error("invalid session state at message {counter}: {reason}")]
    StateSequence {
        /// Message counter at the time of the call.
        counter: u64,
        /// What was wrong.
        reason: &'static str,
    },

    /// A directional CipherState needed for this step is not available.
    #[error("missing key material: {0}")]
    MissingKeyMaterial(&'static str),

    /// Cryptographic failure.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Identity verification failed.
    #[error("{context}: {source}")]
    Identity {
        /// Where the verification happened.
        context: String,
        /// Underlying cause.
        #[source]
        source: IdentityError,
    },

    /// A handshake message does not match the pattern's framing.
    #[error("framing error: {0}")]
    Framing(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The peer closed the connection mid-handshake.
    #[error("connection closed during handshake")]
    ConnectionClosed,

    /// The handshake did not finish in time.
    #[error("handshake timed out")]
    Timeout,

    /// I/O error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl NoiseError {
    /// Wrap an identity failure with the stage it happened in.
    pub fn identity(context: impl Into<String>, source: IdentityError) -> Self {
        NoiseError::Identity {
            context: context.into(),
            source,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, NoiseError>;
