//! # libp2p-noise-handshake
//!
//! Noise Protocol Framework handshakes for libp2p-style secure channels,
//! using the fixed suite `25519_ChaChaPoly_SHA256`:
//!
//! - **XX**: three messages, mutual authentication without prior knowledge
//! - **IK**: two messages, when the responder's static key is cached
//! - **XX-fallback**: turns a failed IK attempt into XX without resending
//!   bytes already on the wire
//!
//! Each side proves ownership of its Noise static key with an Ed25519
//! identity signature carried in the handshake payload.
//!
//! ## Feature Flags
//!
//! - `transport` (default): length-prefixed framing over tokio streams and
//!   the connection-driving handshakes
//!
//! ## Modules
//!
//! - [`core`]: constants and error types (always included)
//! - [`crypto`]: X25519, ChaCha20-Poly1305, SHA-256 and HKDF adapters
//! - [`noise`]: Noise state objects, message framing and the XX/IK
//!   schedules (always included, no I/O)
//! - [`identity`]: identity keys, peer ids and the signed handshake payload
//! - [`transport`]: frame I/O (requires `transport` feature)
//! - [`handshake`]: XX, IK and XX-fallback over a connection, and the
//!   upgrader that chooses between them (requires `transport` feature)
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │   handshake: NoiseUpgrader, drivers     │
//! ├────────────────────┬────────────────────┤
//! │   noise: XX / IK   │  identity: payload │
//! ├────────────────────┴────────────────────┤
//! │   transport: u16 length-prefixed frames │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! Driving the state machines directly:
//!
//! ```rust
//! use libp2p_noise_handshake::crypto::KeyPair;
//! use libp2p_noise_handshake::noise::xx;
//!
//! let mut alice = xx::init_session(true, b"", KeyPair::generate());
//! let mut bob = xx::init_session(false, b"", KeyPair::generate());
//!
//! let m1 = xx::send_message(&mut alice, b"").unwrap();
//! xx::recv_message(&mut bob, &m1).unwrap();
//! let m2 = xx::send_message(&mut bob, b"").unwrap();
//! xx::recv_message(&mut alice, &m2).unwrap();
//! let m3 = xx::send_message(&mut alice, b"").unwrap();
//! xx::recv_message(&mut bob, &m3).unwrap();
//!
//! let ct = xx::send_message(&mut alice, b"hello").unwrap();
//! assert_eq!(xx::recv_message(&mut bob, &ct).unwrap(), b"hello");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod core;
pub mod crypto;
pub mod identity;
pub mod noise;

// Framing over async streams (feature-gated)
#[cfg(feature = "transport")]
#[cfg_attr(docsrs, doc(cfg(feature = "transport")))]
pub mod transport;

// Connection drivers (feature-gated)
#[cfg(feature = "transport")]
#[cfg_attr(docsrs, doc(cfg(feature = "transport")))]
pub mod handshake;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::core::{CryptoError, IdentityError, NoiseError, Result};
    pub use crate::crypto::KeyPair;
    pub use crate::identity::{IdentityKeypair, PeerId};
    pub use crate::noise::{ik, xx, MessageBuffer, NoiseSession, Pattern};

    #[cfg(feature = "transport")]
    pub use crate::handshake::{NoiseConfig, NoiseUpgrader, SecureSession};
}

pub use core::{NoiseError, Result};
