//! Connection-driving handshakes.
//!
//! These tie the pure state machines in [`crate::noise`] to a
//! [`HandshakeConnection`](crate::transport::HandshakeConnection): each stage
//! writes or reads one frame and, where the peer's payload arrives, checks
//! the identity it carries.
//!
//! | Driver                  | Messages | Used when                                  |
//! |-------------------------|----------|--------------------------------------------|
//! | [`XxHandshake`]         | 3        | no prior knowledge of the peer             |
//! | [`IkHandshake`]         | 2        | the peer's static key is cached            |
//! | [`XxFallbackHandshake`] | 3        | an IK attempt could not be completed       |
//!
//! [`NoiseUpgrader`] picks between them and returns a [`SecureSession`].

mod config;
mod ik;
mod upgrade;
mod xx;
mod xx_fallback;

pub use config::{NoiseConfig, NoiseConfigBuilder};
pub use ik::IkHandshake;
pub use upgrade::{NoiseUpgrader, SecureSession};
pub use xx::XxHandshake;
pub use xx_fallback::XxFallbackHandshake;

use crate::core::{NoiseError, Result, PUBLIC_KEY_SIZE};
use crate::identity::{verify_signed_payload, PeerId};
use crate::noise::NoiseSession;

/// What a completed handshake proved about the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteIdentity {
    /// Peer id derived from the payload's identity key.
    pub peer_id: PeerId,
    /// The peer's Noise static key.
    pub static_key: [u8; PUBLIC_KEY_SIZE],
    /// Early data the peer signed into its payload.
    pub early_data: Option<Vec<u8>>,
}

/// Check the payload against the remote static key the session just
/// decrypted.
fn verify_remote(
    session: &NoiseSession,
    plaintext: &[u8],
    expected: Option<&PeerId>,
    context: &str,
) -> Result<RemoteIdentity> {
    let static_key = session
        .remote_static_key()
        .ok_or(NoiseError::MissingKeyMaterial("remote static key not received"))?;

    let (peer_id, payload) = verify_signed_payload(&static_key, plaintext, expected)
        .map_err(|err| NoiseError::identity(context, err))?;

    Ok(RemoteIdentity {
        peer_id,
        static_key,
        early_data: payload.has_early_data().then_some(payload.libp2p_data),
    })
}
