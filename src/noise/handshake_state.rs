//! HandshakeState: per-role key material plus the SymmetricState.

use crate::core::PUBLIC_KEY_SIZE;
use crate::crypto::KeyPair;

use super::{create_empty_key, SymmetricState};

/// Key material for one side of a handshake in progress.
///
/// Owned by exactly one [`NoiseSession`](super::NoiseSession) and dropped
/// when the transport CipherStates are derived.
pub struct HandshakeState {
    pub(crate) ss: SymmetricState,
    pub(crate) s: KeyPair,
    pub(crate) e: Option<KeyPair>,
    pub(crate) rs: [u8; PUBLIC_KEY_SIZE],
    pub(crate) re: [u8; PUBLIC_KEY_SIZE],
    pub(crate) psk: [u8; 32],
}

impl HandshakeState {
    /// Create a handshake state; `rs` is the zero key when not yet known.
    pub fn new(ss: SymmetricState, s: KeyPair, rs: [u8; PUBLIC_KEY_SIZE]) -> Self {
        Self {
            ss,
            s,
            e: None,
            rs,
            re: create_empty_key(),
            psk: create_empty_key(),
        }
    }

    /// Local static keypair.
    pub fn local_static(&self) -> &KeyPair {
        &self.s
    }

    /// Local ephemeral keypair, once generated.
    pub fn local_ephemeral(&self) -> Option<&KeyPair> {
        self.e.as_ref()
    }

    /// Remote static public key (zero until learned).
    pub fn remote_static(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.rs
    }

    /// Remote ephemeral public key (zero until learned).
    pub fn remote_ephemeral(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.re
    }

    /// Pre-shared key slot; zero for every supported pattern.
    pub fn pre_shared_key(&self) -> &[u8; 32] {
        &self.psk
    }

    /// The owned symmetric state.
    pub fn symmetric_state(&self) -> &SymmetricState {
        &self.ss
    }
}
