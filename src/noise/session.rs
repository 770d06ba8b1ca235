//! NoiseSession: per-connection handshake bookkeeping.
//!
//! A session is either handshaking (it owns a [`HandshakeState`]) or in
//! transport (it owns the two directional CipherStates). The move from the
//! first to the second is one-way: the handshake state is dropped inside
//! [`NoiseSession::complete`] and cannot be reached again. Any error while
//! driving the session moves it to a failed state from which every call
//! errors.

use crate::core::{
    NoiseError, Result, HASH_SIZE, IK_HANDSHAKE_MESSAGES, PROTOCOL_NAME_IK, PROTOCOL_NAME_XX,
    PUBLIC_KEY_SIZE, XX_HANDSHAKE_MESSAGES,
};

use super::{
    create_empty_key, read_message_regular, write_message_regular, CipherState, HandshakeState,
    MessageBuffer,
};

/// Handshake pattern a session was created for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pattern {
    /// Three-message mutual authentication (also used by XX-fallback).
    Xx,
    /// Two-message pattern with the responder's static key known upfront.
    Ik,
}

impl Pattern {
    /// Full Noise protocol name.
    pub fn protocol_name(self) -> &'static str {
        match self {
            Pattern::Xx => PROTOCOL_NAME_XX,
            Pattern::Ik => PROTOCOL_NAME_IK,
        }
    }

    /// Number of handshake messages before transport keys exist.
    pub fn handshake_messages(self) -> u64 {
        match self {
            Pattern::Xx => XX_HANDSHAKE_MESSAGES,
            Pattern::Ik => IK_HANDSHAKE_MESSAGES,
        }
    }
}

/// Keys and transcript left over once the handshake completed.
pub struct TransportState {
    handshake_hash: [u8; HASH_SIZE],
    remote_static: [u8; PUBLIC_KEY_SIZE],
    cs1: CipherState,
    cs2: CipherState,
}

impl TransportState {
    /// Final transcript hash.
    pub fn handshake_hash(&self) -> &[u8; HASH_SIZE] {
        &self.handshake_hash
    }

    /// The peer's static key learned or confirmed during the handshake.
    pub fn remote_static(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.remote_static
    }

    /// Initiator-to-responder CipherState.
    pub fn cs1(&self) -> &CipherState {
        &self.cs1
    }

    /// Responder-to-initiator CipherState.
    pub fn cs2(&self) -> &CipherState {
        &self.cs2
    }
}

enum Phase {
    Handshaking(Box<HandshakeState>),
    Transport(TransportState),
    Failed,
}

/// Mutable per-connection state for one Noise handshake and the transport
/// that follows it.
pub struct NoiseSession {
    pattern: Pattern,
    initiator: bool,
    message_count: u64,
    phase: Phase,
}

impl NoiseSession {
    pub(crate) fn new(pattern: Pattern, initiator: bool, hs: HandshakeState) -> Self {
        Self {
            pattern,
            initiator,
            message_count: 0,
            phase: Phase::Handshaking(Box::new(hs)),
        }
    }

    /// Pattern this session runs.
    pub fn pattern(&self) -> Pattern {
        self.pattern
    }

    /// Whether we are the initiator.
    pub fn is_initiator(&self) -> bool {
        self.initiator
    }

    /// Number of send and receive calls completed so far.
    pub fn message_count(&self) -> u64 {
        self.message_count
    }

    /// Whether the transport CipherStates exist.
    pub fn is_handshake_complete(&self) -> bool {
        matches!(self.phase, Phase::Transport(_))
    }

    /// Whether an earlier call failed and poisoned the session.
    pub fn is_failed(&self) -> bool {
        matches!(self.phase, Phase::Failed)
    }

    /// Current transcript hash: the running one while handshaking, the
    /// final one afterwards.
    pub fn handshake_hash(&self) -> Option<[u8; HASH_SIZE]> {
        match &self.phase {
            Phase::Handshaking(hs) => Some(*hs.ss.handshake_hash()),
            Phase::Transport(ts) => Some(ts.handshake_hash),
            Phase::Failed => None,
        }
    }

    /// The peer's static key, once known.
    pub fn remote_static_key(&self) -> Option<[u8; PUBLIC_KEY_SIZE]> {
        let rs = match &self.phase {
            Phase::Handshaking(hs) => hs.rs,
            Phase::Transport(ts) => ts.remote_static,
            Phase::Failed => return None,
        };
        (rs != create_empty_key()).then_some(rs)
    }

    /// The live handshake state, if still handshaking.
    pub fn handshake_state(&self) -> Option<&HandshakeState> {
        match &self.phase {
            Phase::Handshaking(hs) => Some(&**hs),
            _ => None,
        }
    }

    /// The transport keys, once the handshake completed.
    pub fn transport(&self) -> Option<&TransportState> {
        match &self.phase {
            Phase::Transport(ts) => Some(ts),
            _ => None,
        }
    }

    /// Encrypt a transport message on our outgoing CipherState.
    ///
    /// Fails with [`NoiseError::MissingKeyMaterial`] before the handshake
    /// completed.
    pub fn write_transport(&mut self, payload: &[u8]) -> Result<MessageBuffer> {
        self.step(|session| write_message_regular(session.send_cipher_mut()?, payload))
    }

    /// Decrypt a transport message on our incoming CipherState.
    pub fn read_transport(&mut self, message: &MessageBuffer) -> Result<Vec<u8>> {
        self.step(|session| read_message_regular(session.recv_cipher_mut()?, message))
    }

    /// Run one send or receive step.
    ///
    /// The counter moves by exactly one on success; on error the session is
    /// poisoned and the counter stays where it was.
    pub(crate) fn step<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.is_failed() {
            return Err(self.sequence_error("session failed earlier and cannot be resumed"));
        }

        match f(self) {
            Ok(value) => {
                self.message_count = self
                    .message_count
                    .checked_add(1)
                    .ok_or_else(|| self.sequence_error("message counter overflow"))?;
                Ok(value)
            }
            Err(err) => {
                self.phase = Phase::Failed;
                Err(err)
            }
        }
    }

    /// Check that this handshake message is ours to send (or receive).
    pub(crate) fn expect_turn(&self, sent_by_initiator: bool, sending: bool) -> Result<()> {
        let ours = self.initiator == sent_by_initiator;
        if ours != sending {
            return Err(self.sequence_error(if sending {
                "this handshake message is sent by the peer"
            } else {
                "this handshake message is sent by us"
            }));
        }
        Ok(())
    }

    pub(crate) fn handshake_state_mut(&mut self) -> Result<&mut HandshakeState> {
        let counter = self.message_count;
        match &mut self.phase {
            Phase::Handshaking(hs) => Ok(&mut **hs),
            _ => Err(NoiseError::StateSequence {
                counter,
                reason: "handshake state already discarded",
            }),
        }
    }

    /// Install the transport CipherStates and drop the handshake state.
    pub(crate) fn complete(&mut self, cs1: CipherState, cs2: CipherState) -> Result<()> {
        match std::mem::replace(&mut self.phase, Phase::Failed) {
            Phase::Handshaking(hs) => {
                self.phase = Phase::Transport(TransportState {
                    handshake_hash: *hs.ss.handshake_hash(),
                    remote_static: hs.rs,
                    cs1,
                    cs2,
                });
                Ok(())
            }
            other => {
                self.phase = other;
                Err(self.sequence_error("handshake completed twice"))
            }
        }
    }

    /// CipherState for our outgoing direction: cs1 for the initiator, cs2
    /// for the responder.
    pub(crate) fn send_cipher_mut(&mut self) -> Result<&mut CipherState> {
        let initiator = self.initiator;
        match &mut self.phase {
            Phase::Transport(ts) => Ok(if initiator { &mut ts.cs1 } else { &mut ts.cs2 }),
            _ => Err(NoiseError::MissingKeyMaterial(if initiator {
                "CS1 (cipher state) is not defined"
            } else {
                "CS2 (cipher state) is not defined"
            })),
        }
    }

    /// CipherState for our incoming direction.
    pub(crate) fn recv_cipher_mut(&mut self) -> Result<&mut CipherState> {
        let initiator = self.initiator;
        match &mut self.phase {
            Phase::Transport(ts) => Ok(if initiator { &mut ts.cs2 } else { &mut ts.cs1 }),
            _ => Err(NoiseError::MissingKeyMaterial(if initiator {
                "CS2 (cipher state) is not defined"
            } else {
                "CS1 (cipher state) is not defined"
            })),
        }
    }

    pub(crate) fn sequence_error(&self, reason: &'static str) -> NoiseError {
        NoiseError::StateSequence {
            counter: self.message_count,
            reason,
        }
    }
}

impl std::fmt::Debug for NoiseSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let phase = match self.phase {
            Phase::Handshaking(_) => "handshaking",
            Phase::Transport(_) => "transport",
            Phase::Failed => "failed",
        };
        f.debug_struct("NoiseSession")
            .field("pattern", &self.pattern)
            .field("initiator", &self.initiator)
            .field("message_count", &self.message_count)
            .field("phase", &phase)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use crate::noise::xx;

    #[test]
    fn test_transport_before_handshake_is_missing_key_material() {
        let mut session = xx::init_session(true, b"", KeyPair::generate());

        let err = session.write_transport(b"too early").unwrap_err();
        assert!(matches!(err, NoiseError::MissingKeyMaterial(_)));
        assert!(session.is_failed());
    }

    #[test]
    fn test_fresh_session_state() {
        let session = xx::init_session(false, b"prologue", KeyPair::generate());

        assert_eq!(session.pattern(), Pattern::Xx);
        assert!(!session.is_initiator());
        assert_eq!(session.message_count(), 0);
        assert!(session.handshake_hash().is_some());
        assert_eq!(session.remote_static_key(), None);
        assert!(session.transport().is_none());
    }

    #[test]
    fn test_pattern_names() {
        assert_eq!(Pattern::Xx.protocol_name(), "Noise_XX_25519_ChaChaPoly_SHA256");
        assert_eq!(Pattern::Ik.handshake_messages(), 2);
    }

    #[test]
    fn test_transport_directions_after_handshake() {
        let mut initiator = xx::init_session(true, b"", KeyPair::generate());
        let mut responder = xx::init_session(false, b"", KeyPair::generate());
        let m1 = xx::send_message(&mut initiator, b"").unwrap();
        xx::recv_message(&mut responder, &m1).unwrap();
        let m2 = xx::send_message(&mut responder, b"").unwrap();
        xx::recv_message(&mut initiator, &m2).unwrap();
        let m3 = xx::send_message(&mut initiator, b"").unwrap();
        xx::recv_message(&mut responder, &m3).unwrap();

        let sealed = initiator.write_transport(b"cs1 traffic").unwrap();
        assert_eq!(initiator.transport().unwrap().cs1().nonce(), 1);
        assert_eq!(responder.read_transport(&sealed).unwrap(), b"cs1 traffic");
        assert_eq!(responder.transport().unwrap().cs1().nonce(), 1);
        assert_eq!(responder.transport().unwrap().cs2().nonce(), 0);
    }

    #[test]
    fn test_responder_sends_on_cs2() {
        let mut initiator = xx::init_session(true, b"", KeyPair::generate());
        let mut responder = xx::init_session(false, b"", KeyPair::generate());
        let m1 = xx::send_message(&mut initiator, b"").unwrap();
        xx::recv_message(&mut responder, &m1).unwrap();
        let m2 = xx::send_message(&mut responder, b"").unwrap();
        xx::recv_message(&mut initiator, &m2).unwrap();
        let m3 = xx::send_message(&mut initiator, b"").unwrap();
        xx::recv_message(&mut responder, &m3).unwrap();

        let sealed = responder.write_transport(b"cs2 traffic").unwrap();
        assert_eq!(responder.transport().unwrap().cs2().nonce(), 1);
        assert_eq!(responder.transport().unwrap().cs1().nonce(), 0);
        assert_eq!(initiator.read_transport(&sealed).unwrap(), b"cs2 traffic");
        assert_eq!(initiator.transport().unwrap().cs2().nonce(), 1);
        assert_eq!(initiator.transport().unwrap().cs1().nonce(), 0);
    }
}
