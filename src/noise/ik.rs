//! Noise IK: two messages, responder's static key known in advance.
//!
//! ```text
//! IK:
//!   <- s
//!   ...
//!   -> e, es, s, ss
//!   <- e, ee, se
//! ```
//!
//! Used to resume with a peer whose static key is cached. If the responder
//! cannot complete it, both sides continue with XX-fallback.

use crate::core::{CryptoError, NoiseError, Result, PROTOCOL_NAME_IK, PUBLIC_KEY_SIZE};
use crate::crypto::{is_valid_public_key, KeyPair};

use super::primitives::{
    mix_ephemeral_dh, mix_static_dh, read_ephemeral, read_static, write_ephemeral, write_static,
    Remote,
};
use super::{
    create_empty_key, read_message_regular, write_message_regular, CipherState, HandshakeState,
    MessageBuffer, NoiseSession, Pattern, SymmetricState,
};

/// Create an IK session.
///
/// The initiator must pass the responder's static key as `rs`; the
/// responder must pass `None` and learns the initiator's key from message 1.
/// Both sides bind the responder's static key into the transcript before
/// any message is exchanged.
pub fn init_session(
    initiator: bool,
    prologue: &[u8],
    s: KeyPair,
    rs: Option<&[u8; PUBLIC_KEY_SIZE]>,
) -> Result<NoiseSession> {
    let mut ss = SymmetricState::initialize(PROTOCOL_NAME_IK);
    ss.mix_hash(prologue);

    let rs = if initiator {
        let rs = rs.ok_or(NoiseError::MissingKeyMaterial(
            "IK initiator needs the responder's static key",
        ))?;
        if !is_valid_public_key(rs) {
            return Err(CryptoError::InvalidPublicKey.into());
        }
        ss.mix_hash(rs);
        *rs
    } else {
        if rs.is_some() {
            return Err(NoiseError::Config(
                "IK responder learns the initiator's static key from message 1".into(),
            ));
        }
        ss.mix_hash(s.public_key());
        create_empty_key()
    };

    let hs = HandshakeState::new(ss, s, rs);
    Ok(NoiseSession::new(Pattern::Ik, initiator, hs))
}

/// Write the next message of the schedule.
pub fn send_message(session: &mut NoiseSession, payload: &[u8]) -> Result<MessageBuffer> {
    ensure_pattern(session)?;
    session.step(|session| match session.message_count() {
        0 => {
            session.expect_turn(true, true)?;
            write_message_a(session.handshake_state_mut()?, payload)
        }
        1 => {
            session.expect_turn(false, true)?;
            let (message, cs1, cs2) = write_message_b(session.handshake_state_mut()?, payload)?;
            session.complete(cs1, cs2)?;
            Ok(message)
        }
        _ => write_message_regular(session.send_cipher_mut()?, payload),
    })
}

/// Read the next message of the schedule and return its payload.
pub fn recv_message(session: &mut NoiseSession, message: &MessageBuffer) -> Result<Vec<u8>> {
    ensure_pattern(session)?;
    session.step(|session| match session.message_count() {
        0 => {
            session.expect_turn(true, false)?;
            read_message_a(session.handshake_state_mut()?, message)
        }
        1 => {
            session.expect_turn(false, false)?;
            let (plaintext, cs1, cs2) = read_message_b(session.handshake_state_mut()?, message)?;
            session.complete(cs1, cs2)?;
            Ok(plaintext)
        }
        _ => read_message_regular(session.recv_cipher_mut()?, message),
    })
}

fn ensure_pattern(session: &NoiseSession) -> Result<()> {
    if session.pattern() != Pattern::Ik {
        return Err(session.sequence_error("session was not created for IK"));
    }
    Ok(())
}

fn write_message_a(hs: &mut HandshakeState, payload: &[u8]) -> Result<MessageBuffer> {
    let ne = write_ephemeral(hs, None);
    mix_ephemeral_dh(hs, Remote::Static)?;
    let ns = write_static(hs)?;
    mix_static_dh(hs, Remote::Static)?;
    let ciphertext = hs.ss.encrypt_and_hash(payload)?;

    Ok(MessageBuffer { ne, ns, ciphertext })
}

fn write_message_b(
    hs: &mut HandshakeState,
    payload: &[u8],
) -> Result<(MessageBuffer, CipherState, CipherState)> {
    let ne = write_ephemeral(hs, None);
    mix_ephemeral_dh(hs, Remote::Ephemeral)?;
    mix_ephemeral_dh(hs, Remote::Static)?;
    let ciphertext = hs.ss.encrypt_and_hash(payload)?;
    let (cs1, cs2) = hs.ss.split()?;

    let message = MessageBuffer {
        ne,
        ns: Vec::new(),
        ciphertext,
    };
    Ok((message, cs1, cs2))
}

fn read_message_a(hs: &mut HandshakeState, message: &MessageBuffer) -> Result<Vec<u8>> {
    read_ephemeral(hs, &message.ne)?;
    mix_static_dh(hs, Remote::Ephemeral)?;
    read_static(hs, &message.ns)?;
    mix_static_dh(hs, Remote::Static)?;
    Ok(hs.ss.decrypt_and_hash(&message.ciphertext)?)
}

fn read_message_b(
    hs: &mut HandshakeState,
    message: &MessageBuffer,
) -> Result<(Vec<u8>, CipherState, CipherState)> {
    read_ephemeral(hs, &message.ne)?;
    mix_ephemeral_dh(hs, Remote::Ephemeral)?;
    mix_static_dh(hs, Remote::Ephemeral)?;
    let plaintext = hs.ss.decrypt_and_hash(&message.ciphertext)?;
    let (cs1, cs2) = hs.ss.split()?;

    Ok((plaintext, cs1, cs2))
}
