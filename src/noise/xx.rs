//! Noise XX: three-message mutual authentication.
//!
//! ```text
//! XX:
//!   -> e
//!   <- e, ee, s, es
//!   -> s, se
//! ```
//!
//! Call [`send_message`] and [`recv_message`] alternately following the
//! schedule above; after message 3 the same functions carry transport
//! traffic on the split CipherStates.

use crate::core::{NoiseError, Result, PROTOCOL_NAME_XX};
use crate::crypto::KeyPair;

use super::primitives::{
    mix_ephemeral_dh, mix_static_dh, read_ephemeral, read_static, write_ephemeral, write_static,
    Remote,
};
use super::{
    create_empty_key, read_message_regular, write_message_regular, CipherState, HandshakeState,
    MessageBuffer, NoiseSession, Pattern, SymmetricState,
};

/// Create an XX session. The remote static key is learned during the
/// handshake.
pub fn init_session(initiator: bool, prologue: &[u8], s: KeyPair) -> NoiseSession {
    let mut ss = SymmetricState::initialize(PROTOCOL_NAME_XX);
    ss.mix_hash(prologue);
    let hs = HandshakeState::new(ss, s, create_empty_key());
    NoiseSession::new(Pattern::Xx, initiator, hs)
}

/// Write the next message of the schedule.
pub fn send_message(session: &mut NoiseSession, payload: &[u8]) -> Result<MessageBuffer> {
    send_message_with_ephemeral(session, payload, None)
}

/// Write the next message, adopting `ephemeral` instead of generating a
/// fresh key when this message carries one.
///
/// XX-fallback uses this to resend the ephemeral key already on the wire
/// from an abandoned IK attempt.
pub fn send_message_with_ephemeral(
    session: &mut NoiseSession,
    payload: &[u8],
    ephemeral: Option<KeyPair>,
) -> Result<MessageBuffer> {
    ensure_pattern(session)?;
    session.step(|session| match session.message_count() {
        0 => {
            session.expect_turn(true, true)?;
            write_message_a(session.handshake_state_mut()?, payload, ephemeral)
        }
        1 => {
            session.expect_turn(false, true)?;
            write_message_b(session.handshake_state_mut()?, payload, ephemeral)
        }
        _ if ephemeral.is_some() => {
            Err(session.sequence_error("this message carries no ephemeral key"))
        }
        2 => {
            session.expect_turn(true, true)?;
            let (message, cs1, cs2) = write_message_c(session.handshake_state_mut()?, payload)?;
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
            read_message_b(session.handshake_state_mut()?, message)
        }
        2 => {
            session.expect_turn(true, false)?;
            let (plaintext, cs1, cs2) = read_message_c(session.handshake_state_mut()?, message)?;
            session.complete(cs1, cs2)?;
            Ok(plaintext)
        }
        _ => read_message_regular(session.recv_cipher_mut()?, message),
    })
}

fn ensure_pattern(session: &NoiseSession) -> Result<()> {
    if session.pattern() != Pattern::Xx {
        return Err(session.sequence_error("session was not created for XX"));
    }
    Ok(())
}

fn write_message_a(
    hs: &mut HandshakeState,
    payload: &[u8],
    ephemeral: Option<KeyPair>,
) -> Result<MessageBuffer> {
    let ne = write_ephemeral(hs, ephemeral);
    let ciphertext = hs.ss.encrypt_and_hash(payload)?;

    Ok(MessageBuffer {
        ne,
        ns: Vec::new(),
        ciphertext,
    })
}

fn write_message_b(
    hs: &mut HandshakeState,
    payload: &[u8],
    ephemeral: Option<KeyPair>,
) -> Result<MessageBuffer> {
    let ne = write_ephemeral(hs, ephemeral);
    mix_ephemeral_dh(hs, Remote::Ephemeral)?;
    let ns = write_static(hs)?;
    mix_static_dh(hs, Remote::Ephemeral)?;
    let ciphertext = hs.ss.encrypt_and_hash(payload)?;

    Ok(MessageBuffer { ne, ns, ciphertext })
}

fn write_message_c(
    hs: &mut HandshakeState,
    payload: &[u8],
) -> Result<(MessageBuffer, CipherState, CipherState)> {
    let ns = write_static(hs)?;
    mix_static_dh(hs, Remote::Ephemeral)?;
    let ciphertext = hs.ss.encrypt_and_hash(payload)?;
    let (cs1, cs2) = hs.ss.split()?;

    let message = MessageBuffer {
        ne: create_empty_key(),
        ns,
        ciphertext,
    };
    Ok((message, cs1, cs2))
}

fn read_message_a(hs: &mut HandshakeState, message: &MessageBuffer) -> Result<Vec<u8>> {
    if !message.ns.is_empty() {
        return Err(NoiseError::Framing("XX message 1 carries no static key".into()));
    }
    read_ephemeral(hs, &message.ne)?;
    Ok(hs.ss.decrypt_and_hash(&message.ciphertext)?)
}

fn read_message_b(hs: &mut HandshakeState, message: &MessageBuffer) -> Result<Vec<u8>> {
    read_ephemeral(hs, &message.ne)?;
    mix_ephemeral_dh(hs, Remote::Ephemeral)?;
    read_static(hs, &message.ns)?;
    mix_ephemeral_dh(hs, Remote::Static)?;
    Ok(hs.ss.decrypt_and_hash(&message.ciphertext)?)
}

fn read_message_c(
    hs: &mut HandshakeState,
    message: &MessageBuffer,
) -> Result<(Vec<u8>, CipherState, CipherState)> {
    read_static(hs, &message.ns)?;
    mix_ephemeral_dh(hs, Remote::Static)?;
    let plaintext = hs.ss.decrypt_and_hash(&message.ciphertext)?;
    let (cs1, cs2) = hs.ss.split()?;

    Ok((plaintext, cs1, cs2))
}
