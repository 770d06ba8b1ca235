//! Pattern-agnostic handshake steps shared by XX, IK and XX-fallback.

use zeroize::Zeroize;

use crate::core::{CryptoError, NoiseError, Result, PUBLIC_KEY_SIZE};
use crate::crypto::{self, is_valid_public_key, KeyPair};

use super::{CipherState, HandshakeState, MessageBuffer};

/// The sentinel for a 32-byte field that is not yet known.
pub fn create_empty_key() -> [u8; PUBLIC_KEY_SIZE] {
    [0u8; PUBLIC_KEY_SIZE]
}

/// Generate (or adopt) the local ephemeral key and mix its public half.
///
/// Returns the public key to put on the wire as `ne`.
pub(crate) fn write_ephemeral(
    hs: &mut HandshakeState,
    ephemeral: Option<KeyPair>,
) -> [u8; PUBLIC_KEY_SIZE] {
    let e = ephemeral.unwrap_or_else(KeyPair::generate);
    let ne = *e.public_key();
    hs.ss.mix_hash(&ne);
    hs.e = Some(e);
    ne
}

/// Accept the peer's ephemeral key and mix it into the transcript.
pub(crate) fn read_ephemeral(hs: &mut HandshakeState, ne: &[u8; PUBLIC_KEY_SIZE]) -> Result<()> {
    if !is_valid_public_key(ne) {
        return Err(CryptoError::InvalidPublicKey.into());
    }
    hs.re = *ne;
    hs.ss.mix_hash(&hs.re);
    Ok(())
}

/// Encrypt and send our static public key.
pub(crate) fn write_static(hs: &mut HandshakeState) -> Result<Vec<u8>> {
    let spk = *hs.s.public_key();
    Ok(hs.ss.encrypt_and_hash(&spk)?)
}

/// Decrypt the peer's static key; it is adopted only if it is a 32-byte
/// valid curve point.
pub(crate) fn read_static(hs: &mut HandshakeState, ns: &[u8]) -> Result<()> {
    let plaintext = hs.ss.decrypt_and_hash(ns)?;
    if !is_valid_public_key(&plaintext) {
        return Err(CryptoError::InvalidPublicKey.into());
    }
    hs.rs.copy_from_slice(&plaintext);
    Ok(())
}

/// `mix_key(dh(e, remote))` using the local ephemeral private key.
pub(crate) fn mix_ephemeral_dh(hs: &mut HandshakeState, remote: Remote) -> Result<()> {
    let e = hs.e.as_ref().ok_or(CryptoError::MissingEphemeralKey)?;
    let mut shared = crypto::dh(e.private_key(), remote.key(hs));
    let mixed = hs.ss.mix_key(&shared);
    shared.zeroize();
    Ok(mixed?)
}

/// `mix_key(dh(s, remote))` using the local static private key.
pub(crate) fn mix_static_dh(hs: &mut HandshakeState, remote: Remote) -> Result<()> {
    let mut shared = crypto::dh(hs.s.private_key(), remote.key(hs));
    let mixed = hs.ss.mix_key(&shared);
    shared.zeroize();
    Ok(mixed?)
}

/// Which remote public key a DH step uses.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Remote {
    Ephemeral,
    Static,
}

impl Remote {
    fn key(self, hs: &HandshakeState) -> &[u8; PUBLIC_KEY_SIZE] {
        match self {
            Remote::Ephemeral => &hs.re,
            Remote::Static => &hs.rs,
        }
    }
}

/// Transport-phase send: one AEAD encryption under `cs`, no associated
/// data, nothing mixed into any transcript.
pub fn write_message_regular(cs: &mut CipherState, payload: &[u8]) -> Result<MessageBuffer> {
    if !cs.has_key() {
        return Err(NoiseError::MissingKeyMaterial("transport cipher state has no key"));
    }
    let ciphertext = cs.encrypt_with_ad(&[], payload)?;
    Ok(MessageBuffer::ciphertext_only(ciphertext))
}

/// Transport-phase receive, the inverse of [`write_message_regular`].
pub fn read_message_regular(cs: &mut CipherState, message: &MessageBuffer) -> Result<Vec<u8>> {
    if !cs.has_key() {
        return Err(NoiseError::MissingKeyMaterial("transport cipher state has no key"));
    }
    Ok(cs.decrypt_with_ad(&[], &message.ciphertext)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PROTOCOL_NAME_XX;
    use crate::noise::SymmetricState;

    fn handshake_state() -> HandshakeState {
        HandshakeState::new(
            SymmetricState::initialize(PROTOCOL_NAME_XX),
            KeyPair::generate(),
            create_empty_key(),
        )
    }

    #[test]
    fn test_read_ephemeral_rejects_zero_key() {
        let mut hs = handshake_state();
        let before = *hs.ss.handshake_hash();

        let result = read_ephemeral(&mut hs, &create_empty_key());
        assert!(matches!(result, Err(NoiseError::Crypto(CryptoError::InvalidPublicKey))));
        assert_eq!(hs.ss.handshake_hash(), &before);
    }

    #[test]
    fn test_ephemeral_dh_requires_ephemeral() {
        let mut hs = handshake_state();
        let result = mix_ephemeral_dh(&mut hs, Remote::Ephemeral);
        assert!(matches!(result, Err(NoiseError::Crypto(CryptoError::MissingEphemeralKey))));
    }

    #[test]
    fn test_write_ephemeral_adopts_given_key() {
        let mut hs = handshake_state();
        let e = KeyPair::generate();
        let expected = *e.public_key();

        assert_eq!(write_ephemeral(&mut hs, Some(e)), expected);
        assert_eq!(hs.local_ephemeral().map(|k| *k.public_key()), Some(expected));
    }

    #[test]
    fn test_regular_messages_need_a_key() {
        let mut cs = CipherState::empty();
        assert!(matches!(
            write_message_regular(&mut cs, b"data"),
            Err(NoiseError::MissingKeyMaterial(_))
        ));
    }

    #[test]
    fn test_regular_roundtrip() {
        let mut tx = CipherState::new([5; 32]);
        let mut rx = CipherState::new([5; 32]);

        let message = write_message_regular(&mut tx, b"transport").unwrap();
        assert_eq!(message.ne, create_empty_key());
        assert!(message.ns.is_empty());
        assert_eq!(read_message_regular(&mut rx, &message).unwrap(), b"transport");
    }
}
