//! Signed handshake payload

use tracing::debug;

use super::proto::{self, Field, Reader};
use super::{verify_signature, IdentityKeypair, PeerId, PublicKeyContainer};
use crate::core::{IdentityError, EARLY_DATA_DOMAIN, PUBLIC_KEY_SIZE, STATIC_KEY_DOMAIN};

const FIELD_LIBP2P_KEY: u64 = 1;
const FIELD_STATIC_KEY_SIGNATURE: u64 = 2;
const FIELD_LIBP2P_DATA: u64 = 3;
const FIELD_LIBP2P_DATA_SIGNATURE: u64 = 4;

/// The payload carried inside the encrypted part of a handshake message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandshakePayload {
    /// Identity public-key container.
    pub libp2p_key: Vec<u8>,
    /// Signature over `"noise-libp2p-static-key:" ‖ noise static key`.
    pub noise_static_key_signature: Vec<u8>,
    /// Optional early application data.
    pub libp2p_data: Vec<u8>,
    /// Signature over `"noise-libp2p-early-data:" ‖ libp2p_data`.
    pub libp2p_data_signature: Vec<u8>,
}

impl HandshakePayload {
    /// Protobuf encoding. Empty fields are omitted.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            self.libp2p_key.len()
                + self.noise_static_key_signature.len()
                + self.libp2p_data.len()
                + self.libp2p_data_signature.len()
                + 12,
        );
        for (field, bytes) in [
            (FIELD_LIBP2P_KEY, &self.libp2p_key),
            (FIELD_STATIC_KEY_SIGNATURE, &self.noise_static_key_signature),
            (FIELD_LIBP2P_DATA, &self.libp2p_data),
            (FIELD_LIBP2P_DATA_SIGNATURE, &self.libp2p_data_signature),
        ] {
            if !bytes.is_empty() {
                proto::put_bytes_field(&mut out, field, bytes);
            }
        }
        out
    }

    /// Decode from protobuf. Unknown fields are skipped.
    pub fn decode(bytes: &[u8]) -> Result<Self, IdentityError> {
        let mut payload = Self::default();
        let mut reader = Reader::new(bytes);

        while let Some((field, value)) = reader.next_field()? {
            let slot = match field {
                FIELD_LIBP2P_KEY => &mut payload.libp2p_key,
                FIELD_STATIC_KEY_SIGNATURE => &mut payload.noise_static_key_signature,
                FIELD_LIBP2P_DATA => &mut payload.libp2p_data,
                FIELD_LIBP2P_DATA_SIGNATURE => &mut payload.libp2p_data_signature,
                _ => continue,
            };
            match value {
                Field::Bytes(b) => *slot = b.to_vec(),
                _ => return Err(proto::malformed("payload field has wrong wire type")),
            }
        }

        Ok(payload)
    }

    /// Whether the payload carries early data.
    pub fn has_early_data(&self) -> bool {
        !self.libp2p_data.is_empty()
    }
}

fn domain_separated(domain: &[u8], data: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(domain.len() + data.len());
    message.extend_from_slice(domain);
    message.extend_from_slice(data);
    message
}

/// Build the encoded payload proving `identity` owns `noise_static_pk`.
///
/// # Arguments
///
/// * `identity` - Ed25519 identity that signs the static key
/// * `noise_static_pk` - Local Noise static public key
/// * `early_data` - Optional application data to sign and carry along
///
/// # Returns
///
/// Protobuf-encoded [`HandshakePayload`].
pub fn create_handshake_payload(
    identity: &IdentityKeypair,
    noise_static_pk: &[u8; PUBLIC_KEY_SIZE],
    early_data: Option<&[u8]>,
) -> Vec<u8> {
    let mut payload = HandshakePayload {
        libp2p_key: identity.public_key_container(),
        noise_static_key_signature: identity
            .sign(&domain_separated(STATIC_KEY_DOMAIN, noise_static_pk))
            .to_vec(),
        ..Default::default()
    };

    if let Some(data) = early_data.filter(|d| !d.is_empty()) {
        payload.libp2p_data = data.to_vec();
        payload.libp2p_data_signature = identity
            .sign(&domain_separated(EARLY_DATA_DOMAIN, data))
            .to_vec();
    }

    payload.encode()
}

/// Check a received handshake payload.
///
/// The payload's identity key must hash to `expected` (when given), its
/// static-key signature must cover `noise_static_pk` (the peer's decrypted
/// Noise static key), and any early data must carry a valid signature.
///
/// # Returns
///
/// The peer id derived from the payload and the decoded payload.
pub fn verify_signed_payload(
    noise_static_pk: &[u8],
    plaintext: &[u8],
    expected: Option<&PeerId>,
) -> Result<(PeerId, HandshakePayload), IdentityError> {
    let payload = HandshakePayload::decode(plaintext)?;
    let peer_id = PeerId::from_public_key(&payload.libp2p_key);

    if let Some(expected) = expected {
        if *expected != peer_id {
            debug!(%expected, actual = %peer_id, "peer id mismatch");
            return Err(IdentityError::PeerIdMismatch);
        }
    }

    let key = PublicKeyContainer::decode(&payload.libp2p_key)?.to_ed25519()?;
    verify_signature(
        &key,
        &domain_separated(STATIC_KEY_DOMAIN, noise_static_pk),
        &payload.noise_static_key_signature,
    )?;

    if payload.has_early_data() {
        verify_signature(
            &key,
            &domain_separated(EARLY_DATA_DOMAIN, &payload.libp2p_data),
            &payload.libp2p_data_signature,
        )?;
    }

    Ok((peer_id, payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    #[test]
    fn test_payload_verifies() {
        let identity = IdentityKeypair::generate();
        let noise = KeyPair::generate();
        let encoded = create_handshake_payload(&identity, noise.public_key(), None);

        let (peer_id, payload) =
            verify_signed_payload(noise.public_key(), &encoded, Some(&identity.peer_id())).unwrap();
        assert_eq!(peer_id, identity.peer_id());
        assert_eq!(payload.libp2p_key, identity.public_key_container());
        assert!(!payload.has_early_data());
    }

    #[test]
    fn test_no_expected_peer_accepts_any_identity() {
        let identity = IdentityKeypair::generate();
        let noise = KeyPair::generate();
        let encoded = create_handshake_payload(&identity, noise.public_key(), None);

        let (peer_id, _) = verify_signed_payload(noise.public_key(), &encoded, None).unwrap();
        assert_eq!(peer_id, identity.peer_id());
    }

    #[test]
    fn test_wrong_peer_id() {
        let identity = IdentityKeypair::generate();
        let noise = KeyPair::generate();
        let encoded = create_handshake_payload(&identity, noise.public_key(), None);
        let other = IdentityKeypair::generate().peer_id();

        assert_eq!(
            verify_signed_payload(noise.public_key(), &encoded, Some(&other)),
            Err(IdentityError::PeerIdMismatch)
        );
    }

    #[test]
    fn test_wrong_static_key() {
        let identity = IdentityKeypair::generate();
        let noise = KeyPair::generate();
        let encoded = create_handshake_payload(&identity, noise.public_key(), None);
        let other = KeyPair::generate();

        assert_eq!(
            verify_signed_payload(other.public_key(), &encoded, None),
            Err(IdentityError::InvalidSignature)
        );
    }

    #[test]
    fn test_early_data_round_trip() {
        let identity = IdentityKeypair::generate();
        let noise = KeyPair::generate();
        let encoded = create_handshake_payload(&identity, noise.public_key(), Some(b"/yamux/1.0.0".as_slice()));

        let (_, payload) = verify_signed_payload(noise.public_key(), &encoded, None).unwrap();
        assert_eq!(payload.libp2p_data, b"/yamux/1.0.0");
        assert_eq!(payload.libp2p_data_signature.len(), 64);
    }

    #[test]
    fn test_tampered_early_data() {
        let identity = IdentityKeypair::generate();
        let noise = KeyPair::generate();
        let encoded = create_handshake_payload(&identity, noise.public_key(), Some(b"data".as_slice()));

        let mut payload = HandshakePayload::decode(&encoded).unwrap();
        payload.libp2p_data = b"dat4".to_vec();

        assert_eq!(
            verify_signed_payload(noise.public_key(), &payload.encode(), None),
            Err(IdentityError::InvalidSignature)
        );
    }

    #[test]
    fn test_unknown_fields_skipped() {
        let identity = IdentityKeypair::generate();
        let noise = KeyPair::generate();
        let mut encoded = create_handshake_payload(&identity, noise.public_key(), None);
        proto::put_varint_field(&mut encoded, 9, 1234);
        proto::put_bytes_field(&mut encoded, 10, b"extension");

        assert!(verify_signed_payload(noise.public_key(), &encoded, None).is_ok());
    }

    #[test]
    fn test_empty_payload_rejected() {
        let noise = KeyPair::generate();
        assert!(matches!(
            verify_signed_payload(noise.public_key(), &[], None),
            Err(IdentityError::MalformedPayload(_))
        ));
    }
}
