//! libp2p identity binding for Noise handshakes.
//!
//! A peer proves ownership of its Noise static key by signing it with a
//! long-lived Ed25519 identity key. The signature travels inside the
//! handshake payload ([`HandshakePayload`]) together with the identity
//! public key, wrapped in the libp2p public-key container.

mod payload;
mod proto;

pub use payload::{create_handshake_payload, verify_signed_payload, HandshakePayload};

use std::fmt;

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::core::{IdentityError, ED25519_PUBLIC_KEY_SIZE, ED25519_SIGNATURE_SIZE};
use proto::{Field, Reader};

/// Key type tag for Ed25519 in the public-key container.
pub const KEY_TYPE_ED25519: u64 = 1;

/// Containers up to this size are inlined into the peer id.
const MAX_INLINE_KEY_LENGTH: usize = 42;

const MULTIHASH_IDENTITY: u8 = 0x00;
const MULTIHASH_SHA256: u8 = 0x12;

/// Ed25519 identity key pair.
#[derive(Clone)]
pub struct IdentityKeypair {
    signing_key: SigningKey,
}

impl IdentityKeypair {
    /// Generate a new random identity.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Restore an identity from its 32-byte secret seed.
    pub fn from_bytes(secret: &[u8; 32]) -> Self {
        let mut seed = *secret;
        let signing_key = SigningKey::from_bytes(&seed);
        seed.zeroize();
        Self { signing_key }
    }

    /// Raw 32-byte Ed25519 public key.
    pub fn public_key_bytes(&self) -> [u8; ED25519_PUBLIC_KEY_SIZE] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Public key wrapped in the libp2p public-key container.
    pub fn public_key_container(&self) -> Vec<u8> {
        encode_public_key(&self.public_key_bytes())
    }

    /// Peer id derived from this identity.
    pub fn peer_id(&self) -> PeerId {
        PeerId::from_public_key(&self.public_key_container())
    }

    /// Sign `message`.
    pub fn sign(&self, message: &[u8]) -> [u8; ED25519_SIGNATURE_SIZE] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl fmt::Debug for IdentityKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityKeypair")
            .field("public_key", &hex::encode(self.public_key_bytes()))
            .finish_non_exhaustive()
    }
}

/// Encode a raw Ed25519 key as a libp2p public-key container.
pub fn encode_public_key(ed25519_key: &[u8; ED25519_PUBLIC_KEY_SIZE]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + ED25519_PUBLIC_KEY_SIZE);
    proto::put_varint_field(&mut out, 1, KEY_TYPE_ED25519);
    proto::put_bytes_field(&mut out, 2, ed25519_key);
    out
}

/// A decoded public-key container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyContainer {
    /// Key type tag.
    pub key_type: u64,
    /// Raw key bytes.
    pub data: Vec<u8>,
}

impl PublicKeyContainer {
    /// Decode the container bytes. Both fields are required.
    pub fn decode(bytes: &[u8]) -> Result<Self, IdentityError> {
        let mut key_type = None;
        let mut data = None;

        let mut reader = Reader::new(bytes);
        while let Some((field, value)) = reader.next_field()? {
            match (field, value) {
                (1, Field::Varint(v)) => key_type = Some(v),
                (2, Field::Bytes(b)) => data = Some(b.to_vec()),
                (1 | 2, _) => return Err(proto::malformed("public key field has wrong wire type")),
                _ => {}
            }
        }

        match (key_type, data) {
            (Some(key_type), Some(data)) => Ok(Self { key_type, data }),
            _ => Err(proto::malformed("public key container is missing a field")),
        }
    }

    /// Interpret the container as an Ed25519 verifying key.
    pub fn to_ed25519(&self) -> Result<VerifyingKey, IdentityError> {
        if self.key_type != KEY_TYPE_ED25519 {
            return Err(IdentityError::UnsupportedKeyType(self.key_type));
        }
        let raw: [u8; ED25519_PUBLIC_KEY_SIZE] = self
            .data
            .as_slice()
            .try_into()
            .map_err(|_| IdentityError::InvalidPublicKey)?;
        VerifyingKey::from_bytes(&raw).map_err(|_| IdentityError::InvalidPublicKey)
    }
}

/// Verify an Ed25519 signature over `message`.
pub(crate) fn verify_signature(
    key: &VerifyingKey,
    message: &[u8],
    signature: &[u8],
) -> Result<(), IdentityError> {
    let signature = ed25519_dalek::Signature::from_slice(signature)
        .map_err(|_| IdentityError::InvalidSignature)?;
    key.verify(message, &signature)
        .map_err(|_| IdentityError::InvalidSignature)
}

/// libp2p peer identifier: a multihash of the public-key container.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PeerId {
    multihash: Vec<u8>,
}

impl PeerId {
    /// Derive the identifier from public-key container bytes.
    pub fn from_public_key(container: &[u8]) -> Self {
        let mut multihash = Vec::with_capacity(2 + container.len().max(32));
        if container.len() <= MAX_INLINE_KEY_LENGTH {
            multihash.push(MULTIHASH_IDENTITY);
            multihash.push(container.len() as u8);
            multihash.extend_from_slice(container);
        } else {
            multihash.push(MULTIHASH_SHA256);
            multihash.push(32);
            multihash.extend_from_slice(&Sha256::digest(container));
        }
        Self { multihash }
    }

    /// Wrap already-encoded multihash bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            multihash: bytes.to_vec(),
        }
    }

    /// Multihash bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.multihash
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.multihash))
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerId({self})")
    }
}
