//! Handshake message buffers and their wire framing.
//!
//! ```text
//! message 0:  ne (32) | ciphertext
//! message 1:  ne (32) | ns_len (u16 BE) | ns | ciphertext
//! message 2:  ns_len (u16 BE) | ns | ciphertext
//! ```
//!
//! Each encoded message is carried as one length-prefixed frame by the
//! transport; the framing here never includes that outer prefix.

use crate::core::{NoiseError, Result, LENGTH_PREFIX_SIZE, MAX_FRAME_LEN, PUBLIC_KEY_SIZE};

use super::create_empty_key;

/// One handshake or transport message, split into its fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageBuffer {
    /// Ephemeral public key, zero-filled when this message carries none.
    pub ne: [u8; PUBLIC_KEY_SIZE],
    /// Encrypted static key, empty when this message carries none.
    pub ns: Vec<u8>,
    /// Encrypted payload.
    pub ciphertext: Vec<u8>,
}

impl MessageBuffer {
    /// A message carrying only ciphertext (transport phase, XX message 2
    /// before its static key is attached).
    pub fn ciphertext_only(ciphertext: Vec<u8>) -> Self {
        Self {
            ne: create_empty_key(),
            ns: Vec::new(),
            ciphertext,
        }
    }
}

/// Encode message 0: `ne ‖ ciphertext`.
pub fn encode0(message: &MessageBuffer) -> Vec<u8> {
    let mut out = Vec::with_capacity(PUBLIC_KEY_SIZE + message.ciphertext.len());
    out.extend_from_slice(&message.ne);
    out.extend_from_slice(&message.ciphertext);
    out
}

/// Encode message 1: `ne ‖ len(ns) ‖ ns ‖ ciphertext`.
pub fn encode1(message: &MessageBuffer) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(
        PUBLIC_KEY_SIZE + LENGTH_PREFIX_SIZE + message.ns.len() + message.ciphertext.len(),
    );
    out.extend_from_slice(&message.ne);
    put_length_prefixed(&mut out, &message.ns)?;
    out.extend_from_slice(&message.ciphertext);
    Ok(out)
}

/// Encode message 2: `len(ns) ‖ ns ‖ ciphertext`.
pub fn encode2(message: &MessageBuffer) -> Result<Vec<u8>> {
    let mut out =
        Vec::with_capacity(LENGTH_PREFIX_SIZE + message.ns.len() + message.ciphertext.len());
    put_length_prefixed(&mut out, &message.ns)?;
    out.extend_from_slice(&message.ciphertext);
    Ok(out)
}

/// Decode message 0.
pub fn decode0(input: &[u8]) -> Result<MessageBuffer> {
    let (ne, rest) = take_ephemeral(input)?;
    Ok(MessageBuffer {
        ne,
        ns: Vec::new(),
        ciphertext: rest.to_vec(),
    })
}

/// Decode message 1.
pub fn decode1(input: &[u8]) -> Result<MessageBuffer> {
    let (ne, rest) = take_ephemeral(input)?;
    let (ns, ciphertext) = take_length_prefixed(rest)?;
    Ok(MessageBuffer {
        ne,
        ns: ns.to_vec(),
        ciphertext: ciphertext.to_vec(),
    })
}

/// Decode message 2.
pub fn decode2(input: &[u8]) -> Result<MessageBuffer> {
    let (ns, ciphertext) = take_length_prefixed(input)?;
    Ok(MessageBuffer {
        ne: create_empty_key(),
        ns: ns.to_vec(),
        ciphertext: ciphertext.to_vec(),
    })
}

fn put_length_prefixed(out: &mut Vec<u8>, field: &[u8]) -> Result<()> {
    if field.len() > MAX_FRAME_LEN {
        return Err(NoiseError::Framing(format!(
            "static key field of {} bytes does not fit a u16 length",
            field.len()
        )));
    }
    out.extend_from_slice(&(field.len() as u16).to_be_bytes());
    out.extend_from_slice(field);
    Ok(())
}

fn take_ephemeral(input: &[u8]) -> Result<([u8; PUBLIC_KEY_SIZE], &[u8])> {
    if input.len() < PUBLIC_KEY_SIZE {
        return Err(NoiseError::Framing(format!(
            "message of {} bytes is shorter than an ephemeral key",
            input.len()
        )));
    }
    let (ne, rest) = input.split_at(PUBLIC_KEY_SIZE);
    let mut key = [0u8; PUBLIC_KEY_SIZE];
    key.copy_from_slice(ne);
    Ok((key, rest))
}

fn take_length_prefixed(input: &[u8]) -> Result<(&[u8], &[u8])> {
    if input.len() < LENGTH_PREFIX_SIZE {
        return Err(NoiseError::Framing("missing static key length".into()));
    }
    let len = u16::from_be_bytes([input[0], input[1]]) as usize;
    let rest = &input[LENGTH_PREFIX_SIZE..];
    if rest.len() < len {
        return Err(NoiseError::Framing(format!(
            "static key length {} exceeds remaining {} bytes",
            len,
            rest.len()
        )));
    }
    Ok(rest.split_at(len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample() -> MessageBuffer {
        MessageBuffer {
            ne: [0xAB; PUBLIC_KEY_SIZE],
            ns: vec![0x01; 48],
            ciphertext: vec![0x02; 20],
        }
    }

    #[test]
    fn test_encode1_layout() {
        let encoded = encode1(&sample()).unwrap();

        assert_eq!(encoded.len(), 32 + 2 + 48 + 20);
        assert_eq!(&encoded[..32], &[0xAB; 32]);
        assert_eq!(&encoded[32..34], &48u16.to_be_bytes());
        assert_eq!(&encoded[34..82], &[0x01; 48][..]);
        assert_eq!(&encoded[82..], &[0x02; 20][..]);
    }

    #[test]
    fn test_decode0_ephemeral_only() {
        let decoded = decode0(&[0x55; 32]).unwrap();
        assert_eq!(decoded.ne, [0x55; 32]);
        assert!(decoded.ns.is_empty());
        assert!(decoded.ciphertext.is_empty());
    }

    #[test]
    fn test_decode_short_input_is_framing_error() {
        assert!(matches!(decode0(&[0u8; 31]), Err(NoiseError::Framing(_))));
        assert!(matches!(decode1(&[0u8; 33]), Err(NoiseError::Framing(_))));
        assert!(matches!(decode2(&[0u8; 1]), Err(NoiseError::Framing(_))));
    }

    #[test]
    fn test_decode_overlong_ns_is_framing_error() {
        let mut input = vec![0u8; 32];
        input.extend_from_slice(&100u16.to_be_bytes());
        input.extend_from_slice(&[0u8; 10]);
        assert!(matches!(decode1(&input), Err(NoiseError::Framing(_))));
    }

    proptest! {
        #[test]
        fn prop_message0_roundtrip(ne in any::<[u8; 32]>(), ct in proptest::collection::vec(any::<u8>(), 0..256)) {
            let message = MessageBuffer { ne, ns: Vec::new(), ciphertext: ct };
            prop_assert_eq!(decode0(&encode0(&message)).unwrap(), message);
        }

        #[test]
        fn prop_message1_roundtrip(
            ne in any::<[u8; 32]>(),
            ns in proptest::collection::vec(any::<u8>(), 0..96),
            ct in proptest::collection::vec(any::<u8>(), 0..256),
        ) {
            let message = MessageBuffer { ne, ns, ciphertext: ct };
            prop_assert_eq!(decode1(&encode1(&message).unwrap()).unwrap(), message);
        }

        #[test]
        fn prop_message2_roundtrip(
            ns in proptest::collection::vec(any::<u8>(), 0..96),
            ct in proptest::collection::vec(any::<u8>(), 0..256),
        ) {
            let message = MessageBuffer { ne: create_empty_key(), ns, ciphertext: ct };
            prop_assert_eq!(decode2(&encode2(&message).unwrap()).unwrap(), message);
        }
    }
}
