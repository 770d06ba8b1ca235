//! Wire compatibility with an independent Noise implementation.
//!
//! snow puts a handshake message on the wire as the plain concatenation of
//! its fields, so converting is a matter of slicing at fixed offsets.

use libp2p_noise_handshake::crypto::KeyPair;
use libp2p_noise_handshake::noise::{ik, xx, MessageBuffer, NoiseSession};

const XX: &str = "Noise_XX_25519_ChaChaPoly_SHA256";
const IK: &str = "Noise_IK_25519_ChaChaPoly_SHA256";
const PROLOGUE: &[u8] = b"interop";
const ENC_S: usize = 48;

fn keypair() -> KeyPair {
    KeyPair::generate()
}

fn builder<'a>(pattern: &str) -> snow::Builder<'a> {
    snow::Builder::new(pattern.parse().unwrap())
}

fn snow_write(hs: &mut snow::HandshakeState, payload: &[u8]) -> Vec<u8> {
    let mut buf = vec![0u8; 65535];
    let len = hs.write_message(payload, &mut buf).unwrap();
    buf.truncate(len);
    buf
}

fn snow_read(hs: &mut snow::HandshakeState, message: &[u8]) -> Vec<u8> {
    let mut buf = vec![0u8; 65535];
    let len = hs.read_message(message, &mut buf).unwrap();
    buf.truncate(len);
    buf
}

/// Split a concatenated snow message into our fields.
fn split(raw: &[u8], has_e: bool, has_s: bool) -> MessageBuffer {
    let mut rest = raw;
    let mut ne = [0u8; 32];
    if has_e {
        ne.copy_from_slice(&rest[..32]);
        rest = &rest[32..];
    }
    let mut ns = Vec::new();
    if has_s {
        ns = rest[..ENC_S].to_vec();
        rest = &rest[ENC_S..];
    }
    MessageBuffer {
        ne,
        ns,
        ciphertext: rest.to_vec(),
    }
}

/// Concatenate our fields the way snow expects them.
fn join(message: &MessageBuffer, has_e: bool) -> Vec<u8> {
    let mut out = Vec::new();
    if has_e {
        out.extend_from_slice(&message.ne);
    }
    out.extend_from_slice(&message.ns);
    out.extend_from_slice(&message.ciphertext);
    out
}

fn assert_transport(
    ours: &mut NoiseSession,
    theirs: &mut snow::TransportState,
    send: fn(&mut NoiseSession, &[u8]) -> libp2p_noise_handshake::Result<MessageBuffer>,
    recv: fn(&mut NoiseSession, &MessageBuffer) -> libp2p_noise_handshake::Result<Vec<u8>>,
) {
    let mut buf = vec![0u8; 1024];

    let ct = send(ours, b"from us").unwrap();
    let len = theirs.read_message(&ct.ciphertext, &mut buf).unwrap();
    assert_eq!(&buf[..len], b"from us");

    let len = theirs.write_message(b"from snow", &mut buf).unwrap();
    let pt = recv(ours, &MessageBuffer::ciphertext_only(buf[..len].to_vec())).unwrap();
    assert_eq!(pt, b"from snow");
}

#[test]
fn test_xx_initiator_against_snow_responder() {
    let ours_s = keypair();
    let theirs_s = keypair();

    let mut ours = xx::init_session(true, PROLOGUE, ours_s.clone());
    let mut theirs = builder(XX)
        .local_private_key(theirs_s.private_key())
        .prologue(PROLOGUE)
        .build_responder()
        .unwrap();

    let m0 = xx::send_message(&mut ours, b"").unwrap();
    snow_read(&mut theirs, &join(&m0, true));

    let m1 = snow_write(&mut theirs, b"responder payload");
    let payload = xx::recv_message(&mut ours, &split(&m1, true, true)).unwrap();
    assert_eq!(payload, b"responder payload");
    assert_eq!(ours.remote_static_key(), Some(*theirs_s.public_key()));

    let m2 = xx::send_message(&mut ours, b"initiator payload").unwrap();
    assert_eq!(snow_read(&mut theirs, &join(&m2, false)), b"initiator payload");
    assert_eq!(theirs.get_remote_static().unwrap(), ours_s.public_key());

    assert_eq!(ours.handshake_hash().unwrap().as_slice(), theirs.get_handshake_hash());

    let mut theirs = theirs.into_transport_mode().unwrap();
    assert_transport(&mut ours, &mut theirs, xx::send_message, xx::recv_message);
}

#[test]
fn test_xx_responder_against_snow_initiator() {
    let ours_s = keypair();
    let theirs_s = keypair();

    let mut ours = xx::init_session(false, PROLOGUE, ours_s.clone());
    let mut theirs = builder(XX)
        .local_private_key(theirs_s.private_key())
        .prologue(PROLOGUE)
        .build_initiator()
        .unwrap();

    let m0 = snow_write(&mut theirs, b"");
    xx::recv_message(&mut ours, &split(&m0, true, false)).unwrap();

    let m1 = xx::send_message(&mut ours, b"hello").unwrap();
    assert_eq!(snow_read(&mut theirs, &join(&m1, true)), b"hello");

    let m2 = snow_write(&mut theirs, b"world");
    assert_eq!(xx::recv_message(&mut ours, &split(&m2, false, true)).unwrap(), b"world");
    assert_eq!(ours.remote_static_key(), Some(*theirs_s.public_key()));

    assert_eq!(ours.handshake_hash().unwrap().as_slice(), theirs.get_handshake_hash());

    let mut theirs = theirs.into_transport_mode().unwrap();
    assert_transport(&mut ours, &mut theirs, xx::send_message, xx::recv_message);
}

#[test]
fn test_ik_initiator_against_snow_responder() {
    let ours_s = keypair();
    let theirs_s = keypair();

    let mut ours = ik::init_session(true, PROLOGUE, ours_s.clone(), Some(theirs_s.public_key())).unwrap();
    let mut theirs = builder(IK)
        .local_private_key(theirs_s.private_key())
        .prologue(PROLOGUE)
        .build_responder()
        .unwrap();

    let m0 = ik::send_message(&mut ours, b"early").unwrap();
    assert_eq!(snow_read(&mut theirs, &join(&m0, true)), b"early");
    assert_eq!(theirs.get_remote_static().unwrap(), ours_s.public_key());

    let m1 = snow_write(&mut theirs, b"ack");
    assert_eq!(ik::recv_message(&mut ours, &split(&m1, true, false)).unwrap(), b"ack");
    assert!(ours.is_handshake_complete());

    assert_eq!(ours.handshake_hash().unwrap().as_slice(), theirs.get_handshake_hash());

    let mut theirs = theirs.into_transport_mode().unwrap();
    assert_transport(&mut ours, &mut theirs, ik::send_message, ik::recv_message);
}

#[test]
fn test_ik_responder_against_snow_initiator() {
    let ours_s = keypair();
    let theirs_s = keypair();

    let mut ours = ik::init_session(false, PROLOGUE, ours_s.clone(), None).unwrap();
    let mut theirs = builder(IK)
        .local_private_key(theirs_s.private_key())
        .remote_public_key(ours_s.public_key())
        .prologue(PROLOGUE)
        .build_initiator()
        .unwrap();

    let m0 = snow_write(&mut theirs, b"early");
    assert_eq!(ik::recv_message(&mut ours, &split(&m0, true, true)).unwrap(), b"early");
    assert_eq!(ours.remote_static_key(), Some(*theirs_s.public_key()));

    let m1 = ik::send_message(&mut ours, b"ack").unwrap();
    assert_eq!(snow_read(&mut theirs, &join(&m1, true)), b"ack");

    assert_eq!(ours.handshake_hash().unwrap().as_slice(), theirs.get_handshake_hash());

    let mut theirs = theirs.into_transport_mode().unwrap();
    assert_transport(&mut ours, &mut theirs, ik::send_message, ik::recv_message);
}
