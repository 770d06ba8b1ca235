//! IK over a connection

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

use super::{verify_remote, NoiseConfig, RemoteIdentity, SecureSession};
use crate::core::{NoiseError, Result, PUBLIC_KEY_SIZE};
use crate::crypto::KeyPair;
use crate::identity::PeerId;
use crate::noise::{decode1, encode1, ik, NoiseSession};
use crate::transport::HandshakeConnection;

/// Drives an IK handshake over a connection.
///
/// If a stage fails after a frame was received, the raw frame and (on the
/// initiator) the ephemeral key pair already on the wire stay available so
/// the caller can continue with [`XxFallbackHandshake`](super::XxFallbackHandshake).
pub struct IkHandshake<'a, S> {
    config: &'a NoiseConfig,
    conn: HandshakeConnection<S>,
    session: NoiseSession,
    expected_peer: Option<PeerId>,
    remote: Option<RemoteIdentity>,
    received: Option<Vec<u8>>,
    ephemeral: Option<KeyPair>,
}

impl<'a, S> IkHandshake<'a, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Create a driver.
    ///
    /// The initiator must know the responder's static key.
    pub fn new(
        config: &'a NoiseConfig,
        conn: HandshakeConnection<S>,
        initiator: bool,
        remote_static: Option<&[u8; PUBLIC_KEY_SIZE]>,
        expected_peer: Option<PeerId>,
    ) -> Result<Self> {
        let session = ik::init_session(
            initiator,
            &config.prologue,
            config.static_keypair.clone(),
            remote_static,
        )?;
        Ok(Self {
            config,
            conn,
            session,
            expected_peer,
            remote: None,
            received: None,
            ephemeral: None,
        })
    }

    /// Message 1: the initiator sends its ephemeral key, static key and
    /// signed payload; the responder checks them.
    pub async fn stage0(&mut self) -> Result<()> {
        if self.session.is_initiator() {
            let payload = self.config.handshake_payload();
            let message = ik::send_message(&mut self.session, &payload)?;
            self.ephemeral = self
                .session
                .handshake_state()
                .and_then(|hs| hs.local_ephemeral())
                .cloned();
            self.conn.write_frame(&encode1(&message)?).await?;
            debug!("IK stage 0: initiator sent first message");
        } else {
            debug!("IK stage 0: responder waiting for first message");
            let frame = self.conn.read_frame().await?;
            let message = decode1(&frame);
            self.received = Some(frame);
            let plaintext = ik::recv_message(&mut self.session, &message?)?;
            self.remote = Some(verify_remote(
                &self.session,
                &plaintext,
                self.expected_peer.as_ref(),
                "Error occurred while verifying initiator's signed payload",
            )?);
            debug!("IK stage 0: responder verified initiator's payload");
        }
        Ok(())
    }

    /// Message 2: the responder answers; both sides derive transport keys.
    pub async fn stage1(&mut self) -> Result<()> {
        if self.session.is_initiator() {
            debug!("IK stage 1: initiator waiting for responder's reply");
            let frame = self.conn.read_frame().await?;
            let message = decode1(&frame);
            self.received = Some(frame);
            let plaintext = ik::recv_message(&mut self.session, &message?)?;
            self.remote = Some(verify_remote(
                &self.session,
                &plaintext,
                self.expected_peer.as_ref(),
                "Error occurred while verifying responder's signed payload",
            )?);
            debug!("IK stage 1: initiator verified responder's payload");
        } else {
            let payload = self.config.handshake_payload();
            let message = ik::send_message(&mut self.session, &payload)?;
            self.conn.write_frame(&encode1(&message)?).await?;
            debug!("IK stage 1: responder sent reply");
        }
        Ok(())
    }

    /// The underlying session.
    pub fn session(&self) -> &NoiseSession {
        &self.session
    }

    /// The last frame received from the peer, kept for XX-fallback.
    pub fn received_message(&self) -> Option<&[u8]> {
        self.received.as_deref()
    }

    /// The initiator's ephemeral key pair, once message 1 was sent.
    pub fn ephemeral_keypair(&self) -> Option<&KeyPair> {
        self.ephemeral.as_ref()
    }

    /// The peer id this driver checks the remote payload against.
    pub fn expected_peer(&self) -> Option<&PeerId> {
        self.expected_peer.as_ref()
    }

    /// Give up on IK and take the connection back.
    pub fn into_connection(self) -> HandshakeConnection<S> {
        self.conn
    }

    /// Hand the connection and transport keys to a [`SecureSession`].
    pub fn into_secure(self) -> Result<SecureSession<S>> {
        let remote = self
            .remote
            .ok_or(NoiseError::MissingKeyMaterial("remote identity not verified"))?;
        info!(peer = %remote.peer_id, "IK handshake complete");
        SecureSession::new(self.conn, self.session, remote)
    }
}
