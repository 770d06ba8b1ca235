//! XX-fallback after a failed IK attempt

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use super::{verify_remote, NoiseConfig, SecureSession, XxHandshake};
use crate::core::{CryptoError, Result};
use crate::crypto::KeyPair;
use crate::identity::PeerId;
use crate::noise::{decode0, decode1, encode1, xx, MessageBuffer};
use crate::transport::HandshakeConnection;

/// Continues a failed IK attempt as XX without resending bytes already on
/// the wire.
///
/// The initiator replays its IK ephemeral key as XX message 1 and reads the
/// responder's XX message 2 out of the frame that broke IK. The responder
/// reads XX message 1 out of the IK frame it could not process. After
/// [`exchange`](Self::exchange) the two sides are exactly where a plain XX
/// run is after its second message; [`finish`](Self::finish) completes it.
pub struct XxFallbackHandshake<'a, S> {
    xx: XxHandshake<'a, S>,
    initial_msg: Vec<u8>,
    ephemeral: Option<KeyPair>,
}

impl<'a, S> XxFallbackHandshake<'a, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Create a fallback driver.
    ///
    /// `initial_msg` is the raw frame the IK attempt received and could not
    /// process. `ephemeral` is the initiator's IK ephemeral key pair and is
    /// ignored on the responder.
    pub fn new(
        config: &'a NoiseConfig,
        conn: HandshakeConnection<S>,
        initiator: bool,
        expected_peer: Option<PeerId>,
        initial_msg: Vec<u8>,
        ephemeral: Option<KeyPair>,
    ) -> Self {
        Self {
            xx: XxHandshake::new(config, conn, initiator, expected_peer),
            initial_msg,
            ephemeral,
        }
    }

    /// Stage 0: rebuild XX message 1 from what was already exchanged.
    pub async fn propose(&mut self) -> Result<()> {
        let session = &mut self.xx.session;
        if session.is_initiator() {
            let ephemeral = self.ephemeral.take().ok_or(CryptoError::MissingEphemeralKey)?;
            xx::send_message_with_ephemeral(session, &[], Some(ephemeral))?;
            debug!("XX fallback stage 0: initiator state rebuilt from the IK ephemeral key");
        } else {
            debug!("XX fallback stage 0: responder replaying first message");
            let received = decode0(&self.initial_msg)?;
            let message = MessageBuffer {
                ne: received.ne,
                ns: Vec::new(),
                ciphertext: Vec::new(),
            };
            xx::recv_message(session, &message)?;
            debug!("XX fallback stage 0: responder received first message");
        }
        Ok(())
    }

    /// Stage 1: XX message 2.
    ///
    /// The initiator processes the frame it already holds and verifies the
    /// responder's signed payload; the responder writes a fresh message.
    pub async fn exchange(&mut self) -> Result<()> {
        if self.xx.session.is_initiator() {
            debug!("XX fallback stage 1: initiator processing responder's message");
            let message = decode1(&self.initial_msg)?;
            let plaintext = xx::recv_message(&mut self.xx.session, &message)?;
            debug!("XX fallback stage 1: initiator got remote static key, checking signature");
            self.xx.remote = Some(verify_remote(
                &self.xx.session,
                &plaintext,
                self.xx.expected_peer.as_ref(),
                "Error occurred while verifying signed payload",
            )?);
            debug!("XX fallback stage 1: signature verified");
        } else {
            debug!("XX fallback stage 1: responder sending static key and signed payload");
            let payload = self.xx.config.handshake_payload();
            let message = xx::send_message(&mut self.xx.session, &payload)?;
            self.xx.conn.write_frame(&encode1(&message)?).await?;
            debug!("XX fallback stage 1: responder sent second message");
        }
        Ok(())
    }

    /// XX message 3 and transport key derivation.
    pub async fn finish(&mut self) -> Result<()> {
        self.xx.finish().await
    }

    /// The underlying XX driver.
    pub fn xx(&self) -> &XxHandshake<'a, S> {
        &self.xx
    }

    /// Hand the connection and transport keys to a [`SecureSession`].
    pub fn into_secure(self) -> Result<SecureSession<S>> {
        self.xx.into_secure()
    }
}
