//! XX over a connection

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

use super::{verify_remote, NoiseConfig, RemoteIdentity, SecureSession};
use crate::core::{NoiseError, Result};
use crate::identity::PeerId;
use crate::noise::{decode0, decode1, decode2, encode0, encode1, encode2, xx, NoiseSession};
use crate::transport::HandshakeConnection;

/// Drives an XX handshake over a connection.
///
/// Call [`propose`](Self::propose), [`exchange`](Self::exchange) and
/// [`finish`](Self::finish) in order on both sides, then
/// [`into_secure`](Self::into_secure).
pub struct XxHandshake<'a, S> {
    pub(crate) config: &'a NoiseConfig,
    pub(crate) conn: HandshakeConnection<S>,
    pub(crate) session: NoiseSession,
    pub(crate) expected_peer: Option<PeerId>,
    pub(crate) remote: Option<RemoteIdentity>,
}

impl<'a, S> XxHandshake<'a, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Create a driver.
    ///
    /// `expected_peer` is checked against the identity in the peer's
    /// payload; `None` accepts any identity.
    pub fn new(
        config: &'a NoiseConfig,
        conn: HandshakeConnection<S>,
        initiator: bool,
        expected_peer: Option<PeerId>,
    ) -> Self {
        let session = xx::init_session(
            initiator,
            &config.prologue,
            config.static_keypair.clone(),
        );
        Self {
            config,
            conn,
            session,
            expected_peer,
            remote: None,
        }
    }

    /// Message 1: the initiator sends its ephemeral key.
    pub async fn propose(&mut self) -> Result<()> {
        if self.session.is_initiator() {
            let message = xx::send_message(&mut self.session, &[])?;
            self.conn.write_frame(&encode0(&message)).await?;
            debug!("XX stage 0: initiator sent first message");
        } else {
            debug!("XX stage 0: responder waiting for first message");
            let frame = self.conn.read_frame().await?;
            xx::recv_message(&mut self.session, &decode0(&frame)?)?;
            debug!("XX stage 0: responder received first message");
        }
        Ok(())
    }

    /// Message 2: the responder sends its static key and signed payload.
    pub async fn exchange(&mut self) -> Result<()> {
        if self.session.is_initiator() {
            debug!("XX stage 1: initiator waiting for responder's static key");
            let frame = self.conn.read_frame().await?;
            let plaintext = xx::recv_message(&mut self.session, &decode1(&frame)?)?;
            self.remote = Some(verify_remote(
                &self.session,
                &plaintext,
                self.expected_peer.as_ref(),
                "Error occurred while verifying responder's signed payload",
            )?);
            debug!("XX stage 1: responder's signature verified");
        } else {
            let payload = self.config.handshake_payload();
            let message = xx::send_message(&mut self.session, &payload)?;
            self.conn.write_frame(&encode1(&message)?).await?;
            debug!("XX stage 1: responder sent static key and signed payload");
        }
        Ok(())
    }

    /// Message 3: the initiator sends its static key and signed payload;
    /// both sides derive transport keys.
    pub async fn finish(&mut self) -> Result<()> {
        if self.session.is_initiator() {
            let payload = self.config.handshake_payload();
            let message = xx::send_message(&mut self.session, &payload)?;
            self.conn.write_frame(&encode2(&message)?).await?;
            debug!("XX stage 2: initiator sent static key and signed payload");
        } else {
            debug!("XX stage 2: responder waiting for initiator's static key");
            let frame = self.conn.read_frame().await?;
            let plaintext = xx::recv_message(&mut self.session, &decode2(&frame)?)?;
            self.remote = Some(verify_remote(
                &self.session,
                &plaintext,
                self.expected_peer.as_ref(),
                "Error occurred while verifying initiator's signed payload",
            )?);
            debug!("XX stage 2: initiator's signature verified");
        }
        Ok(())
    }

    /// The underlying session.
    pub fn session(&self) -> &NoiseSession {
        &self.session
    }

    /// Hand the connection and transport keys to a [`SecureSession`].
    pub fn into_secure(self) -> Result<SecureSession<S>> {
        let remote = self
            .remote
            .ok_or(NoiseError::MissingKeyMaterial("remote identity not verified"))?;
        info!(peer = %remote.peer_id, "XX handshake complete");
        SecureSession::new(self.conn, self.session, remote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IdentityKeypair;
    use tokio::io::duplex;

    fn config() -> NoiseConfig {
        NoiseConfig::new(IdentityKeypair::generate()).with_prologue(b"xx-driver".to_vec())
    }

    async fn run(
        hs: &mut XxHandshake<'_, tokio::io::DuplexStream>,
    ) -> Result<()> {
        hs.propose().await?;
        hs.exchange().await?;
        hs.finish().await
    }

    #[tokio::test]
    async fn test_xx_driver_completes() {
        let (a, b) = duplex(4096);
        let (ci, cr) = (config(), config());

        let mut init = XxHandshake::new(&ci, HandshakeConnection::new(a), true, Some(cr.local_peer_id()));
        let mut resp = XxHandshake::new(&cr, HandshakeConnection::new(b), false, None);

        let (ri, rr) = tokio::join!(run(&mut init), run(&mut resp));
        ri.unwrap();
        rr.unwrap();

        assert_eq!(init.session().handshake_hash(), resp.session().handshake_hash());

        let mut si = init.into_secure().unwrap();
        let mut sr = resp.into_secure().unwrap();
        assert_eq!(si.remote_peer(), &cr.local_peer_id());
        assert_eq!(sr.remote_peer(), &ci.local_peer_id());
        assert_eq!(si.remote_static_key(), &cr.static_public_key());

        si.send(b"ping").await.unwrap();
        assert_eq!(sr.recv().await.unwrap(), b"ping");
    }

    #[tokio::test]
    async fn test_xx_driver_rejects_unexpected_peer() {
        let (a, b) = duplex(4096);
        let (ci, cr) = (config(), config());
        let stranger = IdentityKeypair::generate().peer_id();

        let mut init = XxHandshake::new(&ci, HandshakeConnection::new(a), true, Some(stranger));
        let mut resp = XxHandshake::new(&cr, HandshakeConnection::new(b), false, None);

        let (ri, _) = tokio::join!(
            async {
                init.propose().await?;
                init.exchange().await
            },
            async {
                resp.propose().await?;
                resp.exchange().await
            }
        );
        match ri {
            Err(NoiseError::Identity { source, .. }) => {
                assert_eq!(source, crate::core::IdentityError::PeerIdMismatch)
            }
            other => panic!("expected identity error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_into_secure_before_finish_fails() {
        let (a, _b) = duplex(4096);
        let ci = config();
        let init = XxHandshake::new(&ci, HandshakeConnection::new(a), true, None);
        assert!(init.into_secure().is_err());
    }
}
