//! Connection upgrade and the established secure session

use std::future::Future;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::timeout;
use tracing::{debug, warn};

use super::{IkHandshake, NoiseConfig, RemoteIdentity, XxFallbackHandshake, XxHandshake};
use crate::core::{NoiseError, Result, HASH_SIZE, MAX_PLAINTEXT_LEN, PUBLIC_KEY_SIZE};
use crate::identity::PeerId;
use crate::noise::{MessageBuffer, NoiseSession};
use crate::transport::HandshakeConnection;

/// Secures raw connections with Noise.
///
/// Without noise pipes every connection runs XX. With noise pipes an
/// outbound connection to a peer whose static key is known tries IK, and
/// every inbound connection first tries to read IK; both fall back to XX
/// when IK cannot be completed.
#[derive(Debug, Clone)]
pub struct NoiseUpgrader {
    config: NoiseConfig,
}

impl NoiseUpgrader {
    /// Create an upgrader.
    pub fn new(config: NoiseConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Local configuration.
    pub fn config(&self) -> &NoiseConfig {
        &self.config
    }

    /// Secure an outbound connection.
    ///
    /// # Arguments
    ///
    /// * `io` - Connected duplex stream
    /// * `remote_peer` - Identity the responder must prove, if known
    /// * `remote_static` - Responder's cached Noise static key, enabling IK
    pub async fn secure_outbound<S>(
        &self,
        io: S,
        remote_peer: Option<PeerId>,
        remote_static: Option<[u8; PUBLIC_KEY_SIZE]>,
    ) -> Result<SecureSession<S>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let conn = HandshakeConnection::new(io);
        let session = match remote_static {
            Some(rs) if self.config.noise_pipes => {
                self.with_timeout(self.initiate_ik(conn, remote_peer, rs)).await?
            }
            _ => {
                self.with_timeout(perform_xx(XxHandshake::new(&self.config, conn, true, remote_peer)))
                    .await?
            }
        };
        Ok(session)
    }

    /// Secure an inbound connection.
    pub async fn secure_inbound<S>(&self, io: S) -> Result<SecureSession<S>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let conn = HandshakeConnection::new(io);
        if self.config.noise_pipes {
            self.with_timeout(self.respond_ik(conn)).await
        } else {
            self.with_timeout(perform_xx(XxHandshake::new(&self.config, conn, false, None)))
                .await
        }
    }

    async fn with_timeout<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        timeout(self.config.handshake_timeout, fut)
            .await
            .map_err(|_| NoiseError::Timeout)?
    }

    async fn initiate_ik<S>(
        &self,
        conn: HandshakeConnection<S>,
        remote_peer: Option<PeerId>,
        rs: [u8; PUBLIC_KEY_SIZE],
    ) -> Result<SecureSession<S>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut ik = IkHandshake::new(&self.config, conn, true, Some(&rs), remote_peer.clone())?;
        match perform_ik(&mut ik).await {
            Ok(()) => ik.into_secure(),
            Err(err) if can_fall_back(&err) => {
                let (Some(initial), Some(ephemeral)) = (
                    ik.received_message().map(<[u8]>::to_vec),
                    ik.ephemeral_keypair().cloned(),
                ) else {
                    return Err(err);
                };
                warn!(error = %err, "IK handshake failed, falling back to XX");
                let conn = ik.into_connection();
                let fallback = XxFallbackHandshake::new(
                    &self.config,
                    conn,
                    true,
                    remote_peer,
                    initial,
                    Some(ephemeral),
                );
                perform_fallback(fallback).await
            }
            Err(err) => Err(err),
        }
    }

    async fn respond_ik<S>(&self, conn: HandshakeConnection<S>) -> Result<SecureSession<S>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut ik = IkHandshake::new(&self.config, conn, false, None, None)?;
        match perform_ik(&mut ik).await {
            Ok(()) => ik.into_secure(),
            Err(err) if can_fall_back(&err) => {
                let Some(initial) = ik.received_message().map(<[u8]>::to_vec) else {
                    return Err(err);
                };
                debug!(error = %err, "inbound IK not possible, continuing as XX");
                let conn = ik.into_connection();
                let fallback =
                    XxFallbackHandshake::new(&self.config, conn, false, None, initial, None);
                perform_fallback(fallback).await
            }
            Err(err) => Err(err),
        }
    }
}

/// Errors caused by the handshake content rather than the connection.
fn can_fall_back(err: &NoiseError) -> bool {
    matches!(err, NoiseError::Crypto(_) | NoiseError::Framing(_))
}

async fn perform_xx<S>(mut xx: XxHandshake<'_, S>) -> Result<SecureSession<S>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    xx.propose().await?;
    xx.exchange().await?;
    xx.finish().await?;
    xx.into_secure()
}

async fn perform_ik<S>(ik: &mut IkHandshake<'_, S>) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    ik.stage0().await?;
    ik.stage1().await
}

async fn perform_fallback<S>(mut fallback: XxFallbackHandshake<'_, S>) -> Result<SecureSession<S>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fallback.propose().await?;
    fallback.exchange().await?;
    fallback.finish().await?;
    fallback.into_secure()
}

/// An established Noise channel.
///
/// Each [`send`](Self::send) is encrypted into exactly one frame and each
/// [`recv`](Self::recv) decrypts exactly one.
pub struct SecureSession<S> {
    conn: HandshakeConnection<S>,
    session: NoiseSession,
    remote: RemoteIdentity,
}

impl<S> SecureSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub(crate) fn new(
        conn: HandshakeConnection<S>,
        session: NoiseSession,
        remote: RemoteIdentity,
    ) -> Result<Self> {
        if !session.is_handshake_complete() {
            return Err(NoiseError::StateSequence {
                counter: session.message_count(),
                reason: "handshake not complete",
            });
        }
        Ok(Self {
            conn,
            session,
            remote,
        })
    }

    /// Encrypt and send one message.
    pub async fn send(&mut self, plaintext: &[u8]) -> Result<()> {
        if plaintext.len() > MAX_PLAINTEXT_LEN {
            return Err(NoiseError::Framing(format!(
                "message of {} bytes exceeds the {MAX_PLAINTEXT_LEN} byte limit",
                plaintext.len()
            )));
        }
        let message = self.session.write_transport(plaintext)?;
        self.conn.write_frame(&message.ciphertext).await
    }

    /// Receive and decrypt one message.
    pub async fn recv(&mut self) -> Result<Vec<u8>> {
        let frame = self.conn.read_frame().await?;
        self.session
            .read_transport(&MessageBuffer::ciphertext_only(frame))
    }

    /// Verified identity of the peer.
    pub fn remote_peer(&self) -> &PeerId {
        &self.remote.peer_id
    }

    /// The peer's Noise static key; cache it to use IK next time.
    pub fn remote_static_key(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.remote.static_key
    }

    /// Early data the peer sent with its handshake.
    pub fn remote_early_data(&self) -> Option<&[u8]> {
        self.remote.early_data.as_deref()
    }

    /// Final transcript hash, identical on both ends.
    pub fn handshake_hash(&self) -> [u8; HASH_SIZE] {
        self.session.handshake_hash().unwrap_or_default()
    }

    /// The Noise session carrying the transport keys.
    pub fn noise_session(&self) -> &NoiseSession {
        &self.session
    }

    /// Drop the encryption layer and return the stream.
    pub fn into_inner(self) -> S {
        self.conn.into_inner()
    }
}

impl<S> std::fmt::Debug for SecureSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureSession")
            .field("remote_peer", &self.remote.peer_id)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IdentityKeypair;
    use std::time::Duration;
    use tokio::io::duplex;

    #[tokio::test]
    async fn test_handshake_times_out() {
        let config = NoiseConfig::new(IdentityKeypair::generate())
            .with_timeout(Duration::from_millis(50));
        let upgrader = NoiseUpgrader::new(config).unwrap();

        // Peer never answers.
        let (a, _b) = duplex(4096);
        let result = upgrader.secure_outbound(a, None, None).await;
        assert!(matches!(result, Err(NoiseError::Timeout)));
    }

    #[tokio::test]
    async fn test_oversized_send_rejected_before_encrypting() {
        let ci = NoiseConfig::new(IdentityKeypair::generate());
        let cr = NoiseConfig::new(IdentityKeypair::generate());
        let (ui, ur) = (NoiseUpgrader::new(ci).unwrap(), NoiseUpgrader::new(cr).unwrap());
        let (a, b) = duplex(1 << 17);

        let (si, sr) = tokio::join!(ui.secure_outbound(a, None, None), ur.secure_inbound(b));
        let (mut si, mut sr) = (si.unwrap(), sr.unwrap());
        let sent_before = si.noise_session().message_count();

        let result = si.send(&vec![0u8; MAX_PLAINTEXT_LEN + 1]).await;
        assert!(matches!(result, Err(NoiseError::Framing(_))));
        assert_eq!(si.noise_session().message_count(), sent_before);

        si.send(&vec![7u8; MAX_PLAINTEXT_LEN]).await.unwrap();
        assert_eq!(sr.recv().await.unwrap().len(), MAX_PLAINTEXT_LEN);
    }
}
