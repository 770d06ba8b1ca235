//! Frame I/O over an async stream

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tracing::trace;

use crate::core::{NoiseError, Result, LENGTH_PREFIX_SIZE, MAX_FRAME_LEN};

/// A duplex stream that reads and writes whole length-prefixed frames.
pub struct HandshakeConnection<S> {
    framed: Framed<S, LengthDelimitedCodec>,
}

impl<S> HandshakeConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap `io`.
    pub fn new(io: S) -> Self {
        let codec = LengthDelimitedCodec::builder()
            .length_field_length(LENGTH_PREFIX_SIZE)
            .max_frame_length(MAX_FRAME_LEN)
            .big_endian()
            .new_codec();
        Self {
            framed: Framed::new(io, codec),
        }
    }

    /// Write one frame and flush it.
    pub async fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        if frame.len() > MAX_FRAME_LEN {
            return Err(NoiseError::Framing(format!(
                "frame of {} bytes exceeds the {MAX_FRAME_LEN} byte limit",
                frame.len()
            )));
        }
        trace!(len = frame.len(), "writing frame");
        self.framed.send(Bytes::copy_from_slice(frame)).await?;
        Ok(())
    }

    /// Read one frame.
    ///
    /// A clean end of stream is reported as [`NoiseError::ConnectionClosed`].
    pub async fn read_frame(&mut self) -> Result<Vec<u8>> {
        let frame = self
            .framed
            .next()
            .await
            .ok_or(NoiseError::ConnectionClosed)??;
        trace!(len = frame.len(), "read frame");
        Ok(frame.to_vec())
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &S {
        self.framed.get_ref()
    }

    /// Return the underlying stream. Buffered, unread bytes are dropped.
    pub fn into_inner(self) -> S {
        self.framed.into_inner()
    }
}

impl<S> std::fmt::Debug for HandshakeConnection<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandshakeConnection").finish_non_exhaustive()
    }
}
