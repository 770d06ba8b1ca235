//! Length-prefixed framing over an async duplex stream.
//!
//! Every Noise handshake and transport message travels as one frame:
//!
//! ```text
//! +----------------+---------------------------+
//! | length (u16BE) | message (0..=65535 bytes) |
//! +----------------+---------------------------+
//! ```

mod framed;

pub use framed::HandshakeConnection;
