//! Noise Protocol Framework handshake core.
//!
//! - [`CipherState`], [`SymmetricState`], [`HandshakeState`]: the Noise
//!   state objects
//! - [`MessageBuffer`] and its wire framing
//! - [`NoiseSession`]: per-connection bookkeeping, handshaking then transport
//! - [`xx`] and [`ik`]: concrete message schedules built from the shared
//!   primitives

mod cipher_state;
mod handshake_state;
mod message;
mod primitives;
mod session;
mod symmetric;

pub mod ik;
pub mod xx;

pub use cipher_state::CipherState;
pub use handshake_state::HandshakeState;
pub use message::{decode0, decode1, decode2, encode0, encode1, encode2, MessageBuffer};
pub use primitives::{create_empty_key, read_message_regular, write_message_regular};
pub use session::{NoiseSession, Pattern, TransportState};
pub use symmetric::SymmetricState;
