//! Core constants and error types.
//!
//! Shared by every other module and free of cryptographic dependencies.

mod constants;
mod error;

pub use constants::*;
pub use error::*;
