//! Handshake configuration.

use std::time::Duration;

use crate::core::{
    NoiseError, Result, AEAD_TAG_SIZE, DEFAULT_HANDSHAKE_TIMEOUT, ENCRYPTED_STATIC_KEY_SIZE,
    LENGTH_PREFIX_SIZE, MAX_FRAME_LEN, PUBLIC_KEY_SIZE,
};
use crate::crypto::KeyPair;
use crate::identity::{create_handshake_payload, IdentityKeypair, PeerId};

/// Local keys and options for Noise handshakes.
#[derive(Clone)]
pub struct NoiseConfig {
    /// Noise static key pair.
    pub static_keypair: KeyPair,

    /// Identity that signs the static key.
    pub identity: IdentityKeypair,

    /// Bytes mixed into the transcript before the first message. Both
    /// peers must agree on them.
    pub prologue: Vec<u8>,

    /// Application data signed and carried in our handshake payload.
    pub early_data: Option<Vec<u8>>,

    /// Try IK (with XX-fallback) when the remote static key is known.
    pub noise_pipes: bool,

    /// Upper bound on a whole handshake.
    pub handshake_timeout: Duration,
}

impl NoiseConfig {
    /// Configuration with a fresh static key and default options.
    pub fn new(identity: IdentityKeypair) -> Self {
        Self {
            static_keypair: KeyPair::generate(),
            identity,
            prologue: Vec::new(),
            early_data: None,
            noise_pipes: false,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }

    /// Start a builder.
    pub fn builder() -> NoiseConfigBuilder {
        NoiseConfigBuilder::new()
    }

    /// Set the prologue.
    pub fn with_prologue(mut self, prologue: impl Into<Vec<u8>>) -> Self {
        self.prologue = prologue.into();
        self
    }

    /// Enable IK with XX-fallback.
    pub fn with_noise_pipes(mut self) -> Self {
        self.noise_pipes = true;
        self
    }

    /// Set the handshake timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Our peer id.
    pub fn local_peer_id(&self) -> PeerId {
        self.identity.peer_id()
    }

    /// Our static public key, which peers cache to later run IK.
    pub fn static_public_key(&self) -> [u8; PUBLIC_KEY_SIZE] {
        *self.static_keypair.public_key()
    }

    /// Signed payload for our handshake messages.
    pub(crate) fn handshake_payload(&self) -> Vec<u8> {
        create_handshake_payload(
            &self.identity,
            self.static_keypair.public_key(),
            self.early_data.as_deref(),
        )
    }

    /// Check the options are usable.
    pub fn validate(&self) -> Result<()> {
        if self.handshake_timeout.is_zero() {
            return Err(NoiseError::Config("handshake timeout must be non-zero".into()));
        }
        // ne ‖ len ‖ encrypted s ‖ encrypted payload tag
        let overhead = PUBLIC_KEY_SIZE + LENGTH_PREFIX_SIZE + ENCRYPTED_STATIC_KEY_SIZE + AEAD_TAG_SIZE;
        let payload_len = self.handshake_payload().len();
        if payload_len + overhead > MAX_FRAME_LEN {
            return Err(NoiseError::Config(format!(
                "handshake payload of {payload_len} bytes does not fit in a frame"
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for NoiseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoiseConfig")
            .field("peer_id", &self.local_peer_id())
            .field("static_public_key", &hex::encode(self.static_public_key()))
            .field("prologue_len", &self.prologue.len())
            .field("early_data", &self.early_data.is_some())
            .field("noise_pipes", &self.noise_pipes)
            .field("handshake_timeout", &self.handshake_timeout)
            .finish()
    }
}

/// Builder for [`NoiseConfig`].
#[derive(Default)]
pub struct NoiseConfigBuilder {
    static_keypair: Option<KeyPair>,
    identity: Option<IdentityKeypair>,
    prologue: Vec<u8>,
    early_data: Option<Vec<u8>>,
    noise_pipes: bool,
    handshake_timeout: Option<Duration>,
}

impl NoiseConfigBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an existing static key pair instead of generating one.
    pub fn static_keypair(mut self, keypair: KeyPair) -> Self {
        self.static_keypair = Some(keypair);
        self
    }

    /// Set the identity. Required.
    pub fn identity(mut self, identity: IdentityKeypair) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Set the prologue.
    pub fn prologue(mut self, prologue: impl Into<Vec<u8>>) -> Self {
        self.prologue = prologue.into();
        self
    }

    /// Carry `data` in our handshake payload.
    pub fn early_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.early_data = Some(data.into());
        self
    }

    /// Enable IK with XX-fallback.
    pub fn noise_pipes(mut self, enabled: bool) -> Self {
        self.noise_pipes = enabled;
        self
    }

    /// Set the handshake timeout.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = Some(timeout);
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<NoiseConfig> {
        let identity = self
            .identity
            .ok_or_else(|| NoiseError::Config("identity is required".into()))?;

        let config = NoiseConfig {
            static_keypair: self.static_keypair.unwrap_or_else(KeyPair::generate),
            identity,
            prologue: self.prologue,
            early_data: self.early_data.filter(|d| !d.is_empty()),
            noise_pipes: self.noise_pipes,
            handshake_timeout: self.handshake_timeout.unwrap_or(DEFAULT_HANDSHAKE_TIMEOUT),
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = NoiseConfig::builder()
            .identity(IdentityKeypair::generate())
            .build()
            .unwrap();

        assert!(config.prologue.is_empty());
        assert!(config.early_data.is_none());
        assert!(!config.noise_pipes);
        assert_eq!(config.handshake_timeout, DEFAULT_HANDSHAKE_TIMEOUT);
    }

    #[test]
    fn test_builder_requires_identity() {
        assert!(matches!(NoiseConfig::builder().build(), Err(NoiseError::Config(_))));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = NoiseConfig::builder()
            .identity(IdentityKeypair::generate())
            .handshake_timeout(Duration::ZERO)
            .build();
        assert!(matches!(result, Err(NoiseError::Config(_))));
    }

    #[test]
    fn test_oversized_early_data_rejected() {
        let result = NoiseConfig::builder()
            .identity(IdentityKeypair::generate())
            .early_data(vec![0u8; MAX_FRAME_LEN])
            .build();
        assert!(matches!(result, Err(NoiseError::Config(_))));
    }

    #[test]
    fn test_keeps_supplied_static_key() {
        let keypair = KeyPair::generate();
        let public = *keypair.public_key();
        let config = NoiseConfig::builder()
            .identity(IdentityKeypair::generate())
            .static_keypair(keypair)
            .build()
            .unwrap();
        assert_eq!(config.static_public_key(), public);
    }
}
