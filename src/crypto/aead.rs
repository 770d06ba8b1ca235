//! ChaCha20-Poly1305 AEAD
//!
//! Noise's `ChaChaPoly` cipher: the IETF construction with a 12-byte nonce
//! laid out as 4 zero bytes followed by the 64-bit little-endian counter.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Nonce,
};

use crate::core::{CryptoError, AEAD_NONCE_SIZE, AEAD_TAG_SIZE, CIPHER_KEY_SIZE};

/// Construct the 12-byte nonce for a Noise counter.
///
/// Layout:
/// ```text
/// [ zeros (4) | counter (8, LE) ]
/// ```
pub fn construct_nonce(counter: u64) -> [u8; AEAD_NONCE_SIZE] {
    let mut nonce = [0u8; AEAD_NONCE_SIZE];
    nonce[4..].copy_from_slice(&counter.to_le_bytes());
    nonce
}

/// Encrypt plaintext using ChaCha20-Poly1305.
///
/// # Returns
/// Ciphertext with appended 16-byte Poly1305 tag
pub fn encrypt(
    key: &[u8; CIPHER_KEY_SIZE],
    counter: u64,
    ad: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = ChaCha20Poly1305::new(key.into());
    let nonce = construct_nonce(counter);

    cipher
        .encrypt(Nonce::from_slice(&nonce), Payload { msg: plaintext, aad: ad })
        .map_err(|_| CryptoError::EncryptionFailed)
}

/// Decrypt ciphertext using ChaCha20-Poly1305.
///
/// # Returns
/// Decrypted plaintext, or error if authentication fails
pub fn decrypt(
    key: &[u8; CIPHER_KEY_SIZE],
    counter: u64,
    ad: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.len() < AEAD_TAG_SIZE {
        return Err(CryptoError::DecryptionFailed);
    }

    let cipher = ChaCha20Poly1305::new(key.into());
    let nonce = construct_nonce(counter);

    cipher
        .decrypt(Nonce::from_slice(&nonce), Payload { msg: ciphertext, aad: ad })
        .map_err(|_| CryptoError::DecryptionFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nonce_construction() {
        let nonce = construct_nonce(0x0102030405060708);

        assert_eq!(&nonce[..4], &[0u8; 4]);
        assert_eq!(&nonce[4..], &0x0102030405060708u64.to_le_bytes());
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = [0x42; CIPHER_KEY_SIZE];
        let plaintext = b"noise payload";

        let ciphertext = encrypt(&key, 7, b"ad", plaintext).unwrap();
        assert_eq!(ciphertext.len(), plaintext.len() + AEAD_TAG_SIZE);

        let decrypted = decrypt(&key, 7, b"ad", &ciphertext).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_decrypt_wrong_counter_fails() {
        let key = [0x42; CIPHER_KEY_SIZE];
        let ciphertext = encrypt(&key, 1, &[], b"secret").unwrap();

        assert_eq!(decrypt(&key, 0, &[], &ciphertext), Err(CryptoError::DecryptionFailed));
    }

    #[test]
    fn test_decrypt_wrong_ad_fails() {
        let key = [0x42; CIPHER_KEY_SIZE];
        let ciphertext = encrypt(&key, 0, b"transcript-a", b"secret").unwrap();

        assert_eq!(
            decrypt(&key, 0, b"transcript-b", &ciphertext),
            Err(CryptoError::DecryptionFailed)
        );
    }

    #[test]
    fn test_decrypt_short_input_fails() {
        let key = [0x42; CIPHER_KEY_SIZE];
        assert_eq!(decrypt(&key, 0, &[], &[0u8; 15]), Err(CryptoError::DecryptionFailed));
    }

    #[test]
    fn test_empty_plaintext_is_tag_only() {
        let key = [0x80; CIPHER_KEY_SIZE];
        let mut ciphertext = encrypt(&key, 0, &[], b"").unwrap();
        assert_eq!(ciphertext.len(), AEAD_TAG_SIZE);

        ciphertext[0] ^= 0x01;
        assert!(decrypt(&key, 0, &[], &ciphertext).is_err());
    }
}
