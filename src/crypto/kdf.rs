//! SHA-256 hashing and the Noise HKDF.

use hkdf::Hkdf;
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::core::{CryptoError, HASH_SIZE, HKDF_OUTPUT_SIZE};

/// SHA-256 of a single buffer.
pub fn hash(data: &[u8]) -> [u8; HASH_SIZE] {
    Sha256::digest(data).into()
}

/// SHA-256 of `a ‖ b`, the running transcript update.
pub fn hash_concat(a: &[u8], b: &[u8]) -> [u8; HASH_SIZE] {
    let mut hasher = Sha256::new();
    hasher.update(a);
    hasher.update(b);
    hasher.finalize().into()
}

/// Noise HKDF with three outputs.
///
/// ```text
/// prk          = HMAC-SHA256(chaining_key, input_key_material)
/// (k1, k2, k3) = HKDF-Expand(prk, "", 96)
/// ```
pub fn hkdf(
    chaining_key: &[u8; HASH_SIZE],
    input_key_material: &[u8],
) -> Result<([u8; HASH_SIZE], [u8; HASH_SIZE], [u8; HASH_SIZE]), CryptoError> {
    let hk = Hkdf::<Sha256>::new(Some(chaining_key), input_key_material);
    let mut okm = [0u8; HKDF_OUTPUT_SIZE];
    hk.expand(&[], &mut okm)
        .map_err(|_| CryptoError::KeyDerivationFailed)?;

    let mut k1 = [0u8; HASH_SIZE];
    let mut k2 = [0u8; HASH_SIZE];
    let mut k3 = [0u8; HASH_SIZE];
    k1.copy_from_slice(&okm[..32]);
    k2.copy_from_slice(&okm[32..64]);
    k3.copy_from_slice(&okm[64..]);

    okm.zeroize();

    Ok((k1, k2, k3))
}
