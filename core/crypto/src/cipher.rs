//! Authenticated encryption using XChaCha20-Poly1305.
//!
//! Ciphertext layout is `nonce || encrypted || tag`, with a random 24-byte
//! nonce generated per call. Ciphertext length reveals plaintext length plus
//! the fixed nonce/tag overhead, nothing more.

use chacha20poly1305::{
    aead::{generic_array::GenericArray, Aead, AeadCore, KeyInit, OsRng},
    XChaCha20Poly1305,
};

use crate::error::CipherError;
use crate::keys::AccountKey;

/// Nonce size for XChaCha20-Poly1305 (24 bytes).
pub const NONCE_SIZE: usize = 24;

/// Authentication tag size (16 bytes).
pub const TAG_SIZE: usize = 16;

/// Encrypt a credential secret under an account key.
///
/// # Postconditions
/// - Returns `nonce || ciphertext || tag` with a fresh random nonce
/// - Output length is plaintext length + NONCE_SIZE + TAG_SIZE
///
/// # Errors
/// - [`CipherError::Encrypt`] if the AEAD fails (should not happen for
///   well-formed inputs)
pub fn encrypt(key: &AccountKey, plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
    let cipher = XChaCha20Poly1305::new(GenericArray::from_slice(key.as_bytes()));
    let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| CipherError::Encrypt(e.to_string()))?;

    let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    result.extend_from_slice(&nonce);
    result.extend_from_slice(&ciphertext);

    Ok(result)
}

/// Decrypt a credential secret.
///
/// # Preconditions
/// - `ciphertext` was produced by [`encrypt`] under the same key
///
/// # Errors
/// - [`CipherError::Truncated`] if the blob is too short
/// - [`CipherError::Unauthenticated`] on key mismatch or tampering; the
///   Poly1305 tag is verified before any plaintext is returned
pub fn decrypt(key: &AccountKey, ciphertext: &[u8]) -> Result<Vec<u8>, CipherError> {
    if ciphertext.len() < NONCE_SIZE + TAG_SIZE {
        return Err(CipherError::Truncated);
    }

    let (nonce_bytes, encrypted) = ciphertext.split_at(NONCE_SIZE);
    let nonce = GenericArray::from_slice(nonce_bytes);

    let cipher = XChaCha20Poly1305::new(GenericArray::from_slice(key.as_bytes()));

    cipher
        .decrypt(nonce, encrypted)
        .map_err(|_| CipherError::Unauthenticated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KEY_LENGTH;
    use proptest::prelude::*;

    #[test]
    fn test_roundtrip() {
        let key = AccountKey::from_bytes([42u8; KEY_LENGTH]);
        let plaintext = b"wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY";

        let sealed = encrypt(&key, plaintext).unwrap();
        let opened = decrypt(&key, &sealed).unwrap();

        assert_eq!(opened, plaintext);
    }

    #[test]
    fn test_ciphertext_size() {
        let key = AccountKey::from_bytes([42u8; KEY_LENGTH]);
        let plaintext = b"token";

        let sealed = encrypt(&key, plaintext).unwrap();

        assert_eq!(sealed.len(), NONCE_SIZE + plaintext.len() + TAG_SIZE);
    }

    #[test]
    fn test_nonce_differs_per_call() {
        let key = AccountKey::from_bytes([42u8; KEY_LENGTH]);
        let plaintext = b"same secret";

        let ct1 = encrypt(&key, plaintext).unwrap();
        let ct2 = encrypt(&key, plaintext).unwrap();

        assert_ne!(&ct1[..NONCE_SIZE], &ct2[..NONCE_SIZE]);
        assert_ne!(ct1, ct2);
    }

    #[test]
    fn test_wrong_key_fails() {
        let key1 = AccountKey::from_bytes([1u8; KEY_LENGTH]);
        let key2 = AccountKey::from_bytes([2u8; KEY_LENGTH]);

        let sealed = encrypt(&key1, b"secret data").unwrap();
        let result = decrypt(&key2, &sealed);

        assert!(matches!(result, Err(CipherError::Unauthenticated)));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = AccountKey::from_bytes([42u8; KEY_LENGTH]);

        let mut sealed = encrypt(&key, b"important data").unwrap();
        sealed[NONCE_SIZE + 3] ^= 0xFF;

        assert!(decrypt(&key, &sealed).is_err());
    }

    #[test]
    fn test_truncated_ciphertext_fails() {
        let key = AccountKey::from_bytes([42u8; KEY_LENGTH]);

        let result = decrypt(&key, &[0u8; NONCE_SIZE + TAG_SIZE - 1]);

        assert!(matches!(result, Err(CipherError::Truncated)));
    }

    #[test]
    fn test_empty_plaintext() {
        let key = AccountKey::from_bytes([42u8; KEY_LENGTH]);

        let sealed = encrypt(&key, b"").unwrap();
        let opened = decrypt(&key, &sealed).unwrap();

        assert!(opened.is_empty());
    }

    proptest! {
        #[test]
        fn prop_roundtrip_arbitrary_bytes(plaintext in proptest::collection::vec(any::<u8>(), 0..2048)) {
            let key = AccountKey::generate();

            let sealed = encrypt(&key, &plaintext).unwrap();
            let opened = decrypt(&key, &sealed).unwrap();

            prop_assert_eq!(opened, plaintext);
        }

        #[test]
        fn prop_wrong_key_never_decrypts(plaintext in proptest::collection::vec(any::<u8>(), 1..512)) {
            let key = AccountKey::generate();
            let other = AccountKey::generate();

            let sealed = encrypt(&key, &plaintext).unwrap();

            prop_assert!(decrypt(&other, &sealed).is_err());
        }
    }
}
