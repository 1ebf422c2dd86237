//! Cipher error type.

use thiserror::Error;

/// Failure of a credential encrypt/decrypt operation.
///
/// Any decryption failure means the stored credential is unusable under the
/// presented key: the caller should surface "re-enter credentials" rather
/// than retry.
#[derive(Debug, Error)]
pub enum CipherError {
    /// Ciphertext blob is shorter than nonce + tag.
    #[error("ciphertext too short to contain nonce and tag")]
    Truncated,

    /// Authentication failed: wrong key, rotated key, or corrupted blob.
    #[error("decryption failed: key mismatch or corrupted ciphertext")]
    Unauthenticated,

    /// The underlying AEAD refused to encrypt.
    #[error("encryption failed: {0}")]
    Encrypt(String),
}
