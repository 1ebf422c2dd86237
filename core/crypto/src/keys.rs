//! Account-scoped encryption key with secure memory handling.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length of account keys in bytes (256-bit).
pub const KEY_LENGTH: usize = 32;

/// Symmetric key under which one account's credential secrets are sealed.
///
/// The key itself is derived and handed over by an external collaborator
/// (one key per account); this core only consumes it. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct AccountKey {
    key: [u8; KEY_LENGTH],
}

impl AccountKey {
    /// Create a key from raw bytes.
    pub fn from_bytes(key: [u8; KEY_LENGTH]) -> Self {
        Self { key }
    }

    /// Get the key bytes.
    ///
    /// # Security
    /// The returned slice should be used immediately and not stored.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.key
    }

    /// Generate a random key.
    pub fn generate() -> Self {
        use rand::RngCore;
        let mut key = [0u8; KEY_LENGTH];
        rand::thread_rng().fill_bytes(&mut key);
        Self { key }
    }
}

impl PartialEq for AccountKey {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for AccountKey {}

impl fmt::Debug for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountKey([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_random() {
        let key1 = AccountKey::generate();
        let key2 = AccountKey::generate();

        assert_ne!(key1, key2);
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = AccountKey::from_bytes([7u8; KEY_LENGTH]);
        let rendered = format!("{:?}", key);

        assert!(rendered.contains("REDACTED"));
        assert!(!rendered.contains('7'));
    }
}
