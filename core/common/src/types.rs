//! Id newtypes and secure string handling.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Identifier of an account that owns storage destinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(pub Uuid);

impl AccountId {
    /// Generate a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of a configured storage destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageId(pub Uuid);

impl StorageId {
    /// Generate a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for StorageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StorageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A string holding secret material (API keys, tokens, connection strings).
///
/// The inner value is zeroized on drop and never shows up in `Debug` or
/// `Display` output. Callers get at the plaintext only through
/// [`SecretString::expose`], which keeps accidental logging greppable.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretString(String);

impl SecretString {
    /// Wrap a plaintext secret.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the plaintext.
    ///
    /// # Security
    /// The returned slice must be used immediately and never logged or
    /// persisted outside the credential cipher.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether the secret is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretString([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_string_debug_is_redacted() {
        let secret = SecretString::new("hunter2");
        let rendered = format!("{:?}", secret);

        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("REDACTED"));
    }

    #[test]
    fn test_secret_string_expose() {
        let secret = SecretString::new("api-key-123");
        assert_eq!(secret.expose(), "api-key-123");
        assert!(!secret.is_empty());
        assert!(SecretString::new("").is_empty());
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(AccountId::new(), AccountId::new());
        assert_ne!(StorageId::new(), StorageId::new());
    }

    #[test]
    fn test_secret_string_serde_is_transparent() {
        let secret = SecretString::new("tok");
        let json = serde_json::to_string(&secret).unwrap();
        assert_eq!(json, "\"tok\"");

        let back: SecretString = serde_json::from_str(&json).unwrap();
        assert_eq!(back, secret);
    }
}
