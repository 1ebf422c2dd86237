//! Credential cipher for the BackupSheep storage core.
//!
//! Provider secrets (access keys, OAuth tokens, connection strings) are
//! stored only in encrypted form, under a symmetric key scoped to the owning
//! account. This crate provides:
//! - the account key type with automatic zeroization
//! - authenticated encryption using XChaCha20-Poly1305
//!
//! # Security Guarantees
//! - Key material is zeroized on drop and never rendered by `Debug`
//! - Decryption authenticates before returning: a wrong key or tampered
//!   blob yields [`CipherError`], never wrong-but-plausible plaintext

pub mod cipher;
pub mod error;
pub mod keys;

pub use cipher::{decrypt, encrypt};
pub use error::CipherError;
pub use keys::{AccountKey, KEY_LENGTH};
