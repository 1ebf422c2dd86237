//! Shared primitives for the BackupSheep storage core.
//!
//! This crate deliberately stays small: id newtypes and the secret-string
//! wrapper used everywhere credential material passes through memory.

pub mod types;

pub use types::{AccountId, SecretString, StorageId};
