//! Storage destination core for BackupSheep.
//!
//! An account registers remote storage destinations (object stores,
//! consumer drives, self-hosted endpoints) and writes backup artifacts into
//! them through one uniform contract. This crate owns:
//! - the provider adapter layer (~25 providers behind one trait)
//! - the credential sum type, encrypted at rest per account
//! - the storage record lifecycle state machine
//! - the validation probe (write/read/verify/delete round trip)
//! - the adapter registry/dispatcher and the service facade
//!
//! # Design Principles
//! - Provider isolation: the probe choreography is written once; adapters
//!   contribute only endpoint resolution and client construction
//! - Typed failures: nothing escapes the probe boundary as a raw transport
//!   error
//! - No ambient configuration: OAuth apps, region tables and timeouts are
//!   injected at construction

pub mod adapters;
pub mod blob;
pub mod config;
pub mod credential;
pub mod error;
pub mod memory;
pub mod oauth;
pub mod probe;
pub mod provider;
pub mod record;
pub mod regions;
pub mod registry;
pub mod rest;
pub mod s3;
pub mod service;
pub mod store;

pub use config::{OAuthApp, OAuthApps, ProbeConfig};
pub use credential::{Credential, PlainCredential, SecretField, StoredCredential};
pub use error::{Result, StorageError};
pub use probe::{run_probe, ProbeReport};
pub use provider::{ObjectClient, ProviderKind, StorageAdapter};
pub use record::{StorageRecord, StorageStatus, UsageStats};
pub use registry::{AdapterContext, AdapterRegistry};
pub use service::{AccountKeyProvider, StaticKeyProvider, StorageService};
pub use store::{CredentialRow, MemoryStore, StorageStore};
