//! Error taxonomy for the storage destination core.
//!
//! Every adapter failure is converted into one of these typed outcomes at
//! the probe boundary; raw transport errors never cross it. The variants
//! deliberately distinguish "credentials wrong" from "provider outage" from
//! "cleanup failed" so callers can route each to the right user message.

use backupsheep_crypto::CipherError;
use thiserror::Error;

use crate::provider::ProviderKind;
use crate::record::StorageStatus;

/// Result alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Failures surfaced by the storage destination core.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Credential cipher failure: the stored secret cannot be decrypted
    /// under the account's current key. Fatal for the credential; the user
    /// must re-enter it.
    #[error("credential unusable: {0}")]
    Cipher(#[from] CipherError),

    /// Network-level failure reaching the provider. Retryable by the
    /// calling scheduler, never retried here.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The provider rejected the presented credentials.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// OAuth refresh token is invalid or revoked. Terminal: the user must
    /// re-authorize; no automatic retry is permitted.
    #[error("refresh token rejected, re-authorization required: {0}")]
    TokenExpired(String),

    /// The write completed without a content digest acknowledgment.
    #[error("destination did not acknowledge test upload: {0}")]
    WriteVerifyFailed(String),

    /// Read-back content did not match what was written.
    #[error("uploaded test file could not be verified: {0}")]
    ReadVerifyFailed(String),

    /// The provider did not acknowledge deletion of the test object. The
    /// destination may now contain a stray object; reported as a failure,
    /// never as a partial success.
    #[error("test file cleanup failed: {0}")]
    CleanupFailed(String),

    /// Unexpected failure anywhere in the probe round trip, with the
    /// underlying cause attached.
    #[error("probe could not complete: {message}")]
    ProbeConnectionFailed {
        message: String,
        #[source]
        source: Option<Box<StorageError>>,
    },

    /// Data integrity invariant violation: the record has no credential
    /// bound, or the bound credential is for a different provider. This is
    /// a bug, not a normal error path.
    #[error("no usable credential bound to storage record: {0}")]
    NoCredentialBound(String),

    /// Rejected lifecycle transition.
    #[error("invalid status transition {from:?} -> {to:?}")]
    InvalidTransition {
        from: StorageStatus,
        to: StorageStatus,
    },

    /// The requested adapter operation is not supported by this provider.
    #[error("{kind} does not support {operation}")]
    Unsupported {
        kind: ProviderKind,
        operation: &'static str,
    },

    /// Record or credential not found in the store.
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed caller input (bad connection string, missing region, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Persistence collaborator failure.
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl StorageError {
    /// Wrap an adapter error as a probe connection failure, keeping the
    /// typed cause attached for diagnostics.
    pub fn probe_failure(message: impl Into<String>, source: StorageError) -> Self {
        Self::ProbeConnectionFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Probe failure with no inner cause (e.g. a timeout).
    pub fn probe_timeout(message: impl Into<String>) -> Self {
        Self::ProbeConnectionFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Whether this failure is terminal and must not be retried
    /// automatically (requires user intervention).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::TokenExpired(_) | Self::Cipher(_))
    }
}
