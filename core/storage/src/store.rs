//! Persistence seam for records and credentials.
//!
//! The relational mechanics live outside this core; what it requires of a
//! store is narrow: record + credential are created atomically, and a token
//! refresh updates access token, refresh token and expiry together or not
//! at all. [`MemoryStore`] satisfies the contract for tests and embedding.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use backupsheep_common::{AccountId, StorageId};

use crate::credential::{SecretField, StoredCredential};
use crate::error::{Result, StorageError};
use crate::record::StorageRecord;

/// A stored credential plus its encryption bookkeeping.
#[derive(Debug, Clone)]
pub struct CredentialRow {
    pub credential: StoredCredential,
    /// False while the credential is still sealed under a rotated key and
    /// awaiting migration.
    pub encryption_updated: bool,
}

impl CredentialRow {
    pub fn new(credential: StoredCredential) -> Self {
        Self {
            credential,
            encryption_updated: true,
        }
    }
}

/// Store contract consumed by the service layer.
#[async_trait]
pub trait StorageStore: Send + Sync {
    /// Persist a new record and its credential atomically: neither write
    /// may succeed without the other.
    async fn insert(&self, record: &StorageRecord, credential: CredentialRow) -> Result<()>;

    /// Fetch a record.
    async fn record(&self, id: StorageId) -> Result<StorageRecord>;

    /// Fetch the credential bound to a record, if any.
    async fn credential(&self, id: StorageId) -> Result<Option<CredentialRow>>;

    /// All records owned by an account.
    async fn records_for_account(&self, account: AccountId) -> Result<Vec<StorageRecord>>;

    /// Persist record mutations (status, usage, name).
    async fn update_record(&self, record: &StorageRecord) -> Result<()>;

    /// Atomically swap in a refreshed token pair: all three fields update
    /// together.
    async fn update_token_pair(
        &self,
        id: StorageId,
        access: SecretField,
        refresh: SecretField,
        expires_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Replace a credential wholesale (re-encryption migration).
    async fn replace_credential(&self, id: StorageId, row: CredentialRow) -> Result<()>;
}

#[derive(Debug, Clone)]
struct Entry {
    record: StorageRecord,
    credential: Option<CredentialRow>,
}

/// In-memory [`StorageStore`].
#[derive(Default)]
pub struct MemoryStore {
    entries: tokio::sync::RwLock<HashMap<StorageId, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageStore for MemoryStore {
    async fn insert(&self, record: &StorageRecord, credential: CredentialRow) -> Result<()> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(&record.id) {
            return Err(StorageError::Persistence(format!(
                "record {} already exists",
                record.id
            )));
        }
        entries.insert(
            record.id,
            Entry {
                record: record.clone(),
                credential: Some(credential),
            },
        );
        Ok(())
    }

    async fn record(&self, id: StorageId) -> Result<StorageRecord> {
        self.entries
            .read()
            .await
            .get(&id)
            .map(|e| e.record.clone())
            .ok_or_else(|| StorageError::NotFound(format!("storage record {}", id)))
    }

    async fn credential(&self, id: StorageId) -> Result<Option<CredentialRow>> {
        let entries = self.entries.read().await;
        let entry = entries
            .get(&id)
            .ok_or_else(|| StorageError::NotFound(format!("storage record {}", id)))?;
        Ok(entry.credential.clone())
    }

    async fn records_for_account(&self, account: AccountId) -> Result<Vec<StorageRecord>> {
        Ok(self
            .entries
            .read()
            .await
            .values()
            .filter(|e| e.record.account_id == account)
            .map(|e| e.record.clone())
            .collect())
    }

    async fn update_record(&self, record: &StorageRecord) -> Result<()> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(&record.id)
            .ok_or_else(|| StorageError::NotFound(format!("storage record {}", record.id)))?;
        entry.record = record.clone();
        Ok(())
    }

    async fn update_token_pair(
        &self,
        id: StorageId,
        access: SecretField,
        refresh: SecretField,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(&id)
            .ok_or_else(|| StorageError::NotFound(format!("storage record {}", id)))?;
        let row = entry
            .credential
            .as_mut()
            .ok_or_else(|| StorageError::NoCredentialBound(format!("record {}", id)))?;
        row.credential.set_token_pair(access, refresh, expires_at)
    }

    async fn replace_credential(&self, id: StorageId, row: CredentialRow) -> Result<()> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(&id)
            .ok_or_else(|| StorageError::NotFound(format!("storage record {}", id)))?;
        entry.credential = Some(row);
        Ok(())
    }
}
