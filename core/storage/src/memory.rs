//! In-memory object client and adapter, for tests.
//!
//! Mirrors the shape of a real destination closely enough to exercise the
//! probe choreography: writes return an etag, reads return stored bytes,
//! deletes acknowledge with a 204. Failure injection covers the probe's
//! typed outcomes.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use async_trait::async_trait;

use crate::credential::PlainCredential;
use crate::error::{Result, StorageError};
use crate::provider::{
    DeleteReceipt, ObjectClient, ProviderKind, PutReceipt, StorageAdapter, TokenRefresher,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Fault {
    #[default]
    None,
    WithholdEtag,
    CorruptRead,
    RefuseDelete,
    ConnectionError,
    AuthError,
}

/// In-memory [`ObjectClient`]. Clones share the same object map.
#[derive(Clone, Default)]
pub struct MemoryObjectClient {
    objects: Arc<tokio::sync::Mutex<HashMap<String, Vec<u8>>>>,
    fault: Fault,
}

impl MemoryObjectClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes succeed but report no etag.
    pub fn with_withheld_etag(mut self) -> Self {
        self.fault = Fault::WithholdEtag;
        self
    }

    /// Read-back returns flipped bytes.
    pub fn with_corrupted_read(mut self) -> Self {
        self.fault = Fault::CorruptRead;
        self
    }

    /// Deletes return an unacknowledged receipt.
    pub fn with_refused_delete(mut self) -> Self {
        self.fault = Fault::RefuseDelete;
        self
    }

    /// Every operation fails with a connection error.
    pub fn with_connection_failure(mut self) -> Self {
        self.fault = Fault::ConnectionError;
        self
    }

    /// Every operation fails with an auth error.
    pub fn with_auth_failure(mut self) -> Self {
        self.fault = Fault::AuthError;
        self
    }

    /// Whether an object exists (test assertions).
    pub async fn contains(&self, key: &str) -> bool {
        self.objects.lock().await.contains_key(key)
    }

    /// Stored bytes for a key (test assertions).
    pub async fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().await.get(key).cloned()
    }

    /// Snapshot of every stored object (test assertions).
    pub async fn objects_snapshot(&self) -> HashMap<String, Vec<u8>> {
        self.objects.lock().await.clone()
    }

    fn gate(&self) -> Result<()> {
        match self.fault {
            Fault::ConnectionError => Err(StorageError::Connection(
                "simulated network failure".to_string(),
            )),
            Fault::AuthError => Err(StorageError::Auth(
                "simulated credential rejection".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

fn content_etag(body: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("\"{:016x}\"", hasher.finish())
}

#[async_trait]
impl ObjectClient for MemoryObjectClient {
    async fn put_object(&self, key: &str, body: &[u8]) -> Result<PutReceipt> {
        self.gate()?;
        self.objects
            .lock()
            .await
            .insert(key.to_string(), body.to_vec());

        let etag = match self.fault {
            Fault::WithholdEtag => None,
            _ => Some(content_etag(body)),
        };
        Ok(PutReceipt {
            etag,
            remote_id: None,
        })
    }

    async fn fetch_object(&self, key: &str, _receipt: &PutReceipt) -> Result<Vec<u8>> {
        self.gate()?;
        let mut body = self
            .objects
            .lock()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::Connection(format!("object {} missing", key)))?;

        if self.fault == Fault::CorruptRead {
            for byte in &mut body {
                *byte = !*byte;
            }
        }
        Ok(body)
    }

    async fn delete_object(&self, key: &str, _receipt: &PutReceipt) -> Result<DeleteReceipt> {
        self.gate()?;
        if self.fault == Fault::RefuseDelete {
            return Ok(DeleteReceipt {
                acknowledged: false,
                status: Some(500),
            });
        }

        let removed = self.objects.lock().await.remove(key).is_some();
        Ok(DeleteReceipt {
            acknowledged: removed,
            status: Some(if removed { 204 } else { 404 }),
        })
    }
}

/// Test adapter wrapping a shared [`MemoryObjectClient`].
///
/// Registers under any [`ProviderKind`], so service-level flows can be
/// exercised without touching a real provider.
pub struct MemoryAdapter {
    kind: ProviderKind,
    client: MemoryObjectClient,
    refresher: Option<Box<dyn TokenRefresher>>,
}

impl MemoryAdapter {
    pub fn new(kind: ProviderKind, client: MemoryObjectClient) -> Self {
        Self {
            kind,
            client,
            refresher: None,
        }
    }

    /// Attach a refresh flow (for OAuth scenarios).
    pub fn with_refresher(mut self, refresher: Box<dyn TokenRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }
}

#[async_trait]
impl StorageAdapter for MemoryAdapter {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn endpoint(&self, _credential: &PlainCredential) -> Result<String> {
        Ok("memory.invalid".to_string())
    }

    async fn build_client(&self, _credential: &PlainCredential) -> Result<Box<dyn ObjectClient>> {
        Ok(Box::new(self.client.clone()))
    }

    fn token_refresh(&self) -> Option<&dyn TokenRefresher> {
        self.refresher.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_roundtrip() {
        let client = MemoryObjectClient::new();

        let receipt = client.put_object("k", b"body").await.unwrap();
        assert!(receipt.acknowledged());

        let body = client.fetch_object("k", &receipt).await.unwrap();
        assert_eq!(body, b"body");

        let deletion = client.delete_object("k", &receipt).await.unwrap();
        assert!(deletion.acknowledged);
        assert_eq!(deletion.status, Some(204));
        assert!(!client.contains("k").await);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let client = MemoryObjectClient::new();
        let clone = client.clone();

        client.put_object("shared", b"x").await.unwrap();
        assert!(clone.contains("shared").await);
    }

    #[tokio::test]
    async fn test_delete_of_missing_object_is_unacknowledged() {
        let client = MemoryObjectClient::new();
        let deletion = client
            .delete_object("ghost", &PutReceipt::default())
            .await
            .unwrap();

        assert!(!deletion.acknowledged);
        assert_eq!(deletion.status, Some(404));
    }
}
