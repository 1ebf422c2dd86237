//! Account-facing facade over records, credentials, adapters and the probe.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use backupsheep_common::{AccountId, StorageId};
use backupsheep_crypto::AccountKey;

use crate::config::ProbeConfig;
use crate::credential::{PlainCredential, SecretField};
use crate::error::{Result, StorageError};
use crate::oauth;
use crate::probe::{run_probe, ProbeReport};
use crate::provider::StorageAdapter;
use crate::record::{StorageRecord, StorageStatus, UsageStats};
use crate::registry::AdapterRegistry;
use crate::store::{CredentialRow, StorageStore};

/// Supplies the per-account credential encryption key.
pub trait AccountKeyProvider: Send + Sync {
    fn encryption_key(&self, account: AccountId) -> Result<AccountKey>;
}

/// Fixed key map, for tests and single-tenant embedding.
#[derive(Default)]
pub struct StaticKeyProvider {
    keys: Mutex<HashMap<AccountId, AccountKey>>,
}

impl StaticKeyProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, account: AccountId, key: AccountKey) {
        self.keys.lock().expect("key map poisoned").insert(account, key);
    }
}

impl AccountKeyProvider for StaticKeyProvider {
    fn encryption_key(&self, account: AccountId) -> Result<AccountKey> {
        self.keys
            .lock()
            .expect("key map poisoned")
            .get(&account)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("encryption key for account {}", account)))
    }
}

/// The storage destination core, wired together.
pub struct StorageService {
    store: Arc<dyn StorageStore>,
    keys: Arc<dyn AccountKeyProvider>,
    registry: AdapterRegistry,
    probe_config: ProbeConfig,
    /// Per-record refresh serialization. Guards the read-check-refresh-
    /// persist sequence so concurrent refreshes cannot interleave partial
    /// token writes.
    refresh_locks: Mutex<HashMap<StorageId, Arc<tokio::sync::Mutex<()>>>>,
}

impl StorageService {
    pub fn new(
        store: Arc<dyn StorageStore>,
        keys: Arc<dyn AccountKeyProvider>,
        registry: AdapterRegistry,
        probe_config: ProbeConfig,
    ) -> Self {
        Self {
            store,
            keys,
            registry,
            probe_config,
            refresh_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Create a destination: persist it PENDING with its sealed credential
    /// (atomically), run the probe, and activate on success.
    ///
    /// On probe failure the record stays PENDING in the store and the
    /// failure is returned; no plaintext secret is ever persisted either
    /// way.
    pub async fn create_storage_record(
        &self,
        account: AccountId,
        name: &str,
        credential: PlainCredential,
    ) -> Result<StorageRecord> {
        let kind = credential.kind();
        let key = self.keys.encryption_key(account)?;
        let sealed = credential.seal(&key)?;

        let mut record = StorageRecord::new(account, kind, name);
        self.store
            .insert(&record, CredentialRow::new(sealed))
            .await?;

        tracing::info!(storage = %record.id, provider = %kind, "created storage record, probing");

        self.validate(record.id).await?;

        record.activate()?;
        self.store.update_record(&record).await?;

        tracing::info!(storage = %record.id, provider = %kind, "storage record active");
        Ok(record)
    }

    /// Re-run the validation round trip on demand (creation, periodic
    /// health checks). Does not change record status.
    pub async fn validate(&self, id: StorageId) -> Result<ProbeReport> {
        let record = self.store.record(id).await?;
        let row = self.store.credential(id).await?;
        let (adapter, stored) = self.registry.resolve(&record, row.as_ref().map(|r| &r.credential))?;

        let key = self.keys.encryption_key(record.account_id)?;
        let plain = stored.open(&key)?;
        let plain = self.ensure_fresh_tokens(&record, &adapter, plain, &key).await?;

        let client = adapter.build_client(&plain).await?;
        run_probe(
            client.as_ref(),
            plain.prefix(),
            plain.no_delete(),
            &self.probe_config,
        )
        .await
    }

    /// ACTIVE -> PAUSED.
    pub async fn pause(&self, id: StorageId) -> Result<StorageRecord> {
        let mut record = self.store.record(id).await?;
        record.pause()?;
        self.store.update_record(&record).await?;
        Ok(record)
    }

    /// PAUSED -> ACTIVE.
    pub async fn resume(&self, id: StorageId) -> Result<StorageRecord> {
        let mut record = self.store.record(id).await?;
        record.resume()?;
        self.store.update_record(&record).await?;
        Ok(record)
    }

    /// Mark for deletion; reaping happens outside this core.
    pub async fn request_delete(&self, id: StorageId) -> Result<StorageRecord> {
        let mut record = self.store.record(id).await?;
        record.request_delete();
        self.store.update_record(&record).await?;
        Ok(record)
    }

    /// External (billing/abuse) status transition; not validated beyond
    /// the DELETE_REQUESTED terminality rule.
    pub async fn set_status_external(
        &self,
        id: StorageId,
        status: StorageStatus,
    ) -> Result<StorageRecord> {
        let mut record = self.store.record(id).await?;
        record.set_status_external(status)?;
        self.store.update_record(&record).await?;
        Ok(record)
    }

    /// Replace usage counters after background recomputation.
    pub async fn set_usage(&self, id: StorageId, usage: UsageStats) -> Result<StorageRecord> {
        let mut record = self.store.record(id).await?;
        record.set_usage(usage);
        self.store.update_record(&record).await?;
        Ok(record)
    }

    /// Fetch a record.
    pub async fn record(&self, id: StorageId) -> Result<StorageRecord> {
        self.store.record(id).await
    }

    /// Decrypt the credential for use by backup writers.
    ///
    /// The result exists only in memory on the caller's side; it must never
    /// be logged or persisted. OAuth tokens are refreshed first if expired,
    /// so the returned credential is immediately usable.
    pub async fn get_decrypted_credential(&self, id: StorageId) -> Result<PlainCredential> {
        let record = self.store.record(id).await?;
        let row = self.store.credential(id).await?;
        let (adapter, stored) = self.registry.resolve(&record, row.as_ref().map(|r| &r.credential))?;

        let key = self.keys.encryption_key(record.account_id)?;
        let plain = stored.open(&key)?;
        self.ensure_fresh_tokens(&record, &adapter, plain, &key).await
    }

    /// Re-encrypt an account's credentials from a rotated key to the
    /// current one. Returns how many credentials were migrated.
    pub async fn reseal_credentials(&self, account: AccountId, old_key: &AccountKey) -> Result<u32> {
        let current_key = self.keys.encryption_key(account)?;
        let mut migrated = 0;

        for record in self.store.records_for_account(account).await? {
            let Some(row) = self.store.credential(record.id).await? else {
                continue;
            };
            if row.encryption_updated {
                continue;
            }

            let resealed = row.credential.reseal(old_key, &current_key)?;
            self.store
                .replace_credential(
                    record.id,
                    CredentialRow {
                        credential: resealed,
                        encryption_updated: true,
                    },
                )
                .await?;
            migrated += 1;
            tracing::info!(storage = %record.id, "credential re-encrypted under current key");
        }

        Ok(migrated)
    }

    fn refresh_lock(&self, id: StorageId) -> Arc<tokio::sync::Mutex<()>> {
        self.refresh_locks
            .lock()
            .expect("refresh lock map poisoned")
            .entry(id)
            .or_default()
            .clone()
    }

    /// Transparently refresh an expired OAuth access token, persisting the
    /// new pair atomically. Serialized per record; the expiry is checked
    /// again under the lock so concurrent callers don't refresh twice.
    async fn ensure_fresh_tokens(
        &self,
        record: &StorageRecord,
        adapter: &Arc<dyn StorageAdapter>,
        plain: PlainCredential,
        key: &AccountKey,
    ) -> Result<PlainCredential> {
        let needs_refresh = plain
            .token_view()
            .is_some_and(|view| oauth::needs_refresh(view.expires_at));
        if !needs_refresh {
            return Ok(plain);
        }

        let refresher = adapter
            .token_refresh()
            .ok_or(StorageError::Unsupported {
                kind: record.kind,
                operation: "token refresh",
            })?;

        let lock = self.refresh_lock(record.id);
        let _guard = lock.lock().await;

        // Re-read under the lock: another caller may have refreshed while
        // we waited.
        let row = self
            .store
            .credential(record.id)
            .await?
            .ok_or_else(|| StorageError::NoCredentialBound(format!("record {}", record.id)))?;
        let mut plain = row.credential.open(key)?;
        let Some(view) = plain.token_view() else {
            return Ok(plain);
        };
        if !oauth::needs_refresh(view.expires_at) {
            return Ok(plain);
        }

        tracing::info!(storage = %record.id, provider = %record.kind, "refreshing expired access token");

        // A rejected refresh token surfaces as the terminal TokenExpired;
        // it is not retried here.
        let pair = refresher.refresh(view.refresh_token).await?;

        let access = SecretField::seal(&pair.access_token, key)?;
        let refresh = SecretField::seal(&pair.refresh_token, key)?;
        self.store
            .update_token_pair(record.id, access, refresh, pair.expires_at)
            .await?;

        plain.apply_token_pair(pair.access_token, pair.refresh_token, pair.expires_at)?;
        Ok(plain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::{Credential, OAuthCredential, S3KeyCredential};
    use crate::memory::{MemoryAdapter, MemoryObjectClient};
    use crate::oauth::TokenPair;
    use crate::provider::{ProviderKind, TokenRefresher};
    use async_trait::async_trait;
    use backupsheep_common::SecretString;
    use chrono::{Duration, Utc};
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Harness {
        service: StorageService,
        account: AccountId,
        client: MemoryObjectClient,
    }

    fn harness_with(client: MemoryObjectClient, refresher: Option<Box<dyn TokenRefresher>>) -> Harness {
        let account = AccountId::new();
        let keys = StaticKeyProvider::new();
        keys.set(account, AccountKey::generate());

        let mut registry = AdapterRegistry::new();
        let s3_adapter = MemoryAdapter::new(ProviderKind::AwsS3, client.clone());
        let mut oauth_adapter = MemoryAdapter::new(ProviderKind::Dropbox, client.clone());
        if let Some(refresher) = refresher {
            oauth_adapter = oauth_adapter.with_refresher(refresher);
        }
        registry.register(Arc::new(s3_adapter)).unwrap();
        registry.register(Arc::new(oauth_adapter)).unwrap();

        let service = StorageService::new(
            Arc::new(crate::store::MemoryStore::new()),
            Arc::new(keys),
            registry,
            ProbeConfig::default(),
        );

        Harness {
            service,
            account,
            client,
        }
    }

    fn s3_credential(no_delete: bool) -> PlainCredential {
        Credential::AwsS3(S3KeyCredential {
            access_key: SecretString::new("AKIAEXAMPLE"),
            secret_key: SecretString::new("secret"),
            bucket: "backups".into(),
            prefix: Some("probe".into()),
            no_delete,
            region: Some("us-east-1".into()),
            endpoint: None,
        })
    }

    fn dropbox_credential(expires_at: chrono::DateTime<Utc>) -> PlainCredential {
        Credential::Dropbox(OAuthCredential {
            access_token: SecretString::new("stale-access"),
            refresh_token: SecretString::new("good-refresh"),
            expires_at: Some(expires_at),
            account_email: None,
            no_delete: false,
        })
    }

    struct CountingRefresher {
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl TokenRefresher for CountingRefresher {
        async fn refresh(&self, _refresh_token: &SecretString) -> Result<TokenPair> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(TokenPair {
                access_token: SecretString::new(format!("fresh-access-{}", n)),
                refresh_token: SecretString::new(format!("fresh-refresh-{}", n)),
                expires_at: Utc::now() + Duration::hours(4),
            })
        }
    }

    struct RevokedRefresher;

    #[async_trait]
    impl TokenRefresher for RevokedRefresher {
        async fn refresh(&self, _refresh_token: &SecretString) -> Result<TokenPair> {
            Err(StorageError::TokenExpired("revoked".into()))
        }
    }

    #[tokio::test]
    async fn test_create_probes_and_activates() {
        let h = harness_with(MemoryObjectClient::new(), None);

        let record = h
            .service
            .create_storage_record(h.account, "offsite", s3_credential(false))
            .await
            .unwrap();

        assert_eq!(record.status, StorageStatus::Active);
        assert_eq!(
            h.service.record(record.id).await.unwrap().status,
            StorageStatus::Active
        );
    }

    #[tokio::test]
    async fn test_create_failure_leaves_record_pending() {
        let h = harness_with(MemoryObjectClient::new().with_auth_failure(), None);

        let result = h
            .service
            .create_storage_record(h.account, "broken", s3_credential(false))
            .await;
        assert!(matches!(result, Err(StorageError::Auth(_))));

        // The record was persisted PENDING with its sealed credential.
        let records = h
            .service
            .store
            .records_for_account(h.account)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, StorageStatus::Pending);
    }

    #[tokio::test]
    async fn test_no_delete_keeps_probe_object() {
        let h = harness_with(MemoryObjectClient::new(), None);

        h.service
            .create_storage_record(h.account, "keep", s3_credential(true))
            .await
            .unwrap();

        // The test object is still there and readable.
        let objects = h.client.objects_snapshot().await;
        assert_eq!(objects.len(), 1);
    }

    #[tokio::test]
    async fn test_validate_reruns_probe() {
        let h = harness_with(MemoryObjectClient::new(), None);
        let record = h
            .service
            .create_storage_record(h.account, "offsite", s3_credential(false))
            .await
            .unwrap();

        let report = h.service.validate(record.id).await.unwrap();
        assert!(report.cleaned_up);
    }

    #[tokio::test]
    async fn test_lifecycle_via_service() {
        let h = harness_with(MemoryObjectClient::new(), None);
        let record = h
            .service
            .create_storage_record(h.account, "offsite", s3_credential(false))
            .await
            .unwrap();

        assert_eq!(
            h.service.pause(record.id).await.unwrap().status,
            StorageStatus::Paused
        );
        assert_eq!(
            h.service.resume(record.id).await.unwrap().status,
            StorageStatus::Active
        );

        let deleted = h.service.request_delete(record.id).await.unwrap();
        assert_eq!(deleted.status, StorageStatus::DeleteRequested);

        assert!(h.service.pause(record.id).await.is_err());
        assert!(h.service.resume(record.id).await.is_err());
    }

    #[tokio::test]
    async fn test_decrypted_credential_roundtrips() {
        let h = harness_with(MemoryObjectClient::new(), None);
        let record = h
            .service
            .create_storage_record(h.account, "offsite", s3_credential(false))
            .await
            .unwrap();

        let plain = h.service.get_decrypted_credential(record.id).await.unwrap();
        assert_eq!(plain, s3_credential(false));
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed_and_persisted() {
        let calls = Arc::new(AtomicU32::new(0));
        let h = harness_with(
            MemoryObjectClient::new(),
            Some(Box::new(CountingRefresher {
                calls: calls.clone(),
            })),
        );

        let record = h
            .service
            .create_storage_record(
                h.account,
                "drive",
                dropbox_credential(Utc::now() - Duration::hours(1)),
            )
            .await
            .unwrap();
        assert_eq!(record.status, StorageStatus::Active);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // The stored access token is the refreshed one, not the stale one.
        let plain = h.service.get_decrypted_credential(record.id).await.unwrap();
        let view = plain.token_view().unwrap();
        assert_eq!(view.access_token.expose(), "fresh-access-1");
        assert_ne!(view.access_token.expose(), "stale-access");

        // Token is now fresh; no second refresh happens.
        h.service.validate(record.id).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_refreshes_are_serialized() {
        let calls = Arc::new(AtomicU32::new(0));
        let h = harness_with(
            MemoryObjectClient::new(),
            Some(Box::new(CountingRefresher {
                calls: calls.clone(),
            })),
        );
        let record = h
            .service
            .create_storage_record(
                h.account,
                "drive",
                dropbox_credential(Utc::now() + Duration::hours(4)),
            )
            .await
            .unwrap();

        // Force expiry, then race several validations.
        let stale = SecretField::seal(
            &SecretString::new("stale"),
            &h.service.keys.encryption_key(h.account).unwrap(),
        )
        .unwrap();
        h.service
            .store
            .update_token_pair(
                record.id,
                stale.clone(),
                stale,
                Utc::now() - Duration::hours(1),
            )
            .await
            .unwrap();
        calls.store(0, Ordering::SeqCst);

        let (a, b, c) = tokio::join!(
            h.service.validate(record.id),
            h.service.validate(record.id),
            h.service.validate(record.id),
        );
        a.unwrap();
        b.unwrap();
        c.unwrap();

        // Exactly one refresh: the double-check under the lock caught the
        // others.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_revoked_refresh_token_is_terminal() {
        let h = harness_with(MemoryObjectClient::new(), Some(Box::new(RevokedRefresher)));

        let result = h
            .service
            .create_storage_record(
                h.account,
                "drive",
                dropbox_credential(Utc::now() - Duration::hours(1)),
            )
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err, StorageError::TokenExpired(_)));
        assert!(err.is_terminal());
    }

    #[tokio::test]
    async fn test_reseal_migrates_stale_credentials() {
        let h = harness_with(MemoryObjectClient::new(), None);
        let record = h
            .service
            .create_storage_record(h.account, "offsite", s3_credential(false))
            .await
            .unwrap();

        // Simulate a key rotation: reseal the row under an "old" key and
        // mark it stale.
        let old_key = AccountKey::generate();
        let sealed_old = s3_credential(false).seal(&old_key).unwrap();
        h.service
            .store
            .replace_credential(
                record.id,
                CredentialRow {
                    credential: sealed_old,
                    encryption_updated: false,
                },
            )
            .await
            .unwrap();

        // Decryption under the current key now fails.
        assert!(h.service.get_decrypted_credential(record.id).await.is_err());

        let migrated = h
            .service
            .reseal_credentials(h.account, &old_key)
            .await
            .unwrap();
        assert_eq!(migrated, 1);

        // And works again after migration.
        let plain = h.service.get_decrypted_credential(record.id).await.unwrap();
        assert_eq!(plain, s3_credential(false));

        // Second run is a no-op.
        assert_eq!(
            h.service
                .reseal_credentials(h.account, &old_key)
                .await
                .unwrap(),
            0
        );
    }
}
