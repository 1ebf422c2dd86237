//! Adapter registry and credential dispatch.
//!
//! Resolves which adapter backs a given storage record and checks the
//! record/credential binding invariant on the way through. The credential
//! sum type makes "two credentials bound" unrepresentable; what remains to
//! guard is a missing credential row and a variant that disagrees with the
//! record's provider code. Both are integrity violations, not normal error
//! paths, and are logged accordingly.

use std::collections::HashMap;
use std::sync::Arc;

use crate::adapters;
use crate::config::{OAuthApps, ProbeConfig};
use crate::credential::StoredCredential;
use crate::error::{Result, StorageError};
use crate::provider::{ProviderKind, StorageAdapter};
use crate::record::StorageRecord;
use crate::regions::RegionLookup;

/// Everything adapters need at construction time. Injected explicitly; no
/// ambient global configuration.
#[derive(Clone)]
pub struct AdapterContext {
    pub oauth: OAuthApps,
    pub regions: Arc<dyn RegionLookup>,
    pub probe: ProbeConfig,
}

/// Registry of one adapter per provider.
pub struct AdapterRegistry {
    adapters: HashMap<ProviderKind, Arc<dyn StorageAdapter>>,
}

impl AdapterRegistry {
    /// Empty registry; callers register adapters themselves (tests).
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// Registry with every built-in provider adapter registered.
    pub fn with_builtin(ctx: &AdapterContext) -> Result<Self> {
        let mut registry = Self::new();
        for adapter in adapters::builtin(ctx)? {
            registry.register(adapter)?;
        }
        Ok(registry)
    }

    /// Register an adapter under its own kind.
    ///
    /// # Errors
    /// - The kind is already registered
    pub fn register(&mut self, adapter: Arc<dyn StorageAdapter>) -> Result<()> {
        let kind = adapter.kind();
        if self.adapters.contains_key(&kind) {
            return Err(StorageError::InvalidInput(format!(
                "adapter for {} is already registered",
                kind
            )));
        }
        self.adapters.insert(kind, adapter);
        Ok(())
    }

    /// Look up the adapter for a provider.
    pub fn adapter(&self, kind: ProviderKind) -> Result<Arc<dyn StorageAdapter>> {
        self.adapters
            .get(&kind)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("no adapter registered for {}", kind)))
    }

    /// Registered provider kinds.
    pub fn kinds(&self) -> Vec<ProviderKind> {
        self.adapters.keys().copied().collect()
    }

    /// Resolve the adapter bound to a record and check the credential
    /// binding invariant.
    ///
    /// # Errors
    /// - [`StorageError::NoCredentialBound`] if no credential exists or its
    ///   variant does not match the record's provider — a data integrity
    ///   bug, never swallowed silently
    pub fn resolve<'c>(
        &self,
        record: &StorageRecord,
        credential: Option<&'c StoredCredential>,
    ) -> Result<(Arc<dyn StorageAdapter>, &'c StoredCredential)> {
        let credential = credential.ok_or_else(|| {
            tracing::error!(
                storage = %record.id,
                provider = %record.kind,
                "storage record has no credential bound"
            );
            StorageError::NoCredentialBound(format!(
                "record {} ({}) has no credential",
                record.id, record.kind
            ))
        })?;

        if credential.kind() != record.kind {
            tracing::error!(
                storage = %record.id,
                provider = %record.kind,
                credential_provider = %credential.kind(),
                "storage record credential belongs to a different provider"
            );
            return Err(StorageError::NoCredentialBound(format!(
                "record {} is {} but its credential is {}",
                record.id,
                record.kind,
                credential.kind()
            )));
        }

        Ok((self.adapter(record.kind)?, credential))
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::{Credential, S3KeyCredential, SecretField};
    use crate::memory::{MemoryAdapter, MemoryObjectClient};
    use crate::regions::StaticRegions;
    use backupsheep_common::AccountId;
    use backupsheep_common::SecretString;
    use backupsheep_crypto::AccountKey;

    fn context() -> AdapterContext {
        AdapterContext {
            oauth: OAuthApps::disabled(),
            regions: Arc::new(StaticRegions::with_defaults()),
            probe: ProbeConfig::default(),
        }
    }

    fn stored_s3(kind_ctor: fn(S3KeyCredential<SecretField>) -> StoredCredential) -> StoredCredential {
        let key = AccountKey::generate();
        let fields = S3KeyCredential {
            access_key: SecretField::seal(&SecretString::new("ak"), &key).unwrap(),
            secret_key: SecretField::seal(&SecretString::new("sk"), &key).unwrap(),
            bucket: "b".into(),
            prefix: None,
            no_delete: false,
            region: None,
            endpoint: None,
        };
        kind_ctor(fields)
    }

    #[test]
    fn test_builtin_registry_covers_every_provider() {
        let registry = AdapterRegistry::with_builtin(&context()).unwrap();

        for kind in ProviderKind::ALL {
            let adapter = registry.adapter(kind).unwrap();
            assert_eq!(adapter.kind(), kind);
        }
        assert_eq!(registry.kinds().len(), ProviderKind::ALL.len());
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = AdapterRegistry::new();
        registry
            .register(Arc::new(MemoryAdapter::new(
                ProviderKind::AwsS3,
                MemoryObjectClient::new(),
            )))
            .unwrap();

        let result = registry.register(Arc::new(MemoryAdapter::new(
            ProviderKind::AwsS3,
            MemoryObjectClient::new(),
        )));
        assert!(result.is_err());
    }

    #[test]
    fn test_resolve_with_matching_credential() {
        let registry = AdapterRegistry::with_builtin(&context()).unwrap();
        let record = StorageRecord::new(AccountId::new(), ProviderKind::Wasabi, "w");
        let stored = stored_s3(Credential::Wasabi);

        let (adapter, credential) = registry.resolve(&record, Some(&stored)).unwrap();
        assert_eq!(adapter.kind(), ProviderKind::Wasabi);
        assert_eq!(credential.kind(), ProviderKind::Wasabi);
    }

    #[test]
    fn test_resolve_without_credential_is_loud() {
        let registry = AdapterRegistry::with_builtin(&context()).unwrap();
        let record = StorageRecord::new(AccountId::new(), ProviderKind::Wasabi, "w");

        let result = registry.resolve(&record, None);
        assert!(matches!(result, Err(StorageError::NoCredentialBound(_))));
    }

    #[test]
    fn test_resolve_with_mismatched_credential_is_loud() {
        let registry = AdapterRegistry::with_builtin(&context()).unwrap();
        let record = StorageRecord::new(AccountId::new(), ProviderKind::Wasabi, "w");
        let stored = stored_s3(Credential::Linode);

        let result = registry.resolve(&record, Some(&stored));
        assert!(matches!(result, Err(StorageError::NoCredentialBound(_))));
    }
}
