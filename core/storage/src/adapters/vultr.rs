//! Vultr Object Storage adapter. Hostname is stored on the credential.

use async_trait::async_trait;

use backupsheep_common::SecretString;

use crate::config::ProbeConfig;
use crate::credential::{Credential, PlainCredential, S3KeyCredential};
use crate::error::{Result, StorageError};
use crate::provider::{ObjectClient, ProviderKind, StorageAdapter};
use crate::registry::AdapterContext;
use crate::s3::{S3CompatClient, S3Settings};

pub struct VultrAdapter {
    timeouts: ProbeConfig,
}

impl VultrAdapter {
    pub fn new(ctx: &AdapterContext) -> Self {
        Self { timeouts: ctx.probe }
    }

    fn fields<'a>(&self, credential: &'a PlainCredential) -> Result<&'a S3KeyCredential<SecretString>> {
        match credential {
            Credential::Vultr(fields) => Ok(fields),
            other => Err(StorageError::NoCredentialBound(format!(
                "expected vultr credential, found {}",
                other.kind()
            ))),
        }
    }
}

#[async_trait]
impl StorageAdapter for VultrAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Vultr
    }

    fn endpoint(&self, credential: &PlainCredential) -> Result<String> {
        let fields = self.fields(credential)?;
        fields
            .endpoint
            .clone()
            .ok_or_else(|| StorageError::InvalidInput("vultr hostname is required".to_string()))
    }

    async fn build_client(&self, credential: &PlainCredential) -> Result<Box<dyn ObjectClient>> {
        let fields = self.fields(credential)?;
        let endpoint = self.endpoint(credential)?;
        let region = endpoint.split('.').next().unwrap_or("ewr1").to_string();
        Ok(Box::new(S3CompatClient::connect(
            &fields.access_key,
            &fields.secret_key,
            &fields.bucket,
            S3Settings::compatible(&endpoint, &region),
            &self.timeouts,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OAuthApps;
    use crate::regions::StaticRegions;
    use std::sync::Arc;

    #[test]
    fn test_endpoint_is_taken_verbatim() {
        let adapter = VultrAdapter::new(&AdapterContext {
            oauth: OAuthApps::disabled(),
            regions: Arc::new(StaticRegions::with_defaults()),
            probe: ProbeConfig::default(),
        });
        let credential = Credential::Vultr(S3KeyCredential {
            access_key: SecretString::new("ak"),
            secret_key: SecretString::new("sk"),
            bucket: "b".into(),
            prefix: None,
            no_delete: false,
            region: None,
            endpoint: Some("ewr1.vultrobjects.com".into()),
        });

        assert_eq!(adapter.endpoint(&credential).unwrap(), "ewr1.vultrobjects.com");
    }
}
