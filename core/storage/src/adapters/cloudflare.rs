//! Cloudflare R2 adapter.
//!
//! Endpoint template: `{account_id}.r2.cloudflarestorage.com`; the signer
//! region is the literal "auto".

use async_trait::async_trait;

use backupsheep_common::SecretString;

use crate::config::ProbeConfig;
use crate::credential::{CloudflareCredential, Credential, PlainCredential};
use crate::error::{Result, StorageError};
use crate::provider::{ObjectClient, ProviderKind, StorageAdapter};
use crate::registry::AdapterContext;
use crate::s3::{S3CompatClient, S3Settings};

pub struct CloudflareAdapter {
    timeouts: ProbeConfig,
}

impl CloudflareAdapter {
    pub fn new(ctx: &AdapterContext) -> Self {
        Self { timeouts: ctx.probe }
    }

    fn fields<'a>(&self, credential: &'a PlainCredential) -> Result<&'a CloudflareCredential<SecretString>> {
        match credential {
            Credential::Cloudflare(fields) => Ok(fields),
            other => Err(StorageError::NoCredentialBound(format!(
                "expected cloudflare credential, found {}",
                other.kind()
            ))),
        }
    }
}

#[async_trait]
impl StorageAdapter for CloudflareAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Cloudflare
    }

    fn endpoint(&self, credential: &PlainCredential) -> Result<String> {
        let fields = self.fields(credential)?;
        Ok(format!("{}.r2.cloudflarestorage.com", fields.account_id))
    }

    async fn build_client(&self, credential: &PlainCredential) -> Result<Box<dyn ObjectClient>> {
        let fields = self.fields(credential)?;
        let endpoint = self.endpoint(credential)?;
        Ok(Box::new(S3CompatClient::connect(
            &fields.access_key,
            &fields.secret_key,
            &fields.bucket,
            S3Settings::compatible(&endpoint, "auto"),
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
    fn test_endpoint_embeds_account_id() {
        let adapter = CloudflareAdapter::new(&AdapterContext {
            oauth: OAuthApps::disabled(),
            regions: Arc::new(StaticRegions::with_defaults()),
            probe: ProbeConfig::default(),
        });
        let credential = Credential::Cloudflare(CloudflareCredential {
            access_key: SecretString::new("ak"),
            secret_key: SecretString::new("sk"),
            account_id: "9f2b7a".into(),
            bucket: "b".into(),
            prefix: None,
            no_delete: false,
        });

        assert_eq!(
            adapter.endpoint(&credential).unwrap(),
            "9f2b7a.r2.cloudflarestorage.com"
        );
    }
}
