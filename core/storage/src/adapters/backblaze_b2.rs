//! Backblaze B2 adapter (S3-compatible API). The endpoint host is handed
//! out by Backblaze per bucket and stored on the credential.

use async_trait::async_trait;

use backupsheep_common::SecretString;

use crate::config::ProbeConfig;
use crate::credential::{Credential, PlainCredential, S3KeyCredential};
use crate::error::{Result, StorageError};
use crate::provider::{ObjectClient, ProviderKind, StorageAdapter};
use crate::registry::AdapterContext;
use crate::s3::{S3CompatClient, S3Settings};

pub struct BackblazeB2Adapter {
    timeouts: ProbeConfig,
}

impl BackblazeB2Adapter {
    pub fn new(ctx: &AdapterContext) -> Self {
        Self { timeouts: ctx.probe }
    }

    fn fields<'a>(&self, credential: &'a PlainCredential) -> Result<&'a S3KeyCredential<SecretString>> {
        match credential {
            Credential::BackblazeB2(fields) => Ok(fields),
            other => Err(StorageError::NoCredentialBound(format!(
                "expected backblaze_b2 credential, found {}",
                other.kind()
            ))),
        }
    }

    fn stored_endpoint<'a>(&self, fields: &'a S3KeyCredential<SecretString>) -> Result<&'a str> {
        fields
            .endpoint
            .as_deref()
            .ok_or_else(|| StorageError::InvalidInput("backblaze_b2 endpoint is required".to_string()))
    }
}

#[async_trait]
impl StorageAdapter for BackblazeB2Adapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::BackblazeB2
    }

    fn endpoint(&self, credential: &PlainCredential) -> Result<String> {
        let fields = self.fields(credential)?;
        Ok(self.stored_endpoint(fields)?.to_string())
    }

    async fn build_client(&self, credential: &PlainCredential) -> Result<Box<dyn ObjectClient>> {
        let fields = self.fields(credential)?;
        let endpoint = self.stored_endpoint(fields)?;
        // B2 endpoints look like s3.us-west-004.backblazeb2.com; the
        // embedded region is what the signer expects.
        let region = endpoint
            .split('.')
            .nth(1)
            .unwrap_or("us-east-1")
            .to_string();
        Ok(Box::new(S3CompatClient::connect(
            &fields.access_key,
            &fields.secret_key,
            &fields.bucket,
            S3Settings::compatible(endpoint, &region),
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

    fn adapter() -> BackblazeB2Adapter {
        BackblazeB2Adapter::new(&AdapterContext {
            oauth: OAuthApps::disabled(),
            regions: Arc::new(StaticRegions::with_defaults()),
            probe: ProbeConfig::default(),
        })
    }

    fn credential(endpoint: Option<&str>) -> PlainCredential {
        Credential::BackblazeB2(S3KeyCredential {
            access_key: SecretString::new("key-id"),
            secret_key: SecretString::new("app-key"),
            bucket: "b".into(),
            prefix: None,
            no_delete: false,
            region: None,
            endpoint: endpoint.map(str::to_string),
        })
    }

    #[test]
    fn test_endpoint_is_taken_verbatim() {
        assert_eq!(
            adapter()
                .endpoint(&credential(Some("s3.us-west-004.backblazeb2.com")))
                .unwrap(),
            "s3.us-west-004.backblazeb2.com"
        );
    }

    #[test]
    fn test_missing_endpoint_is_invalid() {
        assert!(matches!(
            adapter().endpoint(&credential(None)),
            Err(StorageError::InvalidInput(_))
        ));
    }
}
