//! UpCloud Object Storage adapter. The per-instance endpoint is stored on
//! the credential.

use async_trait::async_trait;

use backupsheep_common::SecretString;

use crate::config::ProbeConfig;
use crate::credential::{Credential, PlainCredential, S3KeyCredential};
use crate::error::{Result, StorageError};
use crate::provider::{ObjectClient, ProviderKind, StorageAdapter};
use crate::registry::AdapterContext;
use crate::s3::{S3CompatClient, S3Settings};

pub struct UpCloudAdapter {
    timeouts: ProbeConfig,
}

impl UpCloudAdapter {
    pub fn new(ctx: &AdapterContext) -> Self {
        Self { timeouts: ctx.probe }
    }

    fn fields<'a>(&self, credential: &'a PlainCredential) -> Result<&'a S3KeyCredential<SecretString>> {
        match credential {
            Credential::UpCloud(fields) => Ok(fields),
            other => Err(StorageError::NoCredentialBound(format!(
                "expected upcloud credential, found {}",
                other.kind()
            ))),
        }
    }
}

#[async_trait]
impl StorageAdapter for UpCloudAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::UpCloud
    }

    fn endpoint(&self, credential: &PlainCredential) -> Result<String> {
        let fields = self.fields(credential)?;
        fields
            .endpoint
            .clone()
            .ok_or_else(|| StorageError::InvalidInput("upcloud endpoint is required".to_string()))
    }

    async fn build_client(&self, credential: &PlainCredential) -> Result<Box<dyn ObjectClient>> {
        let fields = self.fields(credential)?;
        let endpoint = self.endpoint(credential)?;
        let region = endpoint.split('.').nth(1).unwrap_or("europe-1").to_string();
        Ok(Box::new(S3CompatClient::connect(
            &fields.access_key,
            &fields.secret_key,
            &fields.bucket,
            S3Settings::compatible(&endpoint, &region),
            &self.timeouts,
        )))
    }
}
