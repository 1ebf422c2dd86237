//! RackCorp Object Storage adapter.
//!
//! Endpoint template: `{region}.s3.rackcorp.com`.

use async_trait::async_trait;

use backupsheep_common::SecretString;

use crate::config::ProbeConfig;
use crate::credential::{Credential, PlainCredential, S3KeyCredential};
use crate::error::{Result, StorageError};
use crate::provider::{ObjectClient, ProviderKind, StorageAdapter};
use crate::registry::AdapterContext;
use crate::s3::{S3CompatClient, S3Settings};

pub struct RackCorpAdapter {
    timeouts: ProbeConfig,
}

impl RackCorpAdapter {
    pub fn new(ctx: &AdapterContext) -> Self {
        Self { timeouts: ctx.probe }
    }

    fn fields<'a>(&self, credential: &'a PlainCredential) -> Result<&'a S3KeyCredential<SecretString>> {
        match credential {
            Credential::RackCorp(fields) => Ok(fields),
            other => Err(StorageError::NoCredentialBound(format!(
                "expected rackcorp credential, found {}",
                other.kind()
            ))),
        }
    }

    fn region<'a>(&self, fields: &'a S3KeyCredential<SecretString>) -> Result<&'a str> {
        fields
            .region
            .as_deref()
            .ok_or_else(|| StorageError::InvalidInput("rackcorp region is required".to_string()))
    }
}

#[async_trait]
impl StorageAdapter for RackCorpAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::RackCorp
    }

    fn endpoint(&self, credential: &PlainCredential) -> Result<String> {
        let fields = self.fields(credential)?;
        Ok(format!("{}.s3.rackcorp.com", self.region(fields)?))
    }

    async fn build_client(&self, credential: &PlainCredential) -> Result<Box<dyn ObjectClient>> {
        let fields = self.fields(credential)?;
        let region = self.region(fields)?.to_string();
        let endpoint = format!("{}.s3.rackcorp.com", region);
        Ok(Box::new(S3CompatClient::connect(
            &fields.access_key,
            &fields.secret_key,
            &fields.bucket,
            S3Settings::compatible(&endpoint, &region),
            &self.timeouts,
        )))
    }
}
