//! Alibaba Cloud OSS adapter.
//!
//! Endpoint comes from the region table (e.g. `oss-eu-central-1.aliyuncs.com`);
//! read-back verification goes through a presigned URL.

use std::sync::Arc;

use async_trait::async_trait;
use opendal::{services, Operator};

use backupsheep_common::SecretString;

use crate::blob::{BlobClient, ReadBack};
use crate::config::ProbeConfig;
use crate::credential::{Credential, PlainCredential, S3KeyCredential};
use crate::error::{Result, StorageError};
use crate::provider::{ObjectClient, ProviderKind, StorageAdapter};
use crate::registry::AdapterContext;
use crate::regions::RegionLookup;

pub struct AlibabaAdapter {
    regions: Arc<dyn RegionLookup>,
    timeouts: ProbeConfig,
}

impl AlibabaAdapter {
    pub fn new(ctx: &AdapterContext) -> Self {
        Self {
            regions: ctx.regions.clone(),
            timeouts: ctx.probe,
        }
    }

    fn fields<'a>(&self, credential: &'a PlainCredential) -> Result<&'a S3KeyCredential<SecretString>> {
        match credential {
            Credential::Alibaba(fields) => Ok(fields),
            other => Err(StorageError::NoCredentialBound(format!(
                "expected alibaba credential, found {}",
                other.kind()
            ))),
        }
    }

    fn resolve_endpoint(&self, fields: &S3KeyCredential<SecretString>) -> Result<String> {
        let code = fields
            .region
            .as_deref()
            .ok_or_else(|| StorageError::InvalidInput("oss region is required".to_string()))?;
        let region = self
            .regions
            .lookup(ProviderKind::Alibaba, code)
            .ok_or_else(|| StorageError::InvalidInput(format!("unknown oss region {}", code)))?;
        region
            .endpoint
            .ok_or_else(|| StorageError::InvalidInput(format!("oss region {} has no endpoint", code)))
    }
}

#[async_trait]
impl StorageAdapter for AlibabaAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Alibaba
    }

    fn endpoint(&self, credential: &PlainCredential) -> Result<String> {
        let fields = self.fields(credential)?;
        self.resolve_endpoint(fields)
    }

    async fn build_client(&self, credential: &PlainCredential) -> Result<Box<dyn ObjectClient>> {
        let fields = self.fields(credential)?;
        let endpoint = self.resolve_endpoint(fields)?;

        let builder = services::Oss::default()
            .endpoint(&format!("https://{}", endpoint))
            .access_key_id(fields.access_key.expose())
            .access_key_secret(fields.secret_key.expose())
            .bucket(&fields.bucket);

        let operator = Operator::new(builder)
            .map_err(|e| StorageError::InvalidInput(format!("oss config: {}", e)))?
            .finish();

        Ok(Box::new(BlobClient::new(
            operator,
            ReadBack::PresignedUrl,
            &self.timeouts,
        )?))
    }
}
