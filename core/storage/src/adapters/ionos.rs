//! IONOS S3 Object Storage adapter. Endpoint comes from the region table.

use std::sync::Arc;

use async_trait::async_trait;

use backupsheep_common::SecretString;

use crate::config::ProbeConfig;
use crate::credential::{Credential, PlainCredential, S3KeyCredential};
use crate::error::{Result, StorageError};
use crate::provider::{ObjectClient, ProviderKind, StorageAdapter};
use crate::registry::AdapterContext;
use crate::regions::RegionLookup;
use crate::s3::{S3CompatClient, S3Settings};

pub struct IonosAdapter {
    regions: Arc<dyn RegionLookup>,
    timeouts: ProbeConfig,
}

impl IonosAdapter {
    pub fn new(ctx: &AdapterContext) -> Self {
        Self {
            regions: ctx.regions.clone(),
            timeouts: ctx.probe,
        }
    }

    fn fields<'a>(&self, credential: &'a PlainCredential) -> Result<&'a S3KeyCredential<SecretString>> {
        match credential {
            Credential::Ionos(fields) => Ok(fields),
            other => Err(StorageError::NoCredentialBound(format!(
                "expected ionos credential, found {}",
                other.kind()
            ))),
        }
    }

    fn resolve_region(&self, fields: &S3KeyCredential<SecretString>) -> Result<(String, String)> {
        let code = fields
            .region
            .as_deref()
            .ok_or_else(|| StorageError::InvalidInput("ionos region is required".to_string()))?;
        let region = self
            .regions
            .lookup(ProviderKind::Ionos, code)
            .ok_or_else(|| StorageError::InvalidInput(format!("unknown ionos region {}", code)))?;
        let endpoint = region.endpoint.ok_or_else(|| {
            StorageError::InvalidInput(format!("ionos region {} has no endpoint", code))
        })?;
        Ok((code.to_string(), endpoint))
    }
}

#[async_trait]
impl StorageAdapter for IonosAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Ionos
    }

    fn endpoint(&self, credential: &PlainCredential) -> Result<String> {
        let fields = self.fields(credential)?;
        Ok(self.resolve_region(fields)?.1)
    }

    async fn build_client(&self, credential: &PlainCredential) -> Result<Box<dyn ObjectClient>> {
        let fields = self.fields(credential)?;
        let (region, endpoint) = self.resolve_region(fields)?;
        Ok(Box::new(S3CompatClient::connect(
            &fields.access_key,
            &fields.secret_key,
            &fields.bucket,
            S3Settings::compatible(&endpoint, &region),
            &self.timeouts,
        )))
    }
}
