//! Exoscale SOS adapter. Endpoint comes from the region table.

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

pub struct ExoscaleAdapter {
    regions: Arc<dyn RegionLookup>,
    timeouts: ProbeConfig,
}

impl ExoscaleAdapter {
    pub fn new(ctx: &AdapterContext) -> Self {
        Self {
            regions: ctx.regions.clone(),
            timeouts: ctx.probe,
        }
    }

    fn fields<'a>(&self, credential: &'a PlainCredential) -> Result<&'a S3KeyCredential<SecretString>> {
        match credential {
            Credential::Exoscale(fields) => Ok(fields),
            other => Err(StorageError::NoCredentialBound(format!(
                "expected exoscale credential, found {}",
                other.kind()
            ))),
        }
    }

    fn resolve_region(&self, fields: &S3KeyCredential<SecretString>) -> Result<(String, String)> {
        let code = fields
            .region
            .as_deref()
            .ok_or_else(|| StorageError::InvalidInput("exoscale zone is required".to_string()))?;
        let region = self
            .regions
            .lookup(ProviderKind::Exoscale, code)
            .ok_or_else(|| StorageError::InvalidInput(format!("unknown exoscale zone {}", code)))?;
        let endpoint = region.endpoint.ok_or_else(|| {
            StorageError::InvalidInput(format!("exoscale zone {} has no endpoint", code))
        })?;
        Ok((code.to_string(), endpoint))
    }
}

#[async_trait]
impl StorageAdapter for ExoscaleAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Exoscale
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OAuthApps;
    use crate::regions::StaticRegions;

    #[test]
    fn test_endpoint_from_region_table() {
        let adapter = ExoscaleAdapter::new(&AdapterContext {
            oauth: OAuthApps::disabled(),
            regions: Arc::new(StaticRegions::with_defaults()),
            probe: ProbeConfig::default(),
        });
        let credential = Credential::Exoscale(S3KeyCredential {
            access_key: SecretString::new("ak"),
            secret_key: SecretString::new("sk"),
            bucket: "b".into(),
            prefix: None,
            no_delete: false,
            region: Some("ch-gva-2".into()),
            endpoint: None,
        });

        assert_eq!(adapter.endpoint(&credential).unwrap(), "sos-ch-gva-2.exo.io");
    }
}
