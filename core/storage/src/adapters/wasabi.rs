//! Wasabi hot cloud storage adapter. Endpoint comes from the region table.

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

pub struct WasabiAdapter {
    regions: Arc<dyn RegionLookup>,
    timeouts: ProbeConfig,
}

impl WasabiAdapter {
    pub fn new(ctx: &AdapterContext) -> Self {
        Self {
            regions: ctx.regions.clone(),
            timeouts: ctx.probe,
        }
    }

    fn fields<'a>(&self, credential: &'a PlainCredential) -> Result<&'a S3KeyCredential<SecretString>> {
        match credential {
            Credential::Wasabi(fields) => Ok(fields),
            other => Err(StorageError::NoCredentialBound(format!(
                "expected wasabi credential, found {}",
                other.kind()
            ))),
        }
    }

    fn resolve_region(&self, fields: &S3KeyCredential<SecretString>) -> Result<(String, String)> {
        let code = fields
            .region
            .as_deref()
            .ok_or_else(|| StorageError::InvalidInput("wasabi region is required".to_string()))?;
        let region = self
            .regions
            .lookup(ProviderKind::Wasabi, code)
            .ok_or_else(|| StorageError::InvalidInput(format!("unknown wasabi region {}", code)))?;
        let endpoint = region.endpoint.ok_or_else(|| {
            StorageError::InvalidInput(format!("wasabi region {} has no endpoint", code))
        })?;
        Ok((code.to_string(), endpoint))
    }
}

#[async_trait]
impl StorageAdapter for WasabiAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Wasabi
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

    fn adapter() -> WasabiAdapter {
        WasabiAdapter::new(&AdapterContext {
            oauth: OAuthApps::disabled(),
            regions: Arc::new(StaticRegions::with_defaults()),
            probe: ProbeConfig::default(),
        })
    }

    fn credential(region: Option<&str>) -> PlainCredential {
        Credential::Wasabi(S3KeyCredential {
            access_key: SecretString::new("ak"),
            secret_key: SecretString::new("sk"),
            bucket: "backups".into(),
            prefix: None,
            no_delete: false,
            region: region.map(str::to_string),
            endpoint: None,
        })
    }

    #[test]
    fn test_endpoint_from_region_table() {
        assert_eq!(
            adapter().endpoint(&credential(Some("us-east-1"))).unwrap(),
            "s3.wasabisys.com"
        );
        assert_eq!(
            adapter()
                .endpoint(&credential(Some("eu-central-1")))
                .unwrap(),
            "s3.eu-central-1.wasabisys.com"
        );
    }

    #[test]
    fn test_missing_region_is_invalid() {
        assert!(matches!(
            adapter().endpoint(&credential(None)),
            Err(StorageError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_unknown_region_is_invalid() {
        assert!(matches!(
            adapter().endpoint(&credential(Some("atlantis-1"))),
            Err(StorageError::InvalidInput(_))
        ));
    }
}
