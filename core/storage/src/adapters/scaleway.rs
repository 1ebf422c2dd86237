//! Scaleway Object Storage adapter.
//!
//! Endpoint template: `s3.{region}.scw.cloud`.

use async_trait::async_trait;

use backupsheep_common::SecretString;

use crate::config::ProbeConfig;
use crate::credential::{Credential, PlainCredential, S3KeyCredential};
use crate::error::{Result, StorageError};
use crate::provider::{ObjectClient, ProviderKind, StorageAdapter};
use crate::registry::AdapterContext;
use crate::s3::{S3CompatClient, S3Settings};

pub struct ScalewayAdapter {
    timeouts: ProbeConfig,
}

impl ScalewayAdapter {
    pub fn new(ctx: &AdapterContext) -> Self {
        Self { timeouts: ctx.probe }
    }

    fn fields<'a>(&self, credential: &'a PlainCredential) -> Result<&'a S3KeyCredential<SecretString>> {
        match credential {
            Credential::Scaleway(fields) => Ok(fields),
            other => Err(StorageError::NoCredentialBound(format!(
                "expected scaleway credential, found {}",
                other.kind()
            ))),
        }
    }

    fn region<'a>(&self, fields: &'a S3KeyCredential<SecretString>) -> Result<&'a str> {
        fields
            .region
            .as_deref()
            .ok_or_else(|| StorageError::InvalidInput("scaleway region is required".to_string()))
    }
}

#[async_trait]
impl StorageAdapter for ScalewayAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Scaleway
    }

    fn endpoint(&self, credential: &PlainCredential) -> Result<String> {
        let fields = self.fields(credential)?;
        Ok(format!("s3.{}.scw.cloud", self.region(fields)?))
    }

    async fn build_client(&self, credential: &PlainCredential) -> Result<Box<dyn ObjectClient>> {
        let fields = self.fields(credential)?;
        let region = self.region(fields)?.to_string();
        let endpoint = format!("s3.{}.scw.cloud", region);
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
    fn test_endpoint_template() {
        let adapter = ScalewayAdapter::new(&AdapterContext {
            oauth: OAuthApps::disabled(),
            regions: Arc::new(StaticRegions::with_defaults()),
            probe: ProbeConfig::default(),
        });
        let credential = Credential::Scaleway(S3KeyCredential {
            access_key: SecretString::new("ak"),
            secret_key: SecretString::new("sk"),
            bucket: "b".into(),
            prefix: None,
            no_delete: false,
            region: Some("fr-par".into()),
            endpoint: None,
        });

        assert_eq!(adapter.endpoint(&credential).unwrap(), "s3.fr-par.scw.cloud");
    }
}
