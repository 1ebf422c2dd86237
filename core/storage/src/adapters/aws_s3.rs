//! AWS S3 adapter.

use async_trait::async_trait;

use backupsheep_common::SecretString;

use crate::config::ProbeConfig;
use crate::credential::{Credential, PlainCredential, S3KeyCredential};
use crate::error::{Result, StorageError};
use crate::provider::{ObjectClient, ProviderKind, StorageAdapter};
use crate::registry::AdapterContext;
use crate::s3::{S3CompatClient, S3Settings};

pub struct AwsS3Adapter {
    timeouts: ProbeConfig,
}

impl AwsS3Adapter {
    pub fn new(ctx: &AdapterContext) -> Self {
        Self { timeouts: ctx.probe }
    }

    fn fields<'a>(&self, credential: &'a PlainCredential) -> Result<&'a S3KeyCredential<SecretString>> {
        match credential {
            Credential::AwsS3(fields) => Ok(fields),
            other => Err(StorageError::NoCredentialBound(format!(
                "expected aws_s3 credential, found {}",
                other.kind()
            ))),
        }
    }
}

#[async_trait]
impl StorageAdapter for AwsS3Adapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::AwsS3
    }

    fn endpoint(&self, credential: &PlainCredential) -> Result<String> {
        let fields = self.fields(credential)?;
        Ok(match fields.region.as_deref() {
            Some(region) => format!("s3.{}.amazonaws.com", region),
            None => "s3.amazonaws.com".to_string(),
        })
    }

    async fn build_client(&self, credential: &PlainCredential) -> Result<Box<dyn ObjectClient>> {
        let fields = self.fields(credential)?;
        Ok(Box::new(S3CompatClient::connect(
            &fields.access_key,
            &fields.secret_key,
            &fields.bucket,
            S3Settings::aws(fields.region.as_deref()),
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

    fn adapter() -> AwsS3Adapter {
        AwsS3Adapter::new(&AdapterContext {
            oauth: OAuthApps::disabled(),
            regions: Arc::new(StaticRegions::with_defaults()),
            probe: ProbeConfig::default(),
        })
    }

    fn credential(region: Option<&str>) -> PlainCredential {
        Credential::AwsS3(S3KeyCredential {
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
    fn test_endpoint_per_region() {
        let adapter = adapter();
        assert_eq!(
            adapter.endpoint(&credential(Some("eu-west-1"))).unwrap(),
            "s3.eu-west-1.amazonaws.com"
        );
        assert_eq!(
            adapter.endpoint(&credential(None)).unwrap(),
            "s3.amazonaws.com"
        );
    }

    #[test]
    fn test_rejects_foreign_credential() {
        let adapter = adapter();
        let foreign = Credential::Wasabi(S3KeyCredential {
            access_key: SecretString::new("ak"),
            secret_key: SecretString::new("sk"),
            bucket: "b".into(),
            prefix: None,
            no_delete: false,
            region: None,
            endpoint: None,
        });

        assert!(matches!(
            adapter.endpoint(&foreign),
            Err(StorageError::NoCredentialBound(_))
        ));
    }
}
