//! Tencent Cloud COS adapter.
//!
//! Bucket endpoint template: `{bucket}.cos.{region}.myqcloud.com`. Read-back
//! verification fetches a presigned URL, the same way the uploaded object
//! would be shared.

use async_trait::async_trait;
use opendal::{services, Operator};

use backupsheep_common::SecretString;

use crate::blob::{BlobClient, ReadBack};
use crate::config::ProbeConfig;
use crate::credential::{Credential, PlainCredential, S3KeyCredential};
use crate::error::{Result, StorageError};
use crate::provider::{ObjectClient, ProviderKind, StorageAdapter};
use crate::registry::AdapterContext;

pub struct TencentAdapter {
    timeouts: ProbeConfig,
}

impl TencentAdapter {
    pub fn new(ctx: &AdapterContext) -> Self {
        Self { timeouts: ctx.probe }
    }

    fn fields<'a>(&self, credential: &'a PlainCredential) -> Result<&'a S3KeyCredential<SecretString>> {
        match credential {
            Credential::Tencent(fields) => Ok(fields),
            other => Err(StorageError::NoCredentialBound(format!(
                "expected tencent credential, found {}",
                other.kind()
            ))),
        }
    }

    fn region<'a>(&self, fields: &'a S3KeyCredential<SecretString>) -> Result<&'a str> {
        fields
            .region
            .as_deref()
            .ok_or_else(|| StorageError::InvalidInput("tencent region is required".to_string()))
    }
}

#[async_trait]
impl StorageAdapter for TencentAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Tencent
    }

    fn endpoint(&self, credential: &PlainCredential) -> Result<String> {
        let fields = self.fields(credential)?;
        Ok(format!(
            "{}.cos.{}.myqcloud.com",
            fields.bucket,
            self.region(fields)?
        ))
    }

    async fn build_client(&self, credential: &PlainCredential) -> Result<Box<dyn ObjectClient>> {
        let fields = self.fields(credential)?;
        let region = self.region(fields)?;

        let builder = services::Cos::default()
            .endpoint(&format!("https://cos.{}.myqcloud.com", region))
            .secret_id(fields.access_key.expose())
            .secret_key(fields.secret_key.expose())
            .bucket(&fields.bucket);

        let operator = Operator::new(builder)
            .map_err(|e| StorageError::InvalidInput(format!("cos config: {}", e)))?
            .finish();

        Ok(Box::new(BlobClient::new(
            operator,
            ReadBack::PresignedUrl,
            &self.timeouts,
        )?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OAuthApps;
    use crate::regions::StaticRegions;
    use std::sync::Arc;

    #[test]
    fn test_endpoint_embeds_bucket_and_region() {
        let adapter = TencentAdapter::new(&AdapterContext {
            oauth: OAuthApps::disabled(),
            regions: Arc::new(StaticRegions::with_defaults()),
            probe: ProbeConfig::default(),
        });
        let credential = Credential::Tencent(S3KeyCredential {
            access_key: SecretString::new("id"),
            secret_key: SecretString::new("key"),
            bucket: "backups-125000000".into(),
            prefix: None,
            no_delete: false,
            region: Some("ap-singapore".into()),
            endpoint: None,
        });

        assert_eq!(
            adapter.endpoint(&credential).unwrap(),
            "backups-125000000.cos.ap-singapore.myqcloud.com"
        );
    }
}
