//! IDrive e2 adapter. The endpoint is assigned per account and stored on
//! the credential.

use async_trait::async_trait;

use backupsheep_common::SecretString;

use crate::config::ProbeConfig;
use crate::credential::{Credential, PlainCredential, S3KeyCredential};
use crate::error::{Result, StorageError};
use crate::provider::{ObjectClient, ProviderKind, StorageAdapter};
use crate::registry::AdapterContext;
use crate::s3::{S3CompatClient, S3Settings};

pub struct IDriveAdapter {
    timeouts: ProbeConfig,
}

impl IDriveAdapter {
    pub fn new(ctx: &AdapterContext) -> Self {
        Self { timeouts: ctx.probe }
    }

    fn fields<'a>(&self, credential: &'a PlainCredential) -> Result<&'a S3KeyCredential<SecretString>> {
        match credential {
            Credential::IDrive(fields) => Ok(fields),
            other => Err(StorageError::NoCredentialBound(format!(
                "expected idrive credential, found {}",
                other.kind()
            ))),
        }
    }
}

#[async_trait]
impl StorageAdapter for IDriveAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::IDrive
    }

    fn endpoint(&self, credential: &PlainCredential) -> Result<String> {
        let fields = self.fields(credential)?;
        fields
            .endpoint
            .clone()
            .ok_or_else(|| StorageError::InvalidInput("idrive endpoint is required".to_string()))
    }

    async fn build_client(&self, credential: &PlainCredential) -> Result<Box<dyn ObjectClient>> {
        let fields = self.fields(credential)?;
        let endpoint = self.endpoint(credential)?;
        Ok(Box::new(S3CompatClient::connect(
            &fields.access_key,
            &fields.secret_key,
            &fields.bucket,
            S3Settings::compatible(&endpoint, "us-east-1"),
            &self.timeouts,
        )))
    }
}
