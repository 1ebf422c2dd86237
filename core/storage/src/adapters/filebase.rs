//! Filebase adapter. Single fixed endpoint regardless of region.

use async_trait::async_trait;

use backupsheep_common::SecretString;

use crate::config::ProbeConfig;
use crate::credential::{Credential, PlainCredential, S3KeyCredential};
use crate::error::{Result, StorageError};
use crate::provider::{ObjectClient, ProviderKind, StorageAdapter};
use crate::registry::AdapterContext;
use crate::s3::{S3CompatClient, S3Settings};

const FILEBASE_ENDPOINT: &str = "s3.filebase.com";

pub struct FilebaseAdapter {
    timeouts: ProbeConfig,
}

impl FilebaseAdapter {
    pub fn new(ctx: &AdapterContext) -> Self {
        Self { timeouts: ctx.probe }
    }

    fn fields<'a>(&self, credential: &'a PlainCredential) -> Result<&'a S3KeyCredential<SecretString>> {
        match credential {
            Credential::Filebase(fields) => Ok(fields),
            other => Err(StorageError::NoCredentialBound(format!(
                "expected filebase credential, found {}",
                other.kind()
            ))),
        }
    }
}

#[async_trait]
impl StorageAdapter for FilebaseAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Filebase
    }

    fn endpoint(&self, _credential: &PlainCredential) -> Result<String> {
        Ok(FILEBASE_ENDPOINT.to_string())
    }

    async fn build_client(&self, credential: &PlainCredential) -> Result<Box<dyn ObjectClient>> {
        let fields = self.fields(credential)?;
        Ok(Box::new(S3CompatClient::connect(
            &fields.access_key,
            &fields.secret_key,
            &fields.bucket,
            S3Settings::compatible(FILEBASE_ENDPOINT, "us-east-1"),
            &self.timeouts,
        )))
    }
}
