//! Leviia object storage adapter. Fixed endpoint, "auto" signing region.

use async_trait::async_trait;

use backupsheep_common::SecretString;

use crate::config::ProbeConfig;
use crate::credential::{Credential, PlainCredential, S3KeyCredential};
use crate::error::{Result, StorageError};
use crate::provider::{ObjectClient, ProviderKind, StorageAdapter};
use crate::registry::AdapterContext;
use crate::s3::{S3CompatClient, S3Settings};

const LEVIIA_ENDPOINT: &str = "s3.leviia.com";

pub struct LeviiaAdapter {
    timeouts: ProbeConfig,
}

impl LeviiaAdapter {
    pub fn new(ctx: &AdapterContext) -> Self {
        Self { timeouts: ctx.probe }
    }

    fn fields<'a>(&self, credential: &'a PlainCredential) -> Result<&'a S3KeyCredential<SecretString>> {
        match credential {
            Credential::Leviia(fields) => Ok(fields),
            other => Err(StorageError::NoCredentialBound(format!(
                "expected leviia credential, found {}",
                other.kind()
            ))),
        }
    }
}

#[async_trait]
impl StorageAdapter for LeviiaAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Leviia
    }

    fn endpoint(&self, _credential: &PlainCredential) -> Result<String> {
        Ok(LEVIIA_ENDPOINT.to_string())
    }

    async fn build_client(&self, credential: &PlainCredential) -> Result<Box<dyn ObjectClient>> {
        let fields = self.fields(credential)?;
        Ok(Box::new(S3CompatClient::connect(
            &fields.access_key,
            &fields.secret_key,
            &fields.bucket,
            S3Settings::compatible(LEVIIA_ENDPOINT, "auto"),
            &self.timeouts,
        )))
    }
}
