//! Oracle Cloud Object Storage adapter (S3 compatibility endpoint).
//!
//! Endpoint template: `{namespace}.compat.objectstorage.{region}.oraclecloud.com`.

use async_trait::async_trait;

use backupsheep_common::SecretString;

use crate::config::ProbeConfig;
use crate::credential::{Credential, OracleCredential, PlainCredential};
use crate::error::{Result, StorageError};
use crate::provider::{ObjectClient, ProviderKind, StorageAdapter};
use crate::registry::AdapterContext;
use crate::s3::{S3CompatClient, S3Settings};

pub struct OracleAdapter {
    timeouts: ProbeConfig,
}

impl OracleAdapter {
    pub fn new(ctx: &AdapterContext) -> Self {
        Self { timeouts: ctx.probe }
    }

    fn fields<'a>(&self, credential: &'a PlainCredential) -> Result<&'a OracleCredential<SecretString>> {
        match credential {
            Credential::Oracle(fields) => Ok(fields),
            other => Err(StorageError::NoCredentialBound(format!(
                "expected oracle credential, found {}",
                other.kind()
            ))),
        }
    }
}

#[async_trait]
impl StorageAdapter for OracleAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Oracle
    }

    fn endpoint(&self, credential: &PlainCredential) -> Result<String> {
        let fields = self.fields(credential)?;
        Ok(format!(
            "{}.compat.objectstorage.{}.oraclecloud.com",
            fields.namespace, fields.region
        ))
    }

    async fn build_client(&self, credential: &PlainCredential) -> Result<Box<dyn ObjectClient>> {
        let fields = self.fields(credential)?;
        let endpoint = self.endpoint(credential)?;
        Ok(Box::new(S3CompatClient::connect(
            &fields.access_key,
            &fields.secret_key,
            &fields.bucket,
            S3Settings::compatible(&endpoint, &fields.region),
            &self.timeouts,
        )))
    }
}
