//! Azure Blob Storage adapter.
//!
//! Authenticates with a storage-account connection string; read-back
//! verification fetches a presigned (SAS-style) URL over plain HTTPS and
//! compares the decoded bytes against the uploaded payload.

use std::collections::HashMap;

use async_trait::async_trait;
use opendal::{services, Operator};

use backupsheep_common::SecretString;

use crate::blob::{BlobClient, ReadBack};
use crate::config::ProbeConfig;
use crate::credential::{AzureCredential, Credential, PlainCredential};
use crate::error::{Result, StorageError};
use crate::provider::{ObjectClient, ProviderKind, StorageAdapter};
use crate::registry::AdapterContext;

/// Pieces of an Azure storage connection string this adapter consumes.
#[derive(Debug, PartialEq, Eq)]
struct ConnectionString {
    account_name: String,
    account_key: String,
    blob_endpoint: String,
}

fn parse_connection_string(raw: &str) -> Result<ConnectionString> {
    let mut parts = HashMap::new();
    for piece in raw.split(';').filter(|p| !p.is_empty()) {
        let (key, value) = piece.split_once('=').ok_or_else(|| {
            StorageError::InvalidInput("malformed azure connection string".to_string())
        })?;
        parts.insert(key.trim(), value.trim());
    }

    let account_name = parts
        .get("AccountName")
        .ok_or_else(|| StorageError::InvalidInput("connection string missing AccountName".to_string()))?
        .to_string();
    let account_key = parts
        .get("AccountKey")
        .ok_or_else(|| StorageError::InvalidInput("connection string missing AccountKey".to_string()))?
        .to_string();

    let blob_endpoint = match parts.get("BlobEndpoint") {
        Some(endpoint) => endpoint.to_string(),
        None => {
            let suffix = parts.get("EndpointSuffix").unwrap_or(&"core.windows.net");
            format!("https://{}.blob.{}", account_name, suffix)
        }
    };

    Ok(ConnectionString {
        account_name,
        account_key,
        blob_endpoint,
    })
}

pub struct AzureAdapter {
    timeouts: ProbeConfig,
}

impl AzureAdapter {
    pub fn new(ctx: &AdapterContext) -> Self {
        Self { timeouts: ctx.probe }
    }

    fn fields<'a>(&self, credential: &'a PlainCredential) -> Result<&'a AzureCredential<SecretString>> {
        match credential {
            Credential::Azure(fields) => Ok(fields),
            other => Err(StorageError::NoCredentialBound(format!(
                "expected azure credential, found {}",
                other.kind()
            ))),
        }
    }
}

#[async_trait]
impl StorageAdapter for AzureAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Azure
    }

    fn endpoint(&self, credential: &PlainCredential) -> Result<String> {
        let fields = self.fields(credential)?;
        let parsed = parse_connection_string(fields.connection_string.expose())?;
        Ok(parsed
            .blob_endpoint
            .trim_start_matches("https://")
            .to_string())
    }

    async fn build_client(&self, credential: &PlainCredential) -> Result<Box<dyn ObjectClient>> {
        let fields = self.fields(credential)?;
        let parsed = parse_connection_string(fields.connection_string.expose())?;

        let builder = services::Azblob::default()
            .endpoint(&parsed.blob_endpoint)
            .account_name(&parsed.account_name)
            .account_key(&parsed.account_key)
            .container(&fields.container);

        let operator = Operator::new(builder)
            .map_err(|e| StorageError::InvalidInput(format!("azblob config: {}", e)))?
            .finish();

        Ok(Box::new(BlobClient::new(
            operator,
            ReadBack::PresignedUrl,
            &self.timeouts,
        )?))
    }
}
