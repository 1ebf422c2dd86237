//! Google Cloud Storage adapter.
//!
//! Authenticates with a service-account key JSON blob; read-back
//! verification fetches a signed URL, mirroring how shared downloads are
//! consumed.

use async_trait::async_trait;
use opendal::{services, Operator};

use backupsheep_common::SecretString;

use crate::blob::{BlobClient, ReadBack};
use crate::config::ProbeConfig;
use crate::credential::{Credential, GoogleCloudCredential, PlainCredential};
use crate::error::{Result, StorageError};
use crate::provider::{ObjectClient, ProviderKind, StorageAdapter};
use crate::registry::AdapterContext;

const GCS_ENDPOINT: &str = "storage.googleapis.com";

pub struct GoogleCloudAdapter {
    timeouts: ProbeConfig,
}

impl GoogleCloudAdapter {
    pub fn new(ctx: &AdapterContext) -> Self {
        Self { timeouts: ctx.probe }
    }

    fn fields<'a>(&self, credential: &'a PlainCredential) -> Result<&'a GoogleCloudCredential<SecretString>> {
        match credential {
            Credential::GoogleCloud(fields) => Ok(fields),
            other => Err(StorageError::NoCredentialBound(format!(
                "expected google_cloud credential, found {}",
                other.kind()
            ))),
        }
    }

    /// The service key must at least parse as a JSON object before it is
    /// handed to the transport.
    fn check_service_key(&self, fields: &GoogleCloudCredential<SecretString>) -> Result<()> {
        serde_json::from_str::<serde_json::Value>(fields.service_key.expose())
            .map(|_| ())
            .map_err(|e| StorageError::InvalidInput(format!("service key is not valid JSON: {}", e)))
    }
}

#[async_trait]
impl StorageAdapter for GoogleCloudAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::GoogleCloud
    }

    fn endpoint(&self, _credential: &PlainCredential) -> Result<String> {
        Ok(GCS_ENDPOINT.to_string())
    }

    async fn build_client(&self, credential: &PlainCredential) -> Result<Box<dyn ObjectClient>> {
        let fields = self.fields(credential)?;
        self.check_service_key(fields)?;

        let builder = services::Gcs::default()
            .bucket(&fields.bucket)
            .credential(fields.service_key.expose());

        let operator = Operator::new(builder)
            .map_err(|e| StorageError::InvalidInput(format!("gcs config: {}", e)))?
            .finish();

        Ok(Box::new(BlobClient::new(
            operator,
            ReadBack::PresignedUrl,
            &self.timeouts,
        )?))
    }
}
