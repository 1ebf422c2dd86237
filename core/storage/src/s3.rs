//! Shared client for S3-compatible destinations.
//!
//! Seventeen of the supported providers speak the S3 wire protocol and
//! differ only in endpoint, region naming and signing details; they all
//! funnel through this one client. One client is constructed per probe and
//! bound to a single bucket.

use async_trait::async_trait;
use aws_sdk_s3::config::timeout::TimeoutConfig;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

use backupsheep_common::SecretString;

use crate::config::ProbeConfig;
use crate::error::{Result, StorageError};
use crate::provider::{DeleteReceipt, ObjectClient, PutReceipt};

/// Per-provider S3 dialect settings.
#[derive(Debug, Clone)]
pub struct S3Settings {
    /// Endpoint host; `None` means AWS itself.
    pub endpoint: Option<String>,
    /// Region name passed to the signer. Cloudflare and Leviia expect the
    /// literal "auto".
    pub region: String,
    /// Path-style addressing, required by most non-AWS endpoints.
    pub force_path_style: bool,
}

impl S3Settings {
    /// Settings for AWS itself.
    pub fn aws(region: Option<&str>) -> Self {
        Self {
            endpoint: None,
            region: region.unwrap_or("us-east-1").to_string(),
            force_path_style: false,
        }
    }

    /// Settings for an S3-compatible endpoint host.
    pub fn compatible(endpoint: &str, region: &str) -> Self {
        Self {
            endpoint: Some(endpoint.to_string()),
            region: region.to_string(),
            force_path_style: true,
        }
    }
}

/// S3-compatible [`ObjectClient`], bound to one bucket.
pub struct S3CompatClient {
    client: Client,
    bucket: String,
}

impl S3CompatClient {
    /// Build a client for one destination. Does not touch the network; the
    /// first request does.
    pub fn connect(
        access_key: &SecretString,
        secret_key: &SecretString,
        bucket: &str,
        settings: S3Settings,
        timeouts: &ProbeConfig,
    ) -> Self {
        let credentials = Credentials::new(
            access_key.expose(),
            secret_key.expose(),
            None,
            None,
            "backupsheep",
        );

        let timeout_config = TimeoutConfig::builder()
            .connect_timeout(timeouts.connect_timeout)
            .operation_timeout(timeouts.op_timeout)
            .build();

        let mut config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(settings.region))
            .timeout_config(timeout_config)
            .force_path_style(settings.force_path_style);

        if let Some(host) = settings.endpoint {
            config = config.endpoint_url(format!("https://{}", host));
        }

        Self {
            client: Client::from_conf(config.build()),
            bucket: bucket.to_string(),
        }
    }
}

fn map_sdk_err<E>(operation: &str, err: SdkError<E>) -> StorageError
where
    E: std::error::Error + Send + Sync + 'static,
{
    let status = err.raw_response().map(|r| r.status().as_u16());
    let detail = format!("{}: {}", operation, DisplayErrorContext(&err));

    match status {
        Some(401) | Some(403) => StorageError::Auth(detail),
        _ => StorageError::Connection(detail),
    }
}

#[async_trait]
impl ObjectClient for S3CompatClient {
    async fn put_object(&self, key: &str, body: &[u8]) -> Result<PutReceipt> {
        let output = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body.to_vec()))
            .content_type("text/plain")
            .send()
            .await
            .map_err(|e| map_sdk_err("put_object", e))?;

        Ok(PutReceipt {
            etag: output.e_tag().map(str::to_string),
            remote_id: None,
        })
    }

    async fn fetch_object(&self, key: &str, _receipt: &PutReceipt) -> Result<Vec<u8>> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| map_sdk_err("get_object", e))?;

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Connection(format!("get_object body: {}", e)))?
            .into_bytes();

        Ok(bytes.to_vec())
    }

    async fn delete_object(&self, key: &str, _receipt: &PutReceipt) -> Result<DeleteReceipt> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| map_sdk_err("delete_object", e))?;

        // S3-compatible deletes acknowledge with HTTP 204; the SDK only
        // returns Ok once it has seen it.
        Ok(DeleteReceipt {
            acknowledged: true,
            status: Some(204),
        })
    }
}
