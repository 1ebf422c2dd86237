//! Shared client for vendor blob stores driven through OpenDAL.
//!
//! Azure Blob, Google Cloud Storage, Tencent COS and Alibaba OSS use their
//! native protocols rather than S3 signing. Read-back verification for
//! these providers goes through a presigned GET URL fetched over plain
//! HTTPS and compared byte-for-byte against the uploaded payload, the same
//! way a user-shared link would be consumed.

use std::time::Duration;

use async_trait::async_trait;
use opendal::{ErrorKind, Operator};

use crate::config::ProbeConfig;
use crate::error::{Result, StorageError};
use crate::provider::{DeleteReceipt, ObjectClient, PutReceipt};

/// How long presigned read-back URLs stay valid.
const PRESIGN_TTL: Duration = Duration::from_secs(120);

/// How the uploaded object is read back for verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadBack {
    /// Authenticated read through the operator.
    Direct,
    /// Fetch a presigned GET URL over plain HTTPS.
    PresignedUrl,
}

/// OpenDAL-backed [`ObjectClient`], bound to one container/bucket.
pub struct BlobClient {
    operator: Operator,
    read_back: ReadBack,
    http: reqwest::Client,
}

impl BlobClient {
    pub fn new(operator: Operator, read_back: ReadBack, timeouts: &ProbeConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(timeouts.connect_timeout)
            .timeout(timeouts.op_timeout)
            .build()
            .map_err(|e| StorageError::Connection(format!("http client: {}", e)))?;

        Ok(Self {
            operator,
            read_back,
            http,
        })
    }
}

fn map_opendal_err(operation: &str, err: opendal::Error) -> StorageError {
    let detail = format!("{}: {}", operation, err);
    match err.kind() {
        ErrorKind::PermissionDenied => StorageError::Auth(detail),
        ErrorKind::ConfigInvalid => StorageError::InvalidInput(detail),
        _ => StorageError::Connection(detail),
    }
}

#[async_trait]
impl ObjectClient for BlobClient {
    async fn put_object(&self, key: &str, body: &[u8]) -> Result<PutReceipt> {
        let metadata = self
            .operator
            .write(key, body.to_vec())
            .await
            .map_err(|e| map_opendal_err("write", e))?;

        Ok(PutReceipt {
            etag: metadata.etag().map(str::to_string),
            remote_id: None,
        })
    }

    async fn fetch_object(&self, key: &str, _receipt: &PutReceipt) -> Result<Vec<u8>> {
        match self.read_back {
            ReadBack::Direct => Ok(self
                .operator
                .read(key)
                .await
                .map_err(|e| map_opendal_err("read", e))?
                .to_vec()),
            ReadBack::PresignedUrl => {
                let presigned = self
                    .operator
                    .presign_read(key, PRESIGN_TTL)
                    .await
                    .map_err(|e| map_opendal_err("presign", e))?;

                let response = self
                    .http
                    .get(presigned.uri().to_string())
                    .send()
                    .await
                    .map_err(|e| StorageError::Connection(format!("signed URL fetch: {}", e)))?;

                if !response.status().is_success() {
                    return Err(StorageError::Connection(format!(
                        "signed URL fetch returned {}",
                        response.status()
                    )));
                }

                Ok(response
                    .bytes()
                    .await
                    .map_err(|e| StorageError::Connection(format!("signed URL body: {}", e)))?
                    .to_vec())
            }
        }
    }

    async fn delete_object(&self, key: &str, _receipt: &PutReceipt) -> Result<DeleteReceipt> {
        self.operator
            .delete(key)
            .await
            .map_err(|e| map_opendal_err("delete", e))?;

        Ok(DeleteReceipt {
            acknowledged: true,
            status: None,
        })
    }
}
