//! pCloud adapter.
//!
//! pCloud hands out long-lived OAuth tokens bound to a regional API host
//! (api.pcloud.com or eapi.pcloud.com), so there is no refresh flow. Probe
//! objects live in a `/validate` folder which is created up front; uploads
//! return numeric file ids that are carried through read-back (via a
//! download link) and delete.

use async_trait::async_trait;
use reqwest::header;
use serde::Deserialize;

use backupsheep_common::SecretString;

use crate::config::ProbeConfig;
use crate::credential::{Credential, PCloudCredential, PlainCredential};
use crate::error::{Result, StorageError};
use crate::provider::{
    DeleteReceipt, ObjectClient, ProviderKind, PutReceipt, StorageAdapter,
};
use crate::registry::AdapterContext;
use crate::rest;

const VALIDATE_FOLDER: &str = "/validate";

pub struct PCloudAdapter {
    timeouts: ProbeConfig,
}

impl PCloudAdapter {
    pub fn new(ctx: &AdapterContext) -> Self {
        Self { timeouts: ctx.probe }
    }

    fn fields<'a>(&self, credential: &'a PlainCredential) -> Result<&'a PCloudCredential<SecretString>> {
        match credential {
            Credential::PCloud(fields) => Ok(fields),
            other => Err(StorageError::NoCredentialBound(format!(
                "expected pcloud credential, found {}",
                other.kind()
            ))),
        }
    }
}

#[async_trait]
impl StorageAdapter for PCloudAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::PCloud
    }

    fn endpoint(&self, credential: &PlainCredential) -> Result<String> {
        Ok(self.fields(credential)?.hostname.clone())
    }

    async fn build_client(&self, credential: &PlainCredential) -> Result<Box<dyn ObjectClient>> {
        let fields = self.fields(credential)?;
        let client = PCloudClient::new(
            fields.access_token.clone(),
            fields.hostname.clone(),
            &self.timeouts,
        )?;
        client.ensure_validate_folder().await?;
        Ok(Box::new(client))
    }
}

/// pCloud result envelope: `result` is 0 on success, an error code
/// otherwise. Codes in the 1xxx/2xxx range are login/token problems.
fn check_result(operation: &str, result: u64, error: Option<&str>) -> Result<()> {
    if result == 0 {
        return Ok(());
    }
    let detail = format!(
        "pcloud {}: result {} {}",
        operation,
        result,
        error.unwrap_or("")
    );
    if (1000..3000).contains(&result) {
        Err(StorageError::Auth(detail))
    } else {
        Err(StorageError::Connection(detail))
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    result: u64,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    result: u64,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    metadata: Vec<UploadMetadata>,
}

#[derive(Debug, Deserialize)]
struct UploadMetadata {
    fileid: u64,
}

#[derive(Debug, Deserialize)]
struct LinkResponse {
    result: u64,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    hosts: Vec<String>,
    #[serde(default)]
    path: Option<String>,
}

pub struct PCloudClient {
    http: reqwest::Client,
    access_token: SecretString,
    hostname: String,
}

impl PCloudClient {
    pub fn new(access_token: SecretString, hostname: String, timeouts: &ProbeConfig) -> Result<Self> {
        Ok(Self {
            http: rest::http_client(timeouts)?,
            access_token,
            hostname,
        })
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.access_token.expose())
    }

    fn api_url(&self, method: &str) -> String {
        format!("https://{}/{}", self.hostname, method)
    }

    /// Create the probe folder if it does not exist yet.
    async fn ensure_validate_folder(&self) -> Result<()> {
        let response = self
            .http
            .post(self.api_url("createfolderifnotexists"))
            .header(header::AUTHORIZATION, self.auth_header())
            .query(&[("path", VALIDATE_FOLDER)])
            .send()
            .await
            .map_err(|e| StorageError::Connection(format!("pcloud folder create: {}", e)))?;

        let response =
            rest::require_success(ProviderKind::PCloud, "folder create", response).await?;
        let envelope: Envelope = response
            .json()
            .await
            .map_err(|e| StorageError::Connection(format!("pcloud folder response: {}", e)))?;
        check_result("folder create", envelope.result, envelope.error.as_deref())
    }

    fn file_id(receipt: &PutReceipt) -> Result<u64> {
        receipt
            .remote_id
            .as_deref()
            .and_then(|id| id.parse().ok())
            .ok_or_else(|| {
                StorageError::Connection("pcloud upload returned no file id".to_string())
            })
    }
}

#[async_trait]
impl ObjectClient for PCloudClient {
    async fn put_object(&self, key: &str, body: &[u8]) -> Result<PutReceipt> {
        // Multipart form upload, one file part named after the probe key.
        let boundary = "backupsheep_boundary";
        let mut payload = Vec::new();
        payload.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        payload.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
                key
            )
            .as_bytes(),
        );
        payload.extend_from_slice(b"Content-Type: text/plain\r\n\r\n");
        payload.extend_from_slice(body);
        payload.extend_from_slice(b"\r\n");
        payload.extend_from_slice(format!("--{}--", boundary).as_bytes());

        let response = self
            .http
            .post(self.api_url("uploadfile"))
            .header(header::AUTHORIZATION, self.auth_header())
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .query(&[("path", VALIDATE_FOLDER), ("nopartial", "1")])
            .body(payload)
            .send()
            .await
            .map_err(|e| StorageError::Connection(format!("pcloud upload: {}", e)))?;

        let response = rest::require_success(ProviderKind::PCloud, "upload", response).await?;
        let upload: UploadResponse = response
            .json()
            .await
            .map_err(|e| StorageError::Connection(format!("pcloud upload response: {}", e)))?;
        check_result("upload", upload.result, upload.error.as_deref())?;

        let metadata = upload.metadata.first().ok_or_else(|| {
            StorageError::Connection("pcloud upload returned no metadata".to_string())
        })?;

        Ok(PutReceipt {
            etag: None,
            remote_id: Some(metadata.fileid.to_string()),
        })
    }

    async fn fetch_object(&self, _key: &str, receipt: &PutReceipt) -> Result<Vec<u8>> {
        let file_id = Self::file_id(receipt)?;

        let response = self
            .http
            .get(self.api_url("getfilelink"))
            .header(header::AUTHORIZATION, self.auth_header())
            .query(&[("fileid", file_id.to_string().as_str()), ("forcedownload", "1")])
            .send()
            .await
            .map_err(|e| StorageError::Connection(format!("pcloud link: {}", e)))?;

        let response = rest::require_success(ProviderKind::PCloud, "link", response).await?;
        let link: LinkResponse = response
            .json()
            .await
            .map_err(|e| StorageError::Connection(format!("pcloud link response: {}", e)))?;
        check_result("link", link.result, link.error.as_deref())?;

        let host = link
            .hosts
            .first()
            .ok_or_else(|| StorageError::Connection("pcloud link has no hosts".to_string()))?;
        let path = link
            .path
            .as_deref()
            .ok_or_else(|| StorageError::Connection("pcloud link has no path".to_string()))?;

        let download = self
            .http
            .get(format!("https://{}{}", host, path))
            .send()
            .await
            .map_err(|e| StorageError::Connection(format!("pcloud download: {}", e)))?;

        let download = rest::require_success(ProviderKind::PCloud, "download", download).await?;
        Ok(download
            .bytes()
            .await
            .map_err(|e| StorageError::Connection(format!("pcloud download body: {}", e)))?
            .to_vec())
    }

    async fn delete_object(&self, _key: &str, receipt: &PutReceipt) -> Result<DeleteReceipt> {
        let file_id = Self::file_id(receipt)?;

        let response = self
            .http
            .post(self.api_url("deletefile"))
            .header(header::AUTHORIZATION, self.auth_header())
            .query(&[("fileid", file_id.to_string().as_str())])
            .send()
            .await
            .map_err(|e| StorageError::Connection(format!("pcloud delete: {}", e)))?;

        let response = rest::require_success(ProviderKind::PCloud, "delete", response).await?;
        let envelope: Envelope = response
            .json()
            .await
            .map_err(|e| StorageError::Connection(format!("pcloud delete response: {}", e)))?;

        Ok(DeleteReceipt {
            acknowledged: envelope.result == 0,
            status: Some(200),
        })
    }
}
