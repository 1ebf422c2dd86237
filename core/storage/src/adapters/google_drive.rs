//! Google Drive adapter: Drive v3 REST API plus OAuth refresh.
//!
//! Probe objects live in a `BackupSheep` folder at the drive root; the
//! folder is found or created when the client is built. Drive addresses
//! objects by id, so the id from upload is carried through read-back and
//! delete in the put receipt.

use async_trait::async_trait;
use reqwest::header;
use serde::Deserialize;

use backupsheep_common::SecretString;

use crate::config::ProbeConfig;
use crate::credential::{Credential, OAuthCredential, PlainCredential};
use crate::error::{Result, StorageError};
use crate::oauth::OAuthRefresher;
use crate::provider::{
    DeleteReceipt, ObjectClient, ProviderKind, PutReceipt, StorageAdapter, TokenRefresher,
};
use crate::registry::AdapterContext;
use crate::rest;

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

const FOLDER_NAME: &str = "BackupSheep";
const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

pub struct GoogleDriveAdapter {
    refresher: OAuthRefresher,
    timeouts: ProbeConfig,
}

impl GoogleDriveAdapter {
    pub fn new(ctx: &AdapterContext) -> Result<Self> {
        Ok(Self {
            refresher: OAuthRefresher::new(
                ProviderKind::GoogleDrive,
                &ctx.oauth.google,
                AUTH_URL,
                TOKEN_URL,
            )?,
            timeouts: ctx.probe,
        })
    }

    fn fields<'a>(&self, credential: &'a PlainCredential) -> Result<&'a OAuthCredential<SecretString>> {
        match credential {
            Credential::GoogleDrive(fields) => Ok(fields),
            other => Err(StorageError::NoCredentialBound(format!(
                "expected google_drive credential, found {}",
                other.kind()
            ))),
        }
    }
}

#[async_trait]
impl StorageAdapter for GoogleDriveAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::GoogleDrive
    }

    fn endpoint(&self, _credential: &PlainCredential) -> Result<String> {
        Ok("www.googleapis.com".to_string())
    }

    async fn build_client(&self, credential: &PlainCredential) -> Result<Box<dyn ObjectClient>> {
        let fields = self.fields(credential)?;
        let client = DriveClient::new(fields.access_token.clone(), &self.timeouts)?;
        let folder_id = client.ensure_folder().await?;
        Ok(Box::new(client.into_folder(folder_id)))
    }

    fn token_refresh(&self) -> Option<&dyn TokenRefresher> {
        Some(&self.refresher)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    #[serde(default)]
    md5_checksum: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

pub struct DriveClient {
    http: reqwest::Client,
    access_token: SecretString,
    folder_id: String,
}

impl DriveClient {
    fn new(access_token: SecretString, timeouts: &ProbeConfig) -> Result<Self> {
        Ok(Self {
            http: rest::http_client(timeouts)?,
            access_token,
            folder_id: String::new(),
        })
    }

    fn into_folder(mut self, folder_id: String) -> Self {
        self.folder_id = folder_id;
        self
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.access_token.expose())
    }

    /// Find the destination folder, creating it if absent.
    async fn ensure_folder(&self) -> Result<String> {
        let query = format!(
            "name = '{}' and trashed = false and mimeType = '{}'",
            FOLDER_NAME, FOLDER_MIME
        );

        let response = self
            .http
            .get(format!("{}/files", DRIVE_API_BASE))
            .header(header::AUTHORIZATION, self.auth_header())
            .query(&[("q", query.as_str()), ("fields", "files(id,name)")])
            .send()
            .await
            .map_err(|e| StorageError::Connection(format!("drive folder lookup: {}", e)))?;

        let response =
            rest::require_success(ProviderKind::GoogleDrive, "folder lookup", response).await?;
        let list: FileList = response
            .json()
            .await
            .map_err(|e| StorageError::Connection(format!("drive folder lookup response: {}", e)))?;

        if let Some(folder) = list.files.into_iter().next() {
            return Ok(folder.id);
        }

        let response = self
            .http
            .post(format!("{}/files", DRIVE_API_BASE))
            .header(header::AUTHORIZATION, self.auth_header())
            .header(header::CONTENT_TYPE, "application/json")
            .query(&[("fields", "id")])
            .json(&serde_json::json!({
                "name": FOLDER_NAME,
                "mimeType": FOLDER_MIME,
            }))
            .send()
            .await
            .map_err(|e| StorageError::Connection(format!("drive folder create: {}", e)))?;

        let response =
            rest::require_success(ProviderKind::GoogleDrive, "folder create", response).await?;
        let folder: DriveFile = response
            .json()
            .await
            .map_err(|e| StorageError::Connection(format!("drive folder create response: {}", e)))?;
        Ok(folder.id)
    }

    fn remote_id<'a>(receipt: &'a PutReceipt) -> Result<&'a str> {
        receipt.remote_id.as_deref().ok_or_else(|| {
            StorageError::Connection("drive object has no file id from upload".to_string())
        })
    }
}

#[async_trait]
impl ObjectClient for DriveClient {
    async fn put_object(&self, key: &str, body: &[u8]) -> Result<PutReceipt> {
        let metadata = serde_json::json!({
            "name": key,
            "mimeType": "text/plain",
            "parents": [self.folder_id],
        })
        .to_string();

        // Multipart/related body: metadata part then media part.
        let boundary = "backupsheep_boundary";
        let mut payload = Vec::new();
        payload.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        payload.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
        payload.extend_from_slice(metadata.as_bytes());
        payload.extend_from_slice(b"\r\n");
        payload.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        payload.extend_from_slice(b"Content-Type: text/plain\r\n\r\n");
        payload.extend_from_slice(body);
        payload.extend_from_slice(b"\r\n");
        payload.extend_from_slice(format!("--{}--", boundary).as_bytes());

        let response = self
            .http
            .post(format!("{}/files?uploadType=multipart", DRIVE_UPLOAD_BASE))
            .header(header::AUTHORIZATION, self.auth_header())
            .header(
                header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .query(&[("fields", "id,md5Checksum")])
            .body(payload)
            .send()
            .await
            .map_err(|e| StorageError::Connection(format!("drive upload: {}", e)))?;

        let response = rest::require_success(ProviderKind::GoogleDrive, "upload", response).await?;
        let file: DriveFile = response
            .json()
            .await
            .map_err(|e| StorageError::Connection(format!("drive upload response: {}", e)))?;

        Ok(PutReceipt {
            etag: file.md5_checksum,
            remote_id: Some(file.id),
        })
    }

    async fn fetch_object(&self, _key: &str, receipt: &PutReceipt) -> Result<Vec<u8>> {
        let file_id = Self::remote_id(receipt)?;

        let response = self
            .http
            .get(format!("{}/files/{}", DRIVE_API_BASE, file_id))
            .header(header::AUTHORIZATION, self.auth_header())
            .query(&[("alt", "media")])
            .send()
            .await
            .map_err(|e| StorageError::Connection(format!("drive download: {}", e)))?;

        let response =
            rest::require_success(ProviderKind::GoogleDrive, "download", response).await?;
        Ok(response
            .bytes()
            .await
            .map_err(|e| StorageError::Connection(format!("drive download body: {}", e)))?
            .to_vec())
    }

    async fn delete_object(&self, _key: &str, receipt: &PutReceipt) -> Result<DeleteReceipt> {
        let file_id = Self::remote_id(receipt)?;

        let response = self
            .http
            .delete(format!("{}/files/{}", DRIVE_API_BASE, file_id))
            .header(header::AUTHORIZATION, self.auth_header())
            .send()
            .await
            .map_err(|e| StorageError::Connection(format!("drive delete: {}", e)))?;

        let status = response.status().as_u16();
        rest::require_success(ProviderKind::GoogleDrive, "delete", response).await?;

        // Drive acknowledges deletion with 204 No Content.
        Ok(DeleteReceipt {
            acknowledged: status == 204,
            status: Some(status),
        })
    }
}
