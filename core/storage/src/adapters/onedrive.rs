//! Microsoft OneDrive adapter: Graph API plus OAuth refresh.
//!
//! Probe objects are written under `backupsheep/` in the drive recorded on
//! the credential. Graph addresses items by id after upload, so the id is
//! carried in the put receipt.

use async_trait::async_trait;
use reqwest::header;
use serde::Deserialize;

use backupsheep_common::SecretString;

use crate::config::ProbeConfig;
use crate::credential::{Credential, OneDriveCredential, PlainCredential};
use crate::error::{Result, StorageError};
use crate::oauth::OAuthRefresher;
use crate::provider::{
    DeleteReceipt, ObjectClient, ProviderKind, PutReceipt, StorageAdapter, TokenRefresher,
};
use crate::registry::AdapterContext;
use crate::rest;

const AUTH_URL: &str = "https://login.microsoftonline.com/common/oauth2/v2.0/authorize";
const TOKEN_URL: &str = "https://login.microsoftonline.com/common/oauth2/v2.0/token";
const GRAPH_BASE: &str = "https://graph.microsoft.com/v1.0";

pub struct OneDriveAdapter {
    refresher: OAuthRefresher,
    timeouts: ProbeConfig,
}

impl OneDriveAdapter {
    pub fn new(ctx: &AdapterContext) -> Result<Self> {
        Ok(Self {
            refresher: OAuthRefresher::new(
                ProviderKind::OneDrive,
                &ctx.oauth.microsoft,
                AUTH_URL,
                TOKEN_URL,
            )?,
            timeouts: ctx.probe,
        })
    }

    fn fields<'a>(&self, credential: &'a PlainCredential) -> Result<&'a OneDriveCredential<SecretString>> {
        match credential {
            Credential::OneDrive(fields) => Ok(fields),
            other => Err(StorageError::NoCredentialBound(format!(
                "expected onedrive credential, found {}",
                other.kind()
            ))),
        }
    }
}

#[async_trait]
impl StorageAdapter for OneDriveAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OneDrive
    }

    fn endpoint(&self, _credential: &PlainCredential) -> Result<String> {
        Ok("graph.microsoft.com".to_string())
    }

    async fn build_client(&self, credential: &PlainCredential) -> Result<Box<dyn ObjectClient>> {
        let fields = self.fields(credential)?;
        if fields.drive_id.is_empty() {
            return Err(StorageError::InvalidInput(
                "onedrive drive id is required".to_string(),
            ));
        }
        Ok(Box::new(OneDriveClient::new(
            fields.access_token.clone(),
            fields.drive_id.clone(),
            &self.timeouts,
        )?))
    }

    fn token_refresh(&self) -> Option<&dyn TokenRefresher> {
        Some(&self.refresher)
    }
}

#[derive(Debug, Deserialize)]
struct DriveItem {
    id: String,
    #[serde(rename = "eTag", default)]
    etag: Option<String>,
}

pub struct OneDriveClient {
    http: reqwest::Client,
    access_token: SecretString,
    drive_id: String,
}

impl OneDriveClient {
    pub fn new(access_token: SecretString, drive_id: String, timeouts: &ProbeConfig) -> Result<Self> {
        Ok(Self {
            http: rest::http_client(timeouts)?,
            access_token,
            drive_id,
        })
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.access_token.expose())
    }

    fn item_id<'a>(receipt: &'a PutReceipt) -> Result<&'a str> {
        receipt.remote_id.as_deref().ok_or_else(|| {
            StorageError::Connection("onedrive item has no id from upload".to_string())
        })
    }
}

#[async_trait]
impl ObjectClient for OneDriveClient {
    async fn put_object(&self, key: &str, body: &[u8]) -> Result<PutReceipt> {
        let url = format!(
            "{}/drives/{}/root:/backupsheep/{}:/content",
            GRAPH_BASE, self.drive_id, key
        );

        let response = self
            .http
            .put(url)
            .header(header::AUTHORIZATION, self.auth_header())
            .header(header::CONTENT_TYPE, "text/plain")
            .body(body.to_vec())
            .send()
            .await
            .map_err(|e| StorageError::Connection(format!("onedrive upload: {}", e)))?;

        let response = rest::require_success(ProviderKind::OneDrive, "upload", response).await?;
        let item: DriveItem = response
            .json()
            .await
            .map_err(|e| StorageError::Connection(format!("onedrive upload response: {}", e)))?;

        Ok(PutReceipt {
            etag: item.etag,
            remote_id: Some(item.id),
        })
    }

    async fn fetch_object(&self, _key: &str, receipt: &PutReceipt) -> Result<Vec<u8>> {
        let item_id = Self::item_id(receipt)?;
        let url = format!("{}/drives/{}/items/{}/content", GRAPH_BASE, self.drive_id, item_id);

        let response = self
            .http
            .get(url)
            .header(header::AUTHORIZATION, self.auth_header())
            .send()
            .await
            .map_err(|e| StorageError::Connection(format!("onedrive download: {}", e)))?;

        let response = rest::require_success(ProviderKind::OneDrive, "download", response).await?;
        Ok(response
            .bytes()
            .await
            .map_err(|e| StorageError::Connection(format!("onedrive download body: {}", e)))?
            .to_vec())
    }

    async fn delete_object(&self, _key: &str, receipt: &PutReceipt) -> Result<DeleteReceipt> {
        let item_id = Self::item_id(receipt)?;
        let url = format!("{}/drives/{}/items/{}", GRAPH_BASE, self.drive_id, item_id);

        let response = self
            .http
            .delete(url)
            .header(header::AUTHORIZATION, self.auth_header())
            .send()
            .await
            .map_err(|e| StorageError::Connection(format!("onedrive delete: {}", e)))?;

        let status = response.status().as_u16();
        rest::require_success(ProviderKind::OneDrive, "delete", response).await?;

        // Graph acknowledges deletion with 204 No Content.
        Ok(DeleteReceipt {
            acknowledged: status == 204,
            status: Some(status),
        })
    }
}
