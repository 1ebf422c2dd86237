//! Dropbox adapter: content-upload REST API plus OAuth refresh.

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

const AUTH_URL: &str = "https://www.dropbox.com/oauth2/authorize";
const TOKEN_URL: &str = "https://api.dropboxapi.com/oauth2/token";
const CONTENT_BASE: &str = "https://content.dropboxapi.com/2";
const API_BASE: &str = "https://api.dropboxapi.com/2";

pub struct DropboxAdapter {
    refresher: OAuthRefresher,
    timeouts: ProbeConfig,
}

impl DropboxAdapter {
    pub fn new(ctx: &AdapterContext) -> Result<Self> {
        Ok(Self {
            refresher: OAuthRefresher::new(
                ProviderKind::Dropbox,
                &ctx.oauth.dropbox,
                AUTH_URL,
                TOKEN_URL,
            )?,
            timeouts: ctx.probe,
        })
    }

    fn fields<'a>(&self, credential: &'a PlainCredential) -> Result<&'a OAuthCredential<SecretString>> {
        match credential {
            Credential::Dropbox(fields) => Ok(fields),
            other => Err(StorageError::NoCredentialBound(format!(
                "expected dropbox credential, found {}",
                other.kind()
            ))),
        }
    }
}

#[async_trait]
impl StorageAdapter for DropboxAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Dropbox
    }

    fn endpoint(&self, _credential: &PlainCredential) -> Result<String> {
        Ok("content.dropboxapi.com".to_string())
    }

    async fn build_client(&self, credential: &PlainCredential) -> Result<Box<dyn ObjectClient>> {
        let fields = self.fields(credential)?;
        Ok(Box::new(DropboxClient::new(
            fields.access_token.clone(),
            &self.timeouts,
        )?))
    }

    fn token_refresh(&self) -> Option<&dyn TokenRefresher> {
        Some(&self.refresher)
    }
}

/// Dropbox file metadata returned by upload.
#[derive(Debug, Deserialize)]
struct FileMetadata {
    id: String,
    #[serde(default)]
    content_hash: Option<String>,
}

pub struct DropboxClient {
    http: reqwest::Client,
    access_token: SecretString,
}

impl DropboxClient {
    pub fn new(access_token: SecretString, timeouts: &ProbeConfig) -> Result<Self> {
        Ok(Self {
            http: rest::http_client(timeouts)?,
            access_token,
        })
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.access_token.expose())
    }

    fn api_path(key: &str) -> String {
        format!("/{}", key)
    }

    fn api_arg(path: &str) -> String {
        serde_json::json!({ "path": path }).to_string()
    }
}

#[async_trait]
impl ObjectClient for DropboxClient {
    async fn put_object(&self, key: &str, body: &[u8]) -> Result<PutReceipt> {
        let arg = serde_json::json!({
            "path": Self::api_path(key),
            "mode": "overwrite",
            "mute": true,
        })
        .to_string();

        let response = self
            .http
            .post(format!("{}/files/upload", CONTENT_BASE))
            .header(header::AUTHORIZATION, self.auth_header())
            .header("Dropbox-API-Arg", arg)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(body.to_vec())
            .send()
            .await
            .map_err(|e| StorageError::Connection(format!("dropbox upload: {}", e)))?;

        let response = rest::require_success(ProviderKind::Dropbox, "upload", response).await?;
        let metadata: FileMetadata = response
            .json()
            .await
            .map_err(|e| StorageError::Connection(format!("dropbox upload response: {}", e)))?;

        Ok(PutReceipt {
            etag: metadata.content_hash,
            remote_id: Some(metadata.id),
        })
    }

    async fn fetch_object(&self, key: &str, _receipt: &PutReceipt) -> Result<Vec<u8>> {
        let response = self
            .http
            .post(format!("{}/files/download", CONTENT_BASE))
            .header(header::AUTHORIZATION, self.auth_header())
            .header("Dropbox-API-Arg", Self::api_arg(&Self::api_path(key)))
            .send()
            .await
            .map_err(|e| StorageError::Connection(format!("dropbox download: {}", e)))?;

        let response = rest::require_success(ProviderKind::Dropbox, "download", response).await?;
        Ok(response
            .bytes()
            .await
            .map_err(|e| StorageError::Connection(format!("dropbox download body: {}", e)))?
            .to_vec())
    }

    async fn delete_object(&self, key: &str, _receipt: &PutReceipt) -> Result<DeleteReceipt> {
        let response = self
            .http
            .post(format!("{}/files/delete_v2", API_BASE))
            .header(header::AUTHORIZATION, self.auth_header())
            .json(&serde_json::json!({ "path": Self::api_path(key) }))
            .send()
            .await
            .map_err(|e| StorageError::Connection(format!("dropbox delete: {}", e)))?;

        let status = response.status().as_u16();
        rest::require_success(ProviderKind::Dropbox, "delete", response).await?;

        Ok(DeleteReceipt {
            acknowledged: true,
            status: Some(status),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OAuthApps;
    use crate::regions::StaticRegions;
    use std::sync::Arc;

    fn adapter() -> DropboxAdapter {
        DropboxAdapter::new(&AdapterContext {
            oauth: OAuthApps::disabled(),
            regions: Arc::new(StaticRegions::with_defaults()),
            probe: ProbeConfig::default(),
        })
        .unwrap()
    }

    #[test]
    fn test_api_path_is_rooted() {
        assert_eq!(DropboxClient::api_path("probe.txt"), "/probe.txt");
    }

    #[test]
    fn test_api_arg_shape() {
        let arg = DropboxClient::api_arg("/probe.txt");
        let value: serde_json::Value = serde_json::from_str(&arg).unwrap();
        assert_eq!(value["path"], "/probe.txt");
    }

    #[test]
    fn test_adapter_exposes_refresher() {
        assert!(adapter().token_refresh().is_some());
    }

    #[tokio::test]
    async fn test_rejects_foreign_credential() {
        let foreign = Credential::GoogleDrive(OAuthCredential {
            access_token: SecretString::new("at"),
            refresh_token: SecretString::new("rt"),
            expires_at: None,
            account_email: None,
            no_delete: false,
        });

        // The endpoint is fixed, but building a client checks the variant.
        let result = adapter().build_client(&foreign).await;
        assert!(matches!(result, Err(StorageError::NoCredentialBound(_))));
    }
}
