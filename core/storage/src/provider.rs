//! Provider catalog and the adapter capability surface.
//!
//! One [`StorageAdapter`] exists per supported provider. Adapters own two
//! things only: endpoint resolution and client construction. The round-trip
//! validation choreography itself lives in [`crate::probe`] and is written
//! once.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use backupsheep_common::SecretString;

use crate::credential::PlainCredential;
use crate::error::Result;
use crate::oauth::TokenPair;

/// Code for each supported storage provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    AwsS3,
    Wasabi,
    DoSpaces,
    Filebase,
    Exoscale,
    BackblazeB2,
    Linode,
    Vultr,
    UpCloud,
    Oracle,
    Scaleway,
    Cloudflare,
    Leviia,
    Tencent,
    Alibaba,
    Azure,
    GoogleCloud,
    IDrive,
    Ionos,
    RackCorp,
    Ibm,
    Dropbox,
    GoogleDrive,
    OneDrive,
    PCloud,
}

impl ProviderKind {
    /// All supported providers, in catalog order.
    pub const ALL: [ProviderKind; 25] = [
        ProviderKind::AwsS3,
        ProviderKind::Wasabi,
        ProviderKind::DoSpaces,
        ProviderKind::Filebase,
        ProviderKind::Exoscale,
        ProviderKind::BackblazeB2,
        ProviderKind::Linode,
        ProviderKind::Vultr,
        ProviderKind::UpCloud,
        ProviderKind::Oracle,
        ProviderKind::Scaleway,
        ProviderKind::Cloudflare,
        ProviderKind::Leviia,
        ProviderKind::Tencent,
        ProviderKind::Alibaba,
        ProviderKind::Azure,
        ProviderKind::GoogleCloud,
        ProviderKind::IDrive,
        ProviderKind::Ionos,
        ProviderKind::RackCorp,
        ProviderKind::Ibm,
        ProviderKind::Dropbox,
        ProviderKind::GoogleDrive,
        ProviderKind::OneDrive,
        ProviderKind::PCloud,
    ];

    /// Stable wire/storage code for this provider.
    pub fn code(&self) -> &'static str {
        match self {
            ProviderKind::AwsS3 => "aws_s3",
            ProviderKind::Wasabi => "wasabi",
            ProviderKind::DoSpaces => "do_spaces",
            ProviderKind::Filebase => "filebase",
            ProviderKind::Exoscale => "exoscale",
            ProviderKind::BackblazeB2 => "backblaze_b2",
            ProviderKind::Linode => "linode",
            ProviderKind::Vultr => "vultr",
            ProviderKind::UpCloud => "upcloud",
            ProviderKind::Oracle => "oracle",
            ProviderKind::Scaleway => "scaleway",
            ProviderKind::Cloudflare => "cloudflare",
            ProviderKind::Leviia => "leviia",
            ProviderKind::Tencent => "tencent",
            ProviderKind::Alibaba => "alibaba",
            ProviderKind::Azure => "azure",
            ProviderKind::GoogleCloud => "google_cloud",
            ProviderKind::IDrive => "idrive",
            ProviderKind::Ionos => "ionos",
            ProviderKind::RackCorp => "rackcorp",
            ProviderKind::Ibm => "ibm",
            ProviderKind::Dropbox => "dropbox",
            ProviderKind::GoogleDrive => "google_drive",
            ProviderKind::OneDrive => "onedrive",
            ProviderKind::PCloud => "pcloud",
        }
    }

    /// Whether this provider authenticates with an OAuth token pair that
    /// can expire and be refreshed.
    pub fn is_oauth(&self) -> bool {
        matches!(
            self,
            ProviderKind::Dropbox | ProviderKind::GoogleDrive | ProviderKind::OneDrive
        )
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Static catalog entry describing a provider to account-facing surfaces.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderInfo {
    pub kind: ProviderKind,
    /// Human-facing display name.
    pub name: &'static str,
    /// Whether new destinations of this type may be created.
    pub enabled: bool,
    /// Display ordering.
    pub position: u32,
}

/// The full provider catalog, in display order.
pub fn catalog() -> Vec<ProviderInfo> {
    ProviderKind::ALL
        .iter()
        .enumerate()
        .map(|(i, kind)| ProviderInfo {
            kind: *kind,
            name: display_name(*kind),
            enabled: true,
            position: i as u32 + 1,
        })
        .collect()
}

fn display_name(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::AwsS3 => "AWS S3",
        ProviderKind::Wasabi => "Wasabi",
        ProviderKind::DoSpaces => "DigitalOcean Spaces",
        ProviderKind::Filebase => "Filebase",
        ProviderKind::Exoscale => "Exoscale",
        ProviderKind::BackblazeB2 => "Backblaze B2",
        ProviderKind::Linode => "Linode Object Storage",
        ProviderKind::Vultr => "Vultr Object Storage",
        ProviderKind::UpCloud => "UpCloud Object Storage",
        ProviderKind::Oracle => "Oracle Cloud Object Storage",
        ProviderKind::Scaleway => "Scaleway Object Storage",
        ProviderKind::Cloudflare => "Cloudflare R2",
        ProviderKind::Leviia => "Leviia",
        ProviderKind::Tencent => "Tencent COS",
        ProviderKind::Alibaba => "Alibaba OSS",
        ProviderKind::Azure => "Azure Blob Storage",
        ProviderKind::GoogleCloud => "Google Cloud Storage",
        ProviderKind::IDrive => "IDrive e2",
        ProviderKind::Ionos => "IONOS S3 Object Storage",
        ProviderKind::RackCorp => "RackCorp Object Storage",
        ProviderKind::Ibm => "IBM Cloud Object Storage",
        ProviderKind::Dropbox => "Dropbox",
        ProviderKind::GoogleDrive => "Google Drive",
        ProviderKind::OneDrive => "Microsoft OneDrive",
        ProviderKind::PCloud => "pCloud",
    }
}

/// Acknowledgment returned by a test-object write.
///
/// S3-style providers return an ETag; drive providers return the id the
/// provider assigned to the uploaded file. Either counts as a digest
/// acknowledgment; the probe keeps the receipt and hands it back for
/// read-back and cleanup.
#[derive(Debug, Clone, Default)]
pub struct PutReceipt {
    /// Content digest / ETag-equivalent reported by the provider.
    pub etag: Option<String>,
    /// Provider-assigned object id, where the provider addresses objects by
    /// id rather than key (Dropbox, Google Drive, OneDrive, pCloud).
    pub remote_id: Option<String>,
}

impl PutReceipt {
    /// Whether the provider acknowledged the write at all.
    pub fn acknowledged(&self) -> bool {
        self.etag.is_some() || self.remote_id.is_some()
    }
}

/// Acknowledgment returned by a test-object delete.
#[derive(Debug, Clone)]
pub struct DeleteReceipt {
    /// Whether the provider confirmed the deletion.
    pub acknowledged: bool,
    /// Raw status code, where the transport exposes one (e.g. HTTP 204 for
    /// S3-compatible deletes).
    pub status: Option<u16>,
}

/// Minimal object operations a destination must support for validation.
///
/// One client is built per probe invocation and bound to a single
/// bucket/container; clients are never pooled or shared across records.
#[async_trait]
pub trait ObjectClient: Send + Sync {
    /// Write `body` under `key`.
    async fn put_object(&self, key: &str, body: &[u8]) -> Result<PutReceipt>;

    /// Read the object back. Implementations that verify through a signed
    /// URL fetch the URL and return the decoded bytes.
    async fn fetch_object(&self, key: &str, receipt: &PutReceipt) -> Result<Vec<u8>>;

    /// Delete the object.
    async fn delete_object(&self, key: &str, receipt: &PutReceipt) -> Result<DeleteReceipt>;
}

/// Refresh flow for OAuth-backed providers.
///
/// An expired/invalid refresh token is a terminal failure
/// ([`crate::error::StorageError::TokenExpired`]); the caller must route the
/// user back through authorization rather than retry.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Exchange a refresh token for a fresh token pair.
    async fn refresh(&self, refresh_token: &SecretString) -> Result<TokenPair>;
}

/// Capability surface every provider adapter implements.
///
/// `build_client` never mutates persisted state; the one adapter operation
/// with a persistence side effect (token refresh) is reached through
/// [`StorageAdapter::token_refresh`] and persisted by the service layer.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Which provider this adapter backs.
    fn kind(&self) -> ProviderKind;

    /// Resolve the endpoint this credential talks to. Some providers
    /// compute it from region/bucket/account fields, others are fixed.
    fn endpoint(&self, credential: &PlainCredential) -> Result<String>;

    /// Construct a connected client for the destination described by the
    /// credential. Bucket/container and any path conventions are bound into
    /// the returned client.
    async fn build_client(&self, credential: &PlainCredential) -> Result<Box<dyn ObjectClient>>;

    /// The refresh flow, for providers with expiring OAuth tokens.
    fn token_refresh(&self) -> Option<&dyn TokenRefresher> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_covers_all_kinds() {
        let catalog = catalog();
        assert_eq!(catalog.len(), ProviderKind::ALL.len());

        for (i, info) in catalog.iter().enumerate() {
            assert_eq!(info.position, i as u32 + 1);
            assert!(!info.name.is_empty());
        }
    }

    #[test]
    fn test_codes_are_unique() {
        let mut codes: Vec<&str> = ProviderKind::ALL.iter().map(|k| k.code()).collect();
        codes.sort_unstable();
        codes.dedup();

        assert_eq!(codes.len(), ProviderKind::ALL.len());
    }

    #[test]
    fn test_oauth_kinds() {
        assert!(ProviderKind::Dropbox.is_oauth());
        assert!(ProviderKind::GoogleDrive.is_oauth());
        assert!(ProviderKind::OneDrive.is_oauth());
        assert!(!ProviderKind::PCloud.is_oauth());
        assert!(!ProviderKind::AwsS3.is_oauth());
    }

    #[test]
    fn test_put_receipt_acknowledgment() {
        assert!(!PutReceipt::default().acknowledged());
        assert!(PutReceipt {
            etag: Some("\"abc\"".into()),
            remote_id: None
        }
        .acknowledged());
        assert!(PutReceipt {
            etag: None,
            remote_id: Some("id:123".into())
        }
        .acknowledged());
    }
}
