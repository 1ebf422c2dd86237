//! Provider credentials as a tagged union.
//!
//! Every storage record owns exactly one credential, and the variant carries
//! the provider it belongs to, so "zero or two credentials bound" is
//! unrepresentable and no runtime attribute discovery is needed.
//!
//! The type is generic over its secret representation: at rest secrets are
//! [`SecretField`] ciphertext blobs ([`StoredCredential`]); during
//! validate/use they are transient [`SecretString`]s ([`PlainCredential`]).
//! [`StoredCredential::open`] and [`PlainCredential::seal`] convert between
//! the two through the account-scoped credential cipher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use backupsheep_common::SecretString;
use backupsheep_crypto::{cipher, AccountKey, CipherError};

use crate::error::{Result, StorageError};
use crate::provider::ProviderKind;

/// An encrypted secret field: opaque ciphertext, only contract is cipher
/// round-trip correctness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretField(Vec<u8>);

impl SecretField {
    /// Encrypt a plaintext secret under the owning account's key.
    pub fn seal(plaintext: &SecretString, key: &AccountKey) -> std::result::Result<Self, CipherError> {
        cipher::encrypt(key, plaintext.expose().as_bytes()).map(Self)
    }

    /// Decrypt back to plaintext.
    pub fn open(&self, key: &AccountKey) -> std::result::Result<SecretString, CipherError> {
        let bytes = cipher::decrypt(key, &self.0)?;
        String::from_utf8(bytes)
            .map(SecretString::from)
            .map_err(|_| CipherError::Unauthenticated)
    }

    /// Raw ciphertext, for persistence layers.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Access/secret key pair plus bucket addressing, shared by every
/// S3-compatible provider. Which of `region`/`endpoint` is meaningful
/// depends on the provider: some resolve the endpoint from a region table,
/// some take it verbatim, some ignore both and use a fixed host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3KeyCredential<S> {
    pub access_key: S,
    pub secret_key: S,
    pub bucket: String,
    pub prefix: Option<String>,
    pub no_delete: bool,
    /// Region code, for providers that resolve endpoints per region.
    pub region: Option<String>,
    /// Explicit endpoint host, for providers that hand one out directly
    /// (Backblaze B2, Linode, Vultr, UpCloud, IDrive e2).
    pub endpoint: Option<String>,
}

/// Oracle Cloud credentials; the endpoint embeds the tenancy namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleCredential<S> {
    pub access_key: S,
    pub secret_key: S,
    pub bucket: String,
    pub namespace: String,
    pub region: String,
    pub prefix: Option<String>,
    pub no_delete: bool,
}

/// Cloudflare R2 credentials; the endpoint embeds the account id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudflareCredential<S> {
    pub access_key: S,
    pub secret_key: S,
    pub account_id: String,
    pub bucket: String,
    pub prefix: Option<String>,
    pub no_delete: bool,
}

/// Azure Blob Storage connection-string credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AzureCredential<S> {
    pub connection_string: S,
    pub container: String,
    pub prefix: Option<String>,
    pub no_delete: bool,
}

/// Google Cloud Storage service-account credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoogleCloudCredential<S> {
    /// Full service-account key JSON blob.
    pub service_key: S,
    pub bucket: String,
    pub prefix: Option<String>,
    pub no_delete: bool,
}

/// OAuth access/refresh token pair for consumer drives (Dropbox, Google
/// Drive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthCredential<S> {
    pub access_token: S,
    pub refresh_token: S,
    pub expires_at: Option<DateTime<Utc>>,
    /// Email or account label reported by the provider at authorization.
    pub account_email: Option<String>,
    pub no_delete: bool,
}

/// OneDrive adds the Graph drive addressing to the OAuth pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneDriveCredential<S> {
    pub access_token: S,
    pub refresh_token: S,
    pub expires_at: Option<DateTime<Utc>>,
    pub drive_id: String,
    pub user_id: Option<String>,
    pub no_delete: bool,
}

/// pCloud data region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PCloudLocation {
    UnitedStates,
    Europe,
}

/// pCloud long-lived OAuth token plus its API host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PCloudCredential<S> {
    pub access_token: S,
    /// API hostname assigned at authorization (api.pcloud.com or
    /// eapi.pcloud.com).
    pub hostname: String,
    pub location: PCloudLocation,
    pub no_delete: bool,
}

/// One credential per storage record, tagged by provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum Credential<S> {
    AwsS3(S3KeyCredential<S>),
    Wasabi(S3KeyCredential<S>),
    DoSpaces(S3KeyCredential<S>),
    Filebase(S3KeyCredential<S>),
    Exoscale(S3KeyCredential<S>),
    BackblazeB2(S3KeyCredential<S>),
    Linode(S3KeyCredential<S>),
    Vultr(S3KeyCredential<S>),
    UpCloud(S3KeyCredential<S>),
    Oracle(OracleCredential<S>),
    Scaleway(S3KeyCredential<S>),
    Cloudflare(CloudflareCredential<S>),
    Leviia(S3KeyCredential<S>),
    Tencent(S3KeyCredential<S>),
    Alibaba(S3KeyCredential<S>),
    Azure(AzureCredential<S>),
    GoogleCloud(GoogleCloudCredential<S>),
    IDrive(S3KeyCredential<S>),
    Ionos(S3KeyCredential<S>),
    RackCorp(S3KeyCredential<S>),
    Ibm(S3KeyCredential<S>),
    Dropbox(OAuthCredential<S>),
    GoogleDrive(OAuthCredential<S>),
    OneDrive(OneDriveCredential<S>),
    PCloud(PCloudCredential<S>),
}

/// Credential as persisted: secrets are ciphertext blobs.
pub type StoredCredential = Credential<SecretField>;

/// Credential as used: secrets are transient plaintext.
pub type PlainCredential = Credential<SecretString>;

impl<S> Credential<S> {
    /// The provider this credential belongs to.
    pub fn kind(&self) -> ProviderKind {
        match self {
            Credential::AwsS3(_) => ProviderKind::AwsS3,
            Credential::Wasabi(_) => ProviderKind::Wasabi,
            Credential::DoSpaces(_) => ProviderKind::DoSpaces,
            Credential::Filebase(_) => ProviderKind::Filebase,
            Credential::Exoscale(_) => ProviderKind::Exoscale,
            Credential::BackblazeB2(_) => ProviderKind::BackblazeB2,
            Credential::Linode(_) => ProviderKind::Linode,
            Credential::Vultr(_) => ProviderKind::Vultr,
            Credential::UpCloud(_) => ProviderKind::UpCloud,
            Credential::Oracle(_) => ProviderKind::Oracle,
            Credential::Scaleway(_) => ProviderKind::Scaleway,
            Credential::Cloudflare(_) => ProviderKind::Cloudflare,
            Credential::Leviia(_) => ProviderKind::Leviia,
            Credential::Tencent(_) => ProviderKind::Tencent,
            Credential::Alibaba(_) => ProviderKind::Alibaba,
            Credential::Azure(_) => ProviderKind::Azure,
            Credential::GoogleCloud(_) => ProviderKind::GoogleCloud,
            Credential::IDrive(_) => ProviderKind::IDrive,
            Credential::Ionos(_) => ProviderKind::Ionos,
            Credential::RackCorp(_) => ProviderKind::RackCorp,
            Credential::Ibm(_) => ProviderKind::Ibm,
            Credential::Dropbox(_) => ProviderKind::Dropbox,
            Credential::GoogleDrive(_) => ProviderKind::GoogleDrive,
            Credential::OneDrive(_) => ProviderKind::OneDrive,
            Credential::PCloud(_) => ProviderKind::PCloud,
        }
    }

    /// Key prefix for probe objects. Drives have no prefix notion; their
    /// folder conventions are bound into the client instead.
    pub fn prefix(&self) -> &str {
        match self {
            Credential::AwsS3(c)
            | Credential::Wasabi(c)
            | Credential::DoSpaces(c)
            | Credential::Filebase(c)
            | Credential::Exoscale(c)
            | Credential::BackblazeB2(c)
            | Credential::Linode(c)
            | Credential::Vultr(c)
            | Credential::UpCloud(c)
            | Credential::Scaleway(c)
            | Credential::Leviia(c)
            | Credential::Tencent(c)
            | Credential::Alibaba(c)
            | Credential::IDrive(c)
            | Credential::Ionos(c)
            | Credential::RackCorp(c)
            | Credential::Ibm(c) => c.prefix.as_deref().unwrap_or(""),
            Credential::Oracle(c) => c.prefix.as_deref().unwrap_or(""),
            Credential::Cloudflare(c) => c.prefix.as_deref().unwrap_or(""),
            Credential::Azure(c) => c.prefix.as_deref().unwrap_or(""),
            Credential::GoogleCloud(c) => c.prefix.as_deref().unwrap_or(""),
            Credential::Dropbox(_)
            | Credential::GoogleDrive(_)
            | Credential::OneDrive(_)
            | Credential::PCloud(_) => "",
        }
    }

    /// Whether probe cleanup is suppressed for this destination.
    pub fn no_delete(&self) -> bool {
        match self {
            Credential::AwsS3(c)
            | Credential::Wasabi(c)
            | Credential::DoSpaces(c)
            | Credential::Filebase(c)
            | Credential::Exoscale(c)
            | Credential::BackblazeB2(c)
            | Credential::Linode(c)
            | Credential::Vultr(c)
            | Credential::UpCloud(c)
            | Credential::Scaleway(c)
            | Credential::Leviia(c)
            | Credential::Tencent(c)
            | Credential::Alibaba(c)
            | Credential::IDrive(c)
            | Credential::Ionos(c)
            | Credential::RackCorp(c)
            | Credential::Ibm(c) => c.no_delete,
            Credential::Oracle(c) => c.no_delete,
            Credential::Cloudflare(c) => c.no_delete,
            Credential::Azure(c) => c.no_delete,
            Credential::GoogleCloud(c) => c.no_delete,
            Credential::Dropbox(c) | Credential::GoogleDrive(c) => c.no_delete,
            Credential::OneDrive(c) => c.no_delete,
            Credential::PCloud(c) => c.no_delete,
        }
    }
}

macro_rules! convert_secret_fields {
    ($value:expr, $convert:expr) => {
        match $value {
            Credential::AwsS3(c) => Credential::AwsS3(c.convert($convert)?),
            Credential::Wasabi(c) => Credential::Wasabi(c.convert($convert)?),
            Credential::DoSpaces(c) => Credential::DoSpaces(c.convert($convert)?),
            Credential::Filebase(c) => Credential::Filebase(c.convert($convert)?),
            Credential::Exoscale(c) => Credential::Exoscale(c.convert($convert)?),
            Credential::BackblazeB2(c) => Credential::BackblazeB2(c.convert($convert)?),
            Credential::Linode(c) => Credential::Linode(c.convert($convert)?),
            Credential::Vultr(c) => Credential::Vultr(c.convert($convert)?),
            Credential::UpCloud(c) => Credential::UpCloud(c.convert($convert)?),
            Credential::Oracle(c) => Credential::Oracle(c.convert($convert)?),
            Credential::Scaleway(c) => Credential::Scaleway(c.convert($convert)?),
            Credential::Cloudflare(c) => Credential::Cloudflare(c.convert($convert)?),
            Credential::Leviia(c) => Credential::Leviia(c.convert($convert)?),
            Credential::Tencent(c) => Credential::Tencent(c.convert($convert)?),
            Credential::Alibaba(c) => Credential::Alibaba(c.convert($convert)?),
            Credential::Azure(c) => Credential::Azure(c.convert($convert)?),
            Credential::GoogleCloud(c) => Credential::GoogleCloud(c.convert($convert)?),
            Credential::IDrive(c) => Credential::IDrive(c.convert($convert)?),
            Credential::Ionos(c) => Credential::Ionos(c.convert($convert)?),
            Credential::RackCorp(c) => Credential::RackCorp(c.convert($convert)?),
            Credential::Ibm(c) => Credential::Ibm(c.convert($convert)?),
            Credential::Dropbox(c) => Credential::Dropbox(c.convert($convert)?),
            Credential::GoogleDrive(c) => Credential::GoogleDrive(c.convert($convert)?),
            Credential::OneDrive(c) => Credential::OneDrive(c.convert($convert)?),
            Credential::PCloud(c) => Credential::PCloud(c.convert($convert)?),
        }
    };
}

impl PlainCredential {
    /// Encrypt all secret fields under the account key.
    pub fn seal(&self, key: &AccountKey) -> std::result::Result<StoredCredential, CipherError> {
        let convert = |s: &SecretString| SecretField::seal(s, key);
        Ok(convert_secret_fields!(self, &convert))
    }

    /// View of the OAuth token state, for providers that refresh.
    pub fn token_view(&self) -> Option<TokenView<'_>> {
        match self {
            Credential::Dropbox(c) | Credential::GoogleDrive(c) => Some(TokenView {
                access_token: &c.access_token,
                refresh_token: &c.refresh_token,
                expires_at: c.expires_at,
            }),
            Credential::OneDrive(c) => Some(TokenView {
                access_token: &c.access_token,
                refresh_token: &c.refresh_token,
                expires_at: c.expires_at,
            }),
            _ => None,
        }
    }

    /// Replace the OAuth token pair in place (after a refresh).
    pub fn apply_token_pair(
        &mut self,
        access: SecretString,
        refresh: SecretString,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        match self {
            Credential::Dropbox(c) | Credential::GoogleDrive(c) => {
                c.access_token = access;
                c.refresh_token = refresh;
                c.expires_at = Some(expires_at);
                Ok(())
            }
            Credential::OneDrive(c) => {
                c.access_token = access;
                c.refresh_token = refresh;
                c.expires_at = Some(expires_at);
                Ok(())
            }
            other => Err(StorageError::Unsupported {
                kind: other.kind(),
                operation: "token refresh",
            }),
        }
    }
}

impl StoredCredential {
    /// Decrypt all secret fields with the account key.
    ///
    /// A failure here means the credential was sealed under a different
    /// (e.g. rotated) key or the blob is corrupted; the caller surfaces it
    /// as credential-unusable, never as a crash.
    pub fn open(&self, key: &AccountKey) -> std::result::Result<PlainCredential, CipherError> {
        let convert = |s: &SecretField| s.open(key);
        Ok(convert_secret_fields!(self, &convert))
    }

    /// Atomically swap in a refreshed token pair. All three fields update
    /// together or not at all.
    pub fn set_token_pair(
        &mut self,
        access: SecretField,
        refresh: SecretField,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        match self {
            Credential::Dropbox(c) | Credential::GoogleDrive(c) => {
                c.access_token = access;
                c.refresh_token = refresh;
                c.expires_at = Some(expires_at);
                Ok(())
            }
            Credential::OneDrive(c) => {
                c.access_token = access;
                c.refresh_token = refresh;
                c.expires_at = Some(expires_at);
                Ok(())
            }
            other => Err(StorageError::Unsupported {
                kind: other.kind(),
                operation: "token refresh",
            }),
        }
    }

    /// Re-encrypt under a new account key (online key rotation).
    pub fn reseal(
        &self,
        old_key: &AccountKey,
        new_key: &AccountKey,
    ) -> std::result::Result<StoredCredential, CipherError> {
        self.open(old_key)?.seal(new_key)
    }
}

/// Borrowed view of an OAuth token pair.
#[derive(Debug)]
pub struct TokenView<'a> {
    pub access_token: &'a SecretString,
    pub refresh_token: &'a SecretString,
    pub expires_at: Option<DateTime<Utc>>,
}

macro_rules! impl_convert {
    ($name:ident, [$($secret:ident),+], [$($plain:ident),*]) => {
        impl<S> $name<S> {
            fn convert<T, E>(
                &self,
                f: impl Fn(&S) -> std::result::Result<T, E>,
            ) -> std::result::Result<$name<T>, E> {
                Ok($name {
                    $($secret: f(&self.$secret)?,)+
                    $($plain: self.$plain.clone(),)*
                })
            }
        }
    };
}

impl_convert!(S3KeyCredential, [access_key, secret_key], [bucket, prefix, no_delete, region, endpoint]);
impl_convert!(OracleCredential, [access_key, secret_key], [bucket, namespace, region, prefix, no_delete]);
impl_convert!(CloudflareCredential, [access_key, secret_key], [account_id, bucket, prefix, no_delete]);
impl_convert!(AzureCredential, [connection_string], [container, prefix, no_delete]);
impl_convert!(GoogleCloudCredential, [service_key], [bucket, prefix, no_delete]);
impl_convert!(OAuthCredential, [access_token, refresh_token], [expires_at, account_email, no_delete]);
impl_convert!(OneDriveCredential, [access_token, refresh_token], [expires_at, drive_id, user_id, no_delete]);
impl_convert!(PCloudCredential, [access_token], [hostname, location, no_delete]);

#[cfg(test)]
mod tests {
    use super::*;

    fn s3_plain() -> PlainCredential {
        Credential::Wasabi(S3KeyCredential {
            access_key: SecretString::new("AKIA-TEST"),
            secret_key: SecretString::new("deep-secret"),
            bucket: "backups".into(),
            prefix: Some("nightly".into()),
            no_delete: false,
            region: Some("us-east-1".into()),
            endpoint: None,
        })
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let key = AccountKey::generate();
        let plain = s3_plain();

        let stored = plain.seal(&key).unwrap();
        let opened = stored.open(&key).unwrap();

        assert_eq!(opened, plain);
    }

    #[test]
    fn test_open_with_wrong_key_fails() {
        let key = AccountKey::generate();
        let rotated = AccountKey::generate();

        let stored = s3_plain().seal(&key).unwrap();

        assert!(stored.open(&rotated).is_err());
    }

    #[test]
    fn test_sealed_secrets_are_not_plaintext() {
        let key = AccountKey::generate();
        let stored = s3_plain().seal(&key).unwrap();

        let Credential::Wasabi(fields) = &stored else {
            panic!("variant changed by seal");
        };
        assert!(!fields
            .access_key
            .as_bytes()
            .windows(9)
            .any(|w| w == b"AKIA-TEST"));
    }

    #[test]
    fn test_reseal_moves_to_new_key() {
        let old_key = AccountKey::generate();
        let new_key = AccountKey::generate();
        let plain = s3_plain();

        let stored = plain.seal(&old_key).unwrap();
        let migrated = stored.reseal(&old_key, &new_key).unwrap();

        assert!(migrated.open(&old_key).is_err());
        assert_eq!(migrated.open(&new_key).unwrap(), plain);
    }

    #[test]
    fn test_kind_matches_variant() {
        assert_eq!(s3_plain().kind(), ProviderKind::Wasabi);

        let dropbox: PlainCredential = Credential::Dropbox(OAuthCredential {
            access_token: SecretString::new("at"),
            refresh_token: SecretString::new("rt"),
            expires_at: None,
            account_email: None,
            no_delete: false,
        });
        assert_eq!(dropbox.kind(), ProviderKind::Dropbox);
    }

    #[test]
    fn test_set_token_pair_rejected_for_static_keys() {
        let key = AccountKey::generate();
        let mut stored = s3_plain().seal(&key).unwrap();

        let access = SecretField::seal(&SecretString::new("a"), &key).unwrap();
        let refresh = SecretField::seal(&SecretString::new("r"), &key).unwrap();

        let result = stored.set_token_pair(access, refresh, Utc::now());
        assert!(matches!(result, Err(StorageError::Unsupported { .. })));
    }

    #[test]
    fn test_set_token_pair_updates_all_fields() {
        let key = AccountKey::generate();
        let plain: PlainCredential = Credential::GoogleDrive(OAuthCredential {
            access_token: SecretString::new("old-access"),
            refresh_token: SecretString::new("old-refresh"),
            expires_at: Some(Utc::now()),
            account_email: Some("user@example.com".into()),
            no_delete: false,
        });
        let mut stored = plain.seal(&key).unwrap();

        let expiry = Utc::now() + chrono::Duration::hours(1);
        stored
            .set_token_pair(
                SecretField::seal(&SecretString::new("new-access"), &key).unwrap(),
                SecretField::seal(&SecretString::new("new-refresh"), &key).unwrap(),
                expiry,
            )
            .unwrap();

        let opened = stored.open(&key).unwrap();
        let view = opened.token_view().unwrap();
        assert_eq!(view.access_token.expose(), "new-access");
        assert_eq!(view.refresh_token.expose(), "new-refresh");
        assert_eq!(view.expires_at, Some(expiry));
    }

    #[test]
    fn test_prefix_defaults_to_empty() {
        let plain: PlainCredential = Credential::PCloud(PCloudCredential {
            access_token: SecretString::new("t"),
            hostname: "api.pcloud.com".into(),
            location: PCloudLocation::UnitedStates,
            no_delete: true,
        });

        assert_eq!(plain.prefix(), "");
        assert!(plain.no_delete());
    }
}
