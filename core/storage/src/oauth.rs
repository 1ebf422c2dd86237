//! OAuth2 token handling for consumer-drive providers.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use oauth2::basic::{BasicClient, BasicErrorResponseType};
use oauth2::reqwest::async_http_client;
use oauth2::{AuthUrl, ClientId, ClientSecret, RefreshToken, RequestTokenError, TokenResponse, TokenUrl};

use backupsheep_common::SecretString;

use crate::config::OAuthApp;
use crate::error::{Result, StorageError};
use crate::provider::{ProviderKind, TokenRefresher};

/// Refresh when less than this much validity remains.
const REFRESH_MARGIN_MINUTES: i64 = 5;

/// A freshly issued access/refresh token pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
    pub expires_at: DateTime<Utc>,
}

/// Whether a stored access token needs refreshing before use.
///
/// Tokens without a recorded expiry are assumed valid; the provider will
/// reject them with an auth error if not.
pub fn needs_refresh(expires_at: Option<DateTime<Utc>>) -> bool {
    match expires_at {
        Some(expiry) => expiry < Utc::now() + Duration::minutes(REFRESH_MARGIN_MINUTES),
        None => false,
    }
}

/// Generic refresh-token exchanger over the standard OAuth2 token endpoint.
///
/// One instance is owned per drive adapter, configured with that provider's
/// endpoints and app credentials.
pub struct OAuthRefresher {
    kind: ProviderKind,
    client: BasicClient,
}

impl OAuthRefresher {
    pub fn new(kind: ProviderKind, app: &OAuthApp, auth_url: &str, token_url: &str) -> Result<Self> {
        let client = BasicClient::new(
            ClientId::new(app.client_id.clone()),
            Some(ClientSecret::new(app.client_secret.expose().to_string())),
            AuthUrl::new(auth_url.to_string())
                .map_err(|e| StorageError::InvalidInput(format!("invalid auth URL: {}", e)))?,
            Some(
                TokenUrl::new(token_url.to_string())
                    .map_err(|e| StorageError::InvalidInput(format!("invalid token URL: {}", e)))?,
            ),
        );

        Ok(Self { kind, client })
    }
}

#[async_trait]
impl TokenRefresher for OAuthRefresher {
    async fn refresh(&self, refresh_token: &SecretString) -> Result<TokenPair> {
        let result = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.expose().to_string()))
            .request_async(async_http_client)
            .await;

        let response = match result {
            Ok(response) => response,
            Err(RequestTokenError::ServerResponse(response)) => {
                // An invalid/revoked refresh token is terminal: the user has
                // to go back through authorization.
                if *response.error() == BasicErrorResponseType::InvalidGrant {
                    return Err(StorageError::TokenExpired(format!(
                        "{}: {}",
                        self.kind,
                        response
                            .error_description()
                            .map(String::as_str)
                            .unwrap_or("refresh token rejected")
                    )));
                }
                return Err(StorageError::Auth(format!(
                    "{} token refresh rejected: {}",
                    self.kind,
                    response.error()
                )));
            }
            Err(RequestTokenError::Request(e)) => {
                return Err(StorageError::Connection(format!(
                    "{} token endpoint unreachable: {}",
                    self.kind, e
                )));
            }
            Err(e) => {
                return Err(StorageError::Auth(format!(
                    "{} token refresh failed: {}",
                    self.kind, e
                )));
            }
        };

        let access_token = SecretString::new(response.access_token().secret().clone());

        // Providers may or may not rotate the refresh token on refresh.
        let refresh_token = response
            .refresh_token()
            .map(|t| SecretString::new(t.secret().clone()))
            .unwrap_or_else(|| refresh_token.clone());

        let expires_in = response
            .expires_in()
            .unwrap_or_else(|| std::time::Duration::from_secs(3600));
        let expires_at =
            Utc::now() + Duration::from_std(expires_in).unwrap_or_else(|_| Duration::hours(1));

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expired_token_needs_refresh() {
        assert!(needs_refresh(Some(Utc::now() - Duration::hours(1))));
    }

    #[test]
    fn test_token_within_margin_needs_refresh() {
        // 4 minutes left is inside the 5 minute margin.
        assert!(needs_refresh(Some(Utc::now() + Duration::minutes(4))));
    }

    #[test]
    fn test_valid_token_does_not_need_refresh() {
        assert!(!needs_refresh(Some(Utc::now() + Duration::hours(1))));
    }

    #[test]
    fn test_unknown_expiry_does_not_force_refresh() {
        assert!(!needs_refresh(None));
    }

    #[test]
    fn test_refresher_construction() {
        let app = OAuthApp::new("client-id", "client-secret");
        let refresher = OAuthRefresher::new(
            ProviderKind::Dropbox,
            &app,
            "https://www.dropbox.com/oauth2/authorize",
            "https://api.dropboxapi.com/oauth2/token",
        );

        assert!(refresher.is_ok());
    }

    #[test]
    fn test_refresher_rejects_malformed_urls() {
        let app = OAuthApp::new("client-id", "client-secret");
        let refresher = OAuthRefresher::new(ProviderKind::Dropbox, &app, "not a url", "also not");

        assert!(refresher.is_err());
    }
}
