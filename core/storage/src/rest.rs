//! Helpers shared by the hand-rolled drive REST clients.

use reqwest::StatusCode;

use crate::config::ProbeConfig;
use crate::error::{Result, StorageError};
use crate::provider::ProviderKind;

/// HTTP client with the probe timeouts applied.
pub fn http_client(timeouts: &ProbeConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent("BackupSheep/0.1")
        .connect_timeout(timeouts.connect_timeout)
        .timeout(timeouts.op_timeout)
        .build()
        .map_err(|e| StorageError::Connection(format!("http client: {}", e)))
}

/// Check a response status, mapping auth rejections apart from everything
/// else and appending the provider's own error text.
pub async fn require_success(
    provider: ProviderKind,
    operation: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = format!("{} {}: {} {}", provider, operation, status, body.trim());

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        Err(StorageError::Auth(detail))
    } else {
        Err(StorageError::Connection(detail))
    }
}
