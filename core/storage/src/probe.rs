//! The validation round trip: write, verify, read back, clean up.
//!
//! The choreography is identical for every provider; only the client
//! differs. Steps run strictly in order because each one validates the
//! effect of the previous, and every step is bounded by the configured
//! timeout. Nothing here mutates record status; the caller decides what a
//! success means for the record lifecycle.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;

use crate::config::ProbeConfig;
use crate::error::{Result, StorageError};
use crate::provider::ObjectClient;

/// Fixed payload written to the destination.
pub const PROBE_BODY: &[u8] = b"BackupSheep test upload.";

/// Normalize a key prefix: non-empty prefixes are slash-terminated, the
/// empty prefix stays empty. Idempotent.
pub fn normalize_prefix(prefix: &str) -> String {
    if !prefix.is_empty() && !prefix.ends_with('/') {
        format!("{}/", prefix)
    } else {
        prefix.to_string()
    }
}

/// Compose the probe object key. The unix timestamp keeps keys from
/// colliding across invocations run at least a second apart.
pub fn probe_object_key(normalized_prefix: &str, unix_timestamp: i64) -> String {
    format!("{}backupsheep_test_{}.txt", normalized_prefix, unix_timestamp)
}

/// Outcome of a successful probe.
#[derive(Debug, Clone)]
pub struct ProbeReport {
    /// Key the test object was written under.
    pub object_key: String,
    /// Digest acknowledgment from the write, where the provider gave one.
    pub etag: Option<String>,
    /// Whether the test object was deleted (false under a no-delete
    /// policy; the object remains at the destination).
    pub cleaned_up: bool,
}

async fn bounded<T, F>(timeout: Duration, what: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(classify(what, e)),
        Err(_) => Err(StorageError::probe_timeout(format!(
            "{} timed out after {}s",
            what,
            timeout.as_secs()
        ))),
    }
}

/// Convert client errors into typed probe outcomes. Auth failures keep
/// their type; everything else becomes a probe connection failure with the
/// cause attached — raw transport errors never cross this boundary.
fn classify(what: &str, err: StorageError) -> StorageError {
    match err {
        e @ (StorageError::Auth(_) | StorageError::TokenExpired(_)) => e,
        e => StorageError::probe_failure(format!("{} failed", what), e),
    }
}

/// Run the write/read/verify/delete round trip against one destination.
///
/// # Errors
/// - [`StorageError::WriteVerifyFailed`] if the write is not acknowledged
///   with a digest/id
/// - [`StorageError::ReadVerifyFailed`] if the read-back bytes differ from
///   what was written
/// - [`StorageError::CleanupFailed`] if deletion is not acknowledged
///   (partial success is a failure: the bucket may now hold a stray object)
/// - [`StorageError::ProbeConnectionFailed`] for timeouts and any
///   unexpected transport error
pub async fn run_probe(
    client: &dyn ObjectClient,
    prefix: &str,
    no_delete: bool,
    config: &ProbeConfig,
) -> Result<ProbeReport> {
    let prefix = normalize_prefix(prefix);
    let key = probe_object_key(&prefix, Utc::now().timestamp());

    tracing::debug!(key = %key, "starting destination probe");

    let receipt = bounded(config.op_timeout, "test upload", client.put_object(&key, PROBE_BODY)).await?;
    if !receipt.acknowledged() {
        return Err(StorageError::WriteVerifyFailed(format!(
            "no content digest returned for {}",
            key
        )));
    }

    let body = bounded(
        config.op_timeout,
        "read-back",
        client.fetch_object(&key, &receipt),
    )
    .await?;
    if body != PROBE_BODY {
        return Err(StorageError::ReadVerifyFailed(format!(
            "content mismatch for {}: expected {} bytes, got {}",
            key,
            PROBE_BODY.len(),
            body.len()
        )));
    }

    let mut cleaned_up = false;
    if !no_delete {
        let deletion = bounded(
            config.op_timeout,
            "cleanup",
            client.delete_object(&key, &receipt),
        )
        .await?;
        if !deletion.acknowledged {
            return Err(StorageError::CleanupFailed(match deletion.status {
                Some(status) => format!("delete of {} returned status {}", key, status),
                None => format!("delete of {} was not acknowledged", key),
            }));
        }
        cleaned_up = true;
    }

    tracing::debug!(key = %key, cleaned_up, "destination probe succeeded");

    Ok(ProbeReport {
        object_key: key,
        etag: receipt.etag,
        cleaned_up,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryObjectClient;

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix(""), "");
        assert_eq!(normalize_prefix("a"), "a/");
        assert_eq!(normalize_prefix("a/"), "a/");
        assert_eq!(normalize_prefix("nested/path"), "nested/path/");
    }

    #[test]
    fn test_normalize_prefix_is_idempotent() {
        for prefix in ["", "a", "a/", "x/y/z"] {
            let once = normalize_prefix(prefix);
            assert_eq!(normalize_prefix(&once), once);
        }
    }

    #[test]
    fn test_object_key_shape() {
        assert_eq!(
            probe_object_key("backups/", 1700000000),
            "backups/backupsheep_test_1700000000.txt"
        );
        assert_eq!(
            probe_object_key("", 1700000000),
            "backupsheep_test_1700000000.txt"
        );
    }

    #[test]
    fn test_object_keys_unique_per_second() {
        assert_ne!(probe_object_key("", 100), probe_object_key("", 101));
    }

    #[tokio::test]
    async fn test_probe_success_cleans_up() {
        let client = MemoryObjectClient::new();
        let config = ProbeConfig::default();

        let report = run_probe(&client, "nightly", false, &config).await.unwrap();

        assert!(report.object_key.starts_with("nightly/backupsheep_test_"));
        assert!(report.cleaned_up);
        assert!(report.etag.is_some());
        assert!(!client.contains(&report.object_key).await);
    }

    #[tokio::test]
    async fn test_probe_no_delete_keeps_object() {
        let client = MemoryObjectClient::new();
        let config = ProbeConfig::default();

        let report = run_probe(&client, "", true, &config).await.unwrap();

        assert!(!report.cleaned_up);
        assert!(client.contains(&report.object_key).await);
        // The object remains readable afterwards.
        assert_eq!(
            client.object(&report.object_key).await.unwrap(),
            PROBE_BODY
        );
    }

    #[tokio::test]
    async fn test_missing_etag_fails_write_verify() {
        let client = MemoryObjectClient::new().with_withheld_etag();
        let config = ProbeConfig::default();

        let result = run_probe(&client, "", false, &config).await;

        assert!(matches!(result, Err(StorageError::WriteVerifyFailed(_))));
    }

    #[tokio::test]
    async fn test_corrupted_read_back_fails_read_verify() {
        let client = MemoryObjectClient::new().with_corrupted_read();
        let config = ProbeConfig::default();

        let result = run_probe(&client, "", false, &config).await;

        assert!(matches!(result, Err(StorageError::ReadVerifyFailed(_))));
    }

    #[tokio::test]
    async fn test_refused_delete_fails_cleanup() {
        let client = MemoryObjectClient::new().with_refused_delete();
        let config = ProbeConfig::default();

        let result = run_probe(&client, "", false, &config).await;

        assert!(matches!(result, Err(StorageError::CleanupFailed(_))));
    }

    #[tokio::test]
    async fn test_transport_error_is_wrapped() {
        let client = MemoryObjectClient::new().with_connection_failure();
        let config = ProbeConfig::default();

        let result = run_probe(&client, "", false, &config).await;

        assert!(matches!(
            result,
            Err(StorageError::ProbeConnectionFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_auth_error_passes_through() {
        let client = MemoryObjectClient::new().with_auth_failure();
        let config = ProbeConfig::default();

        let result = run_probe(&client, "", false, &config).await;

        assert!(matches!(result, Err(StorageError::Auth(_))));
    }
}
