//! Explicit configuration injected at startup.
//!
//! OAuth client ids/secrets and probe timeouts come in through these
//! structs; there is no ambient global settings object.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use backupsheep_common::SecretString;

/// OAuth application credentials for one drive provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthApp {
    pub client_id: String,
    pub client_secret: SecretString,
}

impl OAuthApp {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<SecretString>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

/// OAuth applications for every drive provider that refreshes tokens.
///
/// pCloud hands out long-lived tokens and needs no app here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthApps {
    pub dropbox: OAuthApp,
    pub google: OAuthApp,
    pub microsoft: OAuthApp,
}

impl OAuthApps {
    /// Placeholder apps, usable in tests and in deployments that never
    /// touch the OAuth providers.
    pub fn disabled() -> Self {
        let empty = OAuthApp::new("", "");
        Self {
            dropbox: empty.clone(),
            google: empty.clone(),
            microsoft: empty,
        }
    }
}

/// Timeouts applied to every external call a probe makes.
///
/// The source of truth for "no operation blocks indefinitely": each probe
/// step is additionally bounded by `op_timeout` as a whole.
#[derive(Debug, Clone, Copy)]
pub struct ProbeConfig {
    pub connect_timeout: Duration,
    pub op_timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            op_timeout: Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeouts_are_explicit() {
        let config = ProbeConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert_eq!(config.op_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_oauth_app_secret_is_redacted_in_debug() {
        let apps = OAuthApps {
            dropbox: OAuthApp::new("id", "super-secret"),
            google: OAuthApp::new("id", "super-secret"),
            microsoft: OAuthApp::new("id", "super-secret"),
        };

        let rendered = format!("{:?}", apps);
        assert!(!rendered.contains("super-secret"));
    }
}
