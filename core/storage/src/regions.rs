//! Region/location reference data.
//!
//! Several providers resolve their endpoint from a region table; others
//! derive it from a template or take it verbatim from the credential. The
//! table is shared read-only reference data, never owned by a credential.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::provider::ProviderKind;

/// One region/location entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub code: String,
    pub name: String,
    /// Endpoint host for providers that publish one per region.
    pub endpoint: Option<String>,
}

/// Lookup seam for region reference data (collaborator-owned in
/// production; [`StaticRegions`] ships a usable default).
pub trait RegionLookup: Send + Sync {
    fn lookup(&self, kind: ProviderKind, code: &str) -> Option<Region>;
}

/// In-memory region table.
#[derive(Debug, Default)]
pub struct StaticRegions {
    entries: HashMap<(ProviderKind, String), Region>,
}

impl StaticRegions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table preloaded with the commonly used regions per provider.
    pub fn with_defaults() -> Self {
        let mut table = Self::new();

        for (code, name, endpoint) in [
            ("us-east-1", "US East 1 (N. Virginia)", "s3.wasabisys.com"),
            ("us-east-2", "US East 2 (N. Virginia)", "s3.us-east-2.wasabisys.com"),
            ("us-west-1", "US West 1 (Oregon)", "s3.us-west-1.wasabisys.com"),
            ("eu-central-1", "EU Central 1 (Amsterdam)", "s3.eu-central-1.wasabisys.com"),
            ("ap-northeast-1", "AP Northeast 1 (Tokyo)", "s3.ap-northeast-1.wasabisys.com"),
        ] {
            table.insert(ProviderKind::Wasabi, code, name, Some(endpoint));
        }

        for (code, name, endpoint) in [
            ("nyc3", "New York 3", "nyc3.digitaloceanspaces.com"),
            ("ams3", "Amsterdam 3", "ams3.digitaloceanspaces.com"),
            ("sgp1", "Singapore 1", "sgp1.digitaloceanspaces.com"),
            ("fra1", "Frankfurt 1", "fra1.digitaloceanspaces.com"),
            ("sfo3", "San Francisco 3", "sfo3.digitaloceanspaces.com"),
        ] {
            table.insert(ProviderKind::DoSpaces, code, name, Some(endpoint));
        }

        for (code, name, endpoint) in [
            ("ch-gva-2", "Geneva", "sos-ch-gva-2.exo.io"),
            ("ch-dk-2", "Zurich", "sos-ch-dk-2.exo.io"),
            ("de-fra-1", "Frankfurt", "sos-de-fra-1.exo.io"),
            ("at-vie-1", "Vienna", "sos-at-vie-1.exo.io"),
        ] {
            table.insert(ProviderKind::Exoscale, code, name, Some(endpoint));
        }

        for (code, name, endpoint) in [
            ("de", "Frankfurt", "s3-eu-central-1.ionoscloud.com"),
            ("eu-central-2", "Berlin", "s3-eu-central-2.ionoscloud.com"),
            ("eu-south-2", "Logrono", "s3-eu-south-2.ionoscloud.com"),
        ] {
            table.insert(ProviderKind::Ionos, code, name, Some(endpoint));
        }

        for (code, name, endpoint) in [
            ("oss-us-west-1", "US West 1 (Silicon Valley)", "oss-us-west-1.aliyuncs.com"),
            ("oss-us-east-1", "US East 1 (Virginia)", "oss-us-east-1.aliyuncs.com"),
            ("oss-eu-central-1", "Germany (Frankfurt)", "oss-eu-central-1.aliyuncs.com"),
            ("oss-ap-southeast-1", "Singapore", "oss-ap-southeast-1.aliyuncs.com"),
        ] {
            table.insert(ProviderKind::Alibaba, code, name, Some(endpoint));
        }

        for (code, name) in [
            ("us-east-1", "US East (N. Virginia)"),
            ("us-west-2", "US West (Oregon)"),
            ("eu-west-1", "Europe (Ireland)"),
            ("eu-central-1", "Europe (Frankfurt)"),
            ("ap-southeast-2", "Asia Pacific (Sydney)"),
        ] {
            table.insert(ProviderKind::AwsS3, code, name, None);
        }

        table
    }

    /// Add or replace an entry.
    pub fn insert(
        &mut self,
        kind: ProviderKind,
        code: &str,
        name: &str,
        endpoint: Option<&str>,
    ) {
        self.entries.insert(
            (kind, code.to_string()),
            Region {
                code: code.to_string(),
                name: name.to_string(),
                endpoint: endpoint.map(str::to_string),
            },
        );
    }
}

impl RegionLookup for StaticRegions {
    fn lookup(&self, kind: ProviderKind, code: &str) -> Option<Region> {
        self.entries.get(&(kind, code.to_string())).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_resolves_wasabi() {
        let table = StaticRegions::with_defaults();
        let region = table.lookup(ProviderKind::Wasabi, "us-east-1").unwrap();

        assert_eq!(region.endpoint.as_deref(), Some("s3.wasabisys.com"));
    }

    #[test]
    fn test_lookup_is_scoped_by_provider() {
        let table = StaticRegions::with_defaults();

        // Wasabi and AWS share the region code but not the entry.
        let wasabi = table.lookup(ProviderKind::Wasabi, "us-east-1").unwrap();
        let aws = table.lookup(ProviderKind::AwsS3, "us-east-1").unwrap();

        assert!(wasabi.endpoint.is_some());
        assert!(aws.endpoint.is_none());
    }

    #[test]
    fn test_unknown_region_is_none() {
        let table = StaticRegions::with_defaults();
        assert!(table.lookup(ProviderKind::Wasabi, "mars-north-1").is_none());
    }
}
