//! Storage destination records and their lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use backupsheep_common::{AccountId, StorageId};

use crate::error::{Result, StorageError};
use crate::provider::ProviderKind;

/// Lifecycle status of a storage record.
///
/// Transitions are monotonic except ACTIVE <-> PAUSED. SUSPENDED is owned by
/// external billing/abuse collaborators; this core accepts transitions
/// into and out of it without validating the source. Nothing leaves
/// DELETE_REQUESTED from within this core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageStatus {
    Active,
    Pending,
    Suspended,
    Paused,
    DeleteRequested,
}

/// Per-artifact-kind usage counters, recomputed by background jobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactUsage {
    pub backup_count: u64,
    pub total_bytes: u64,
}

/// Usage counters for every artifact kind written to a destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageStats {
    pub website: ArtifactUsage,
    pub database: ArtifactUsage,
    pub wordpress: ArtifactUsage,
}

impl UsageStats {
    /// Total bytes across all artifact kinds.
    pub fn total_bytes(&self) -> u64 {
        self.website.total_bytes + self.database.total_bytes + self.wordpress.total_bytes
    }
}

/// One configured backup destination owned by an account.
///
/// The record holds only status/identity/bookkeeping; the provider secrets
/// live in the single credential bound to it (see
/// [`crate::credential::StoredCredential`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageRecord {
    pub id: StorageId,
    pub account_id: AccountId,
    pub kind: ProviderKind,
    /// Human name chosen by the user.
    pub name: String,
    pub status: StorageStatus,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub usage: UsageStats,
}

impl StorageRecord {
    /// Create a record in PENDING; it becomes ACTIVE only once the
    /// validation probe first succeeds.
    pub fn new(account_id: AccountId, kind: ProviderKind, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: StorageId::new(),
            account_id,
            kind,
            name: name.into(),
            status: StorageStatus::Pending,
            created_at: now,
            modified_at: now,
            usage: UsageStats::default(),
        }
    }

    fn touch(&mut self) {
        self.modified_at = Utc::now();
    }

    /// PENDING -> ACTIVE, after the first successful probe.
    pub fn activate(&mut self) -> Result<()> {
        match self.status {
            StorageStatus::Pending => {
                self.status = StorageStatus::Active;
                self.touch();
                Ok(())
            }
            // Re-validation of an already active record is a no-op here.
            StorageStatus::Active => Ok(()),
            from => Err(StorageError::InvalidTransition {
                from,
                to: StorageStatus::Active,
            }),
        }
    }

    /// ACTIVE -> PAUSED. External schedulers skip paused destinations.
    pub fn pause(&mut self) -> Result<()> {
        match self.status {
            StorageStatus::Active => {
                self.status = StorageStatus::Paused;
                self.touch();
                Ok(())
            }
            from => Err(StorageError::InvalidTransition {
                from,
                to: StorageStatus::Paused,
            }),
        }
    }

    /// PAUSED -> ACTIVE.
    pub fn resume(&mut self) -> Result<()> {
        match self.status {
            StorageStatus::Paused => {
                self.status = StorageStatus::Active;
                self.touch();
                Ok(())
            }
            from => Err(StorageError::InvalidTransition {
                from,
                to: StorageStatus::Active,
            }),
        }
    }

    /// Any state -> DELETE_REQUESTED. Terminal from this core's
    /// perspective; physical reaping happens elsewhere. Idempotent.
    pub fn request_delete(&mut self) {
        if self.status != StorageStatus::DeleteRequested {
            self.status = StorageStatus::DeleteRequested;
            self.touch();
        }
    }

    /// Unvalidated transition applied by external collaborators (billing,
    /// abuse). DELETE_REQUESTED still cannot be left.
    pub fn set_status_external(&mut self, status: StorageStatus) -> Result<()> {
        if self.status == StorageStatus::DeleteRequested && status != StorageStatus::DeleteRequested
        {
            return Err(StorageError::InvalidTransition {
                from: self.status,
                to: status,
            });
        }
        self.status = status;
        self.touch();
        Ok(())
    }

    /// Replace the usage counters (background recomputation).
    pub fn set_usage(&mut self, usage: UsageStats) {
        self.usage = usage;
        self.touch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> StorageRecord {
        StorageRecord::new(AccountId::new(), ProviderKind::AwsS3, "offsite")
    }

    #[test]
    fn test_new_record_is_pending() {
        assert_eq!(record().status, StorageStatus::Pending);
    }

    #[test]
    fn test_probe_success_activates() {
        let mut rec = record();
        rec.activate().unwrap();
        assert_eq!(rec.status, StorageStatus::Active);
    }

    #[test]
    fn test_pause_resume_cycle() {
        let mut rec = record();
        rec.activate().unwrap();

        rec.pause().unwrap();
        assert_eq!(rec.status, StorageStatus::Paused);

        rec.resume().unwrap();
        assert_eq!(rec.status, StorageStatus::Active);
    }

    #[test]
    fn test_pause_requires_active() {
        let mut rec = record();
        assert!(matches!(
            rec.pause(),
            Err(StorageError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_delete_requested_is_terminal() {
        let mut rec = record();
        rec.activate().unwrap();
        rec.request_delete();
        assert_eq!(rec.status, StorageStatus::DeleteRequested);

        assert!(rec.pause().is_err());
        assert!(rec.resume().is_err());
        assert!(rec.activate().is_err());
        assert!(rec
            .set_status_external(StorageStatus::Active)
            .is_err());

        // Idempotent.
        rec.request_delete();
        assert_eq!(rec.status, StorageStatus::DeleteRequested);
    }

    #[test]
    fn test_delete_requested_from_any_state() {
        let setups: [fn(&mut StorageRecord); 4] = [
            |_r| {},
            |r| r.activate().unwrap(),
            |r| {
                r.activate().unwrap();
                r.pause().unwrap();
            },
            |r| r.set_status_external(StorageStatus::Suspended).unwrap(),
        ];
        for setup in setups {
            let mut rec = record();
            setup(&mut rec);
            rec.request_delete();
            assert_eq!(rec.status, StorageStatus::DeleteRequested);
        }
    }

    #[test]
    fn test_external_suspension_roundtrip() {
        let mut rec = record();
        rec.activate().unwrap();

        rec.set_status_external(StorageStatus::Suspended).unwrap();
        assert_eq!(rec.status, StorageStatus::Suspended);

        rec.set_status_external(StorageStatus::Active).unwrap();
        assert_eq!(rec.status, StorageStatus::Active);
    }

    #[test]
    fn test_usage_totals() {
        let mut rec = record();
        rec.set_usage(UsageStats {
            website: ArtifactUsage {
                backup_count: 3,
                total_bytes: 1_000,
            },
            database: ArtifactUsage {
                backup_count: 2,
                total_bytes: 500,
            },
            wordpress: ArtifactUsage::default(),
        });

        assert_eq!(rec.usage.total_bytes(), 1_500);
    }
}
