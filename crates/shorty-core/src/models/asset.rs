use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Lifecycle status of an asset record.
///
/// Transitions only move forward: `pending -> created -> deleted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "asset_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum AssetStatus {
    Pending,
    Created,
    Deleted,
}

impl AssetStatus {
    /// The only status a record may be in right before moving to `self`.
    pub fn predecessor(self) -> Option<AssetStatus> {
        match self {
            AssetStatus::Pending => None,
            AssetStatus::Created => Some(AssetStatus::Pending),
            AssetStatus::Deleted => Some(AssetStatus::Created),
        }
    }

    pub fn can_transition_to(self, next: AssetStatus) -> bool {
        next.predecessor() == Some(self)
    }
}

impl Display for AssetStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            AssetStatus::Pending => write!(f, "pending"),
            AssetStatus::Created => write!(f, "created"),
            AssetStatus::Deleted => write!(f, "deleted"),
        }
    }
}

impl FromStr for AssetStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(AssetStatus::Pending),
            "created" => Ok(AssetStatus::Created),
            "deleted" => Ok(AssetStatus::Deleted),
            _ => Err(anyhow::anyhow!("Invalid asset status: {}", s)),
        }
    }
}

/// Metadata of one stored blob.
///
/// `id` is what higher-level records (images, files) reference; `resource_id`
/// is the key of the blob inside its bucket. The two are generated separately
/// so metadata and blob keys can evolve independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AssetMetadata {
    pub id: String,
    pub resource_id: String,
    pub size: i64,
    pub hash: String,
    pub bucket: String,
    pub status: AssetStatus,
    pub created_at: DateTime<Utc>,
}

impl AssetMetadata {
    /// Build a fresh record in `pending` status.
    pub fn pending(
        id: String,
        resource_id: String,
        size: i64,
        hash: String,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            id,
            resource_id,
            size,
            hash,
            bucket: bucket.into(),
            status: AssetStatus::Pending,
            created_at: Utc::now(),
        }
    }

    pub fn is_created(&self) -> bool {
        self.status == AssetStatus::Created
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions_are_monotonic() {
        assert!(AssetStatus::Pending.can_transition_to(AssetStatus::Created));
        assert!(AssetStatus::Created.can_transition_to(AssetStatus::Deleted));

        assert!(!AssetStatus::Pending.can_transition_to(AssetStatus::Deleted));
        assert!(!AssetStatus::Created.can_transition_to(AssetStatus::Pending));
        assert!(!AssetStatus::Deleted.can_transition_to(AssetStatus::Created));
        assert!(!AssetStatus::Created.can_transition_to(AssetStatus::Created));
    }

    #[test]
    fn test_status_round_trips_through_strings() {
        for status in [
            AssetStatus::Pending,
            AssetStatus::Created,
            AssetStatus::Deleted,
        ] {
            assert_eq!(status.to_string().parse::<AssetStatus>().unwrap(), status);
        }
        assert!("archived".parse::<AssetStatus>().is_err());
    }

    #[test]
    fn test_pending_constructor() {
        let meta = AssetMetadata::pending(
            "a".to_string(),
            "r".to_string(),
            3,
            "h".to_string(),
            "images",
        );
        assert_eq!(meta.status, AssetStatus::Pending);
        assert_eq!(meta.bucket, "images");
        assert!(!meta.is_created());
    }
}
