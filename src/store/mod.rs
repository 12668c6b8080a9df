//! Document store for crawl progress
//!
//! This module handles all persistence for the pipeline:
//! - SearchTarget work-queue records with status-driven lifecycle
//! - Place records discovered from search pages, deduplicated by URL
//! - Batch-windowed pending queries and atomic status updates
//! - Aggregate counts for supervision and reporting

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{DocumentStore, StorageError, StorageResult};

use crate::HarvestError;
use std::collections::BTreeMap;
use std::path::Path;

/// Initializes or opens a store database
pub fn open_store(path: &Path) -> Result<SqliteStore, HarvestError> {
    SqliteStore::new(path)
}

/// Lifecycle status of a search target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetStatus {
    /// Seeded, never attempted
    Entry,

    /// Attempted at least once without reaching a terminal state
    Pending,

    /// Search crawled and all discovered places handed to the sink
    Completed,

    /// Search crawl failed; `error_message` carries the reason
    Failed,
}

impl TargetStatus {
    /// Returns true if the target reached a terminal status.
    ///
    /// Failed targets are terminal for a pass (the supervisor will not spin
    /// waiting on them) but still match the pending window predicate
    /// (`status != completed`), so a later pass retries them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Entry => "entry",
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "entry" => Some(Self::Entry),
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Lifecycle status of a discovered place
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaceStatus {
    /// Discovered, detail extraction not yet done
    Waiting,

    /// Detail extraction succeeded (required attribute present)
    Completed,

    /// Detail extraction failed; `error_message` carries the reason
    Error,
}

impl PlaceStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "waiting" => Some(Self::Waiting),
            "completed" => Some(Self::Completed),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// A unit of search work: one query anchored at one location
#[derive(Debug, Clone)]
pub struct SearchTarget {
    pub id: i64,
    pub encoded_query: String,
    pub label: String,
    pub lat: String,
    pub lng: String,
    pub region: Option<String>,
    pub category: Option<String>,
    pub status: TargetStatus,
    pub result_count: i64,
    pub error_message: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Seed data for a search target, inserted by the seeder or tests
#[derive(Debug, Clone, serde::Deserialize)]
pub struct NewSearchTarget {
    #[serde(rename = "encoded-query")]
    pub encoded_query: String,
    pub label: String,
    pub lat: String,
    pub lng: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// A place discovered from a search page, not yet inserted
#[derive(Debug, Clone)]
pub struct DiscoveredPlace {
    pub url: String,
    pub target_id: i64,
    pub region: Option<String>,
    pub category: Option<String>,
}

/// A stored place record
#[derive(Debug, Clone)]
pub struct PlaceRecord {
    pub id: i64,
    pub url: String,
    pub target_id: i64,
    pub region: Option<String>,
    pub category: Option<String>,
    pub status: PlaceStatus,
    pub name: Option<String>,
    pub attrs: BTreeMap<String, String>,
    pub error_message: Option<String>,
    pub scraped_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Result of a bulk insert into the dedup sink
///
/// `conflicts` counts rows rejected by the URL uniqueness constraint; they are
/// expected steady-state once a search space has been crawled more than once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertOutcome {
    pub inserted: u64,
    pub conflicts: u64,
}

/// Aggregate counts used by the supervisor and the stats mode
#[derive(Debug, Clone, Default)]
pub struct StoreSummary {
    pub targets_by_status: BTreeMap<&'static str, u64>,
    pub places_by_status: BTreeMap<&'static str, u64>,
    pub total_result_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_status_roundtrip() {
        for status in [
            TargetStatus::Entry,
            TargetStatus::Pending,
            TargetStatus::Completed,
            TargetStatus::Failed,
        ] {
            assert_eq!(
                TargetStatus::from_db_string(status.to_db_string()),
                Some(status)
            );
        }
        assert_eq!(TargetStatus::from_db_string("bogus"), None);
    }

    #[test]
    fn test_place_status_roundtrip() {
        for status in [
            PlaceStatus::Waiting,
            PlaceStatus::Completed,
            PlaceStatus::Error,
        ] {
            assert_eq!(
                PlaceStatus::from_db_string(status.to_db_string()),
                Some(status)
            );
        }
    }

    #[test]
    fn test_terminal_target_statuses() {
        assert!(TargetStatus::Completed.is_terminal());
        assert!(TargetStatus::Failed.is_terminal());
        assert!(!TargetStatus::Entry.is_terminal());
        assert!(!TargetStatus::Pending.is_terminal());
    }
}
