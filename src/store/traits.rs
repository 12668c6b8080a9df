//! Storage traits and error types
//!
//! This module defines the document-store contract the crawl engine runs
//! against, together with its error type.

use crate::store::{
    DiscoveredPlace, InsertOutcome, NewSearchTarget, PlaceRecord, SearchTarget, StoreSummary,
};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for document-store backends
///
/// The engine needs find-with-predicate plus skip/limit pagination, atomic
/// single-record updates with additive increments, a uniqueness-constrained
/// bulk insert that survives conflicts, and counts. All operations act on a
/// single record at a time except `insert_discovered`, whose batch is the
/// dedup sink's unit of work.
pub trait DocumentStore {
    // ===== Seeding and maintenance =====

    /// Inserts seed search targets, returning how many were stored
    fn insert_targets(&mut self, targets: &[NewSearchTarget]) -> StorageResult<u64>;

    /// Resets every search target back to `entry`, clearing error messages
    /// and result counts. Returns the number of rows touched.
    fn reset_targets(&mut self) -> StorageResult<u64>;

    // ===== Work queue: search targets =====

    /// Reads one batch window of pending search targets.
    ///
    /// Selects targets whose status is not `completed`, skips
    /// `(batch_id - 1) * batch_size` and limits to `batch_size`, ordered by
    /// id. Every call re-reads live state: because pending membership shrinks
    /// as siblings complete, a window computed mid-pass may skip or duplicate
    /// candidates relative to a static snapshot. Repeated passes converge
    /// regardless, since completed records leave the predicate.
    fn fetch_pending_targets(
        &self,
        batch_id: u32,
        batch_size: u32,
    ) -> StorageResult<Vec<SearchTarget>>;

    /// Counts targets whose status is not `completed`
    fn count_pending_targets(&self) -> StorageResult<u64>;

    /// Counts targets that have not reached a terminal status
    /// (neither `completed` nor `failed`)
    fn count_unsettled_targets(&self) -> StorageResult<u64>;

    /// Marks a target completed and adds `result_count` to its running total
    /// in the same atomic update. The increment is applied server-side, never
    /// read-modify-write. No-op if the id is absent.
    fn mark_target_completed(&mut self, id: i64, result_count: i64) -> StorageResult<()>;

    /// Marks a target failed with a human-readable reason. No-op if the id
    /// is absent.
    fn mark_target_failed(&mut self, id: i64, reason: &str) -> StorageResult<()>;

    /// Fetches a single target by id
    fn get_target(&self, id: i64) -> StorageResult<Option<SearchTarget>>;

    // ===== Dedup sink: places =====

    /// Bulk-inserts discovered places, continuing past uniqueness conflicts.
    ///
    /// Returns how many rows were genuinely new; conflicting rows are counted
    /// separately and are not an error.
    fn insert_discovered(&mut self, places: &[DiscoveredPlace]) -> StorageResult<InsertOutcome>;

    // ===== Work queue: places =====

    /// Reads one batch window of places whose status is not `completed`
    fn fetch_waiting_places(
        &self,
        batch_id: u32,
        batch_size: u32,
    ) -> StorageResult<Vec<PlaceRecord>>;

    /// Counts places still waiting for detail extraction
    fn count_waiting_places(&self) -> StorageResult<u64>;

    /// Marks a place completed with its required name and extracted
    /// attribute bag
    fn complete_place(
        &mut self,
        id: i64,
        name: &str,
        attrs: &BTreeMap<String, String>,
    ) -> StorageResult<()>;

    /// Marks a place errored with a human-readable reason
    fn fail_place(&mut self, id: i64, reason: &str) -> StorageResult<()>;

    /// Fetches a single place by its canonical URL
    fn get_place_by_url(&self, url: &str) -> StorageResult<Option<PlaceRecord>>;

    // ===== Statistics =====

    /// Counts all stored places
    fn count_places(&self) -> StorageResult<u64>;

    /// Builds the aggregate summary used by supervision and reporting
    fn summary(&self) -> StorageResult<StoreSummary>;
}
