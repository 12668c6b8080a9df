//! SQLite store implementation
//!
//! This module provides a SQLite-based implementation of the DocumentStore
//! trait. It renders the document-store contract onto SQL: window pagination
//! through LIMIT/OFFSET, additive increments through a single UPDATE, and the
//! unordered bulk insert through INSERT OR IGNORE inside one transaction.

use crate::store::schema::initialize_schema;
use crate::store::traits::{DocumentStore, StorageError, StorageResult};
use crate::store::{
    DiscoveredPlace, InsertOutcome, NewSearchTarget, PlaceRecord, PlaceStatus, SearchTarget,
    StoreSummary, TargetStatus,
};
use crate::HarvestError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::path::Path;

/// SQLite store backend
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Creates a new SqliteStore instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    pub fn new(path: &Path) -> Result<Self, HarvestError> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, HarvestError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn row_to_target(row: &Row) -> rusqlite::Result<SearchTarget> {
    Ok(SearchTarget {
        id: row.get(0)?,
        encoded_query: row.get(1)?,
        label: row.get(2)?,
        lat: row.get(3)?,
        lng: row.get(4)?,
        region: row.get(5)?,
        category: row.get(6)?,
        status: TargetStatus::from_db_string(&row.get::<_, String>(7)?)
            .unwrap_or(TargetStatus::Pending),
        result_count: row.get(8)?,
        error_message: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn row_to_place(row: &Row) -> rusqlite::Result<PlaceRecord> {
    let attrs_json: String = row.get(7)?;
    Ok(PlaceRecord {
        id: row.get(0)?,
        url: row.get(1)?,
        target_id: row.get(2)?,
        region: row.get(3)?,
        category: row.get(4)?,
        status: PlaceStatus::from_db_string(&row.get::<_, String>(5)?)
            .unwrap_or(PlaceStatus::Waiting),
        name: row.get(6)?,
        attrs: serde_json::from_str(&attrs_json).unwrap_or_default(),
        error_message: row.get(8)?,
        scraped_at: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

const TARGET_COLUMNS: &str = "id, encoded_query, label, lat, lng, region, category, status, \
     result_count, error_message, created_at, updated_at";

const PLACE_COLUMNS: &str = "id, url, target_id, region, category, status, name, attrs, \
     error_message, scraped_at, created_at, updated_at";

impl DocumentStore for SqliteStore {
    // ===== Seeding and maintenance =====

    fn insert_targets(&mut self, targets: &[NewSearchTarget]) -> StorageResult<u64> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO search_targets \
                 (encoded_query, label, lat, lng, region, category, status, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'entry', ?7, ?7)",
            )?;
            for target in targets {
                stmt.execute(params![
                    target.encoded_query,
                    target.label,
                    target.lat,
                    target.lng,
                    target.region,
                    target.category,
                    now
                ])?;
            }
        }
        tx.commit()?;
        Ok(targets.len() as u64)
    }

    fn reset_targets(&mut self) -> StorageResult<u64> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE search_targets \
             SET status = 'entry', error_message = NULL, result_count = 0, updated_at = ?1 \
             WHERE status != 'entry'",
            params![now],
        )?;
        Ok(changed as u64)
    }

    // ===== Work queue: search targets =====

    fn fetch_pending_targets(
        &self,
        batch_id: u32,
        batch_size: u32,
    ) -> StorageResult<Vec<SearchTarget>> {
        let offset = (batch_id.saturating_sub(1) as i64) * batch_size as i64;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TARGET_COLUMNS} FROM search_targets \
             WHERE status != 'completed' \
             ORDER BY id LIMIT ?1 OFFSET ?2"
        ))?;

        let targets = stmt
            .query_map(params![batch_size as i64, offset], row_to_target)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(targets)
    }

    fn count_pending_targets(&self) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM search_targets WHERE status != 'completed'",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_unsettled_targets(&self) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM search_targets WHERE status NOT IN ('completed', 'failed')",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn mark_target_completed(&mut self, id: i64, result_count: i64) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE search_targets \
             SET status = 'completed', result_count = result_count + ?1, updated_at = ?2 \
             WHERE id = ?3",
            params![result_count, now, id],
        )?;
        Ok(())
    }

    fn mark_target_failed(&mut self, id: i64, reason: &str) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE search_targets \
             SET status = 'failed', error_message = ?1, updated_at = ?2 \
             WHERE id = ?3",
            params![reason, now, id],
        )?;
        Ok(())
    }

    fn get_target(&self, id: i64) -> StorageResult<Option<SearchTarget>> {
        let target = self
            .conn
            .query_row(
                &format!("SELECT {TARGET_COLUMNS} FROM search_targets WHERE id = ?1"),
                params![id],
                row_to_target,
            )
            .optional()?;
        Ok(target)
    }

    // ===== Dedup sink: places =====

    fn insert_discovered(&mut self, places: &[DiscoveredPlace]) -> StorageResult<InsertOutcome> {
        let now = Utc::now().to_rfc3339();
        let mut outcome = InsertOutcome::default();

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO places \
                 (url, target_id, region, category, status, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, 'waiting', ?5, ?5)",
            )?;
            for place in places {
                let inserted = stmt.execute(params![
                    place.url,
                    place.target_id,
                    place.region,
                    place.category,
                    now
                ])?;
                if inserted == 1 {
                    outcome.inserted += 1;
                } else {
                    outcome.conflicts += 1;
                }
            }
        }
        tx.commit()?;

        Ok(outcome)
    }

    // ===== Work queue: places =====

    fn fetch_waiting_places(
        &self,
        batch_id: u32,
        batch_size: u32,
    ) -> StorageResult<Vec<PlaceRecord>> {
        let offset = (batch_id.saturating_sub(1) as i64) * batch_size as i64;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PLACE_COLUMNS} FROM places \
             WHERE status != 'completed' \
             ORDER BY id LIMIT ?1 OFFSET ?2"
        ))?;

        let places = stmt
            .query_map(params![batch_size as i64, offset], row_to_place)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(places)
    }

    fn count_waiting_places(&self) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM places WHERE status = 'waiting'",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn complete_place(
        &mut self,
        id: i64,
        name: &str,
        attrs: &BTreeMap<String, String>,
    ) -> StorageResult<()> {
        let attrs_json = serde_json::to_string(attrs)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE places \
             SET status = 'completed', name = ?1, attrs = ?2, scraped_at = ?3, \
                 updated_at = ?3, error_message = NULL \
             WHERE id = ?4",
            params![name, attrs_json, now, id],
        )?;
        Ok(())
    }

    fn fail_place(&mut self, id: i64, reason: &str) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE places SET status = 'error', error_message = ?1, updated_at = ?2 \
             WHERE id = ?3",
            params![reason, now, id],
        )?;
        Ok(())
    }

    fn get_place_by_url(&self, url: &str) -> StorageResult<Option<PlaceRecord>> {
        let place = self
            .conn
            .query_row(
                &format!("SELECT {PLACE_COLUMNS} FROM places WHERE url = ?1"),
                params![url],
                row_to_place,
            )
            .optional()?;
        Ok(place)
    }

    // ===== Statistics =====

    fn count_places(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM places", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn summary(&self) -> StorageResult<StoreSummary> {
        let mut summary = StoreSummary::default();

        let mut stmt = self
            .conn
            .prepare("SELECT status, COUNT(*) FROM search_targets GROUP BY status")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (status, count) = row?;
            if let Some(status) = TargetStatus::from_db_string(&status) {
                summary
                    .targets_by_status
                    .insert(status.to_db_string(), count as u64);
            }
        }

        let mut stmt = self
            .conn
            .prepare("SELECT status, COUNT(*) FROM places GROUP BY status")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (status, count) = row?;
            if let Some(status) = PlaceStatus::from_db_string(&status) {
                summary
                    .places_by_status
                    .insert(status.to_db_string(), count as u64);
            }
        }

        summary.total_result_count = self.conn.query_row(
            "SELECT COALESCE(SUM(result_count), 0) FROM search_targets",
            [],
            |row| row.get(0),
        )?;

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed_target(label: &str) -> NewSearchTarget {
        NewSearchTarget {
            encoded_query: format!("{}+query", label),
            label: label.to_string(),
            lat: "12.97".to_string(),
            lng: "77.59".to_string(),
            region: Some("South".to_string()),
            category: Some("restaurant".to_string()),
        }
    }

    fn discovered(url: &str, target_id: i64) -> DiscoveredPlace {
        DiscoveredPlace {
            url: url.to_string(),
            target_id,
            region: Some("South".to_string()),
            category: Some("restaurant".to_string()),
        }
    }

    #[test]
    fn test_insert_and_fetch_window() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        let seeds: Vec<_> = (0..5).map(|i| seed_target(&format!("t{}", i))).collect();
        assert_eq!(store.insert_targets(&seeds).unwrap(), 5);

        // Window 1 takes the first two pending rows, window 2 the next two
        let w1 = store.fetch_pending_targets(1, 2).unwrap();
        let w2 = store.fetch_pending_targets(2, 2).unwrap();
        let w3 = store.fetch_pending_targets(3, 2).unwrap();
        assert_eq!(w1.len(), 2);
        assert_eq!(w2.len(), 2);
        assert_eq!(w3.len(), 1);
        assert_ne!(w1[0].id, w2[0].id);

        // Out-of-range window is empty
        assert!(store.fetch_pending_targets(4, 2).unwrap().is_empty());
    }

    #[test]
    fn test_windows_shift_as_targets_complete() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        let seeds: Vec<_> = (0..4).map(|i| seed_target(&format!("t{}", i))).collect();
        store.insert_targets(&seeds).unwrap();

        let first = store.fetch_pending_targets(1, 2).unwrap();
        store.mark_target_completed(first[0].id, 0).unwrap();

        // Completed rows leave the predicate, so the same window now starts
        // one row later. Accepted live-offset behavior.
        let shifted = store.fetch_pending_targets(1, 2).unwrap();
        assert_eq!(shifted[0].id, first[1].id);
    }

    #[test]
    fn test_mark_completed_is_additive() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        store.insert_targets(&[seed_target("t")]).unwrap();
        let id = store.fetch_pending_targets(1, 10).unwrap()[0].id;

        store.mark_target_completed(id, 7).unwrap();
        store.mark_target_completed(id, 5).unwrap();

        let target = store.get_target(id).unwrap().unwrap();
        assert_eq!(target.status, TargetStatus::Completed);
        assert_eq!(target.result_count, 12);
    }

    #[test]
    fn test_status_updates_are_noops_for_absent_ids() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        store.mark_target_completed(9999, 3).unwrap();
        store.mark_target_failed(9999, "nope").unwrap();
        assert_eq!(store.count_pending_targets().unwrap(), 0);
    }

    #[test]
    fn test_failed_targets_stay_in_pending_window() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        store.insert_targets(&[seed_target("t")]).unwrap();
        let id = store.fetch_pending_targets(1, 10).unwrap()[0].id;

        store.mark_target_failed(id, "timeout").unwrap();

        // Failed is retriable: it still matches the pending predicate but is
        // settled as far as the supervisor's drain check is concerned.
        assert_eq!(store.count_pending_targets().unwrap(), 1);
        assert_eq!(store.count_unsettled_targets().unwrap(), 0);
        let target = store.get_target(id).unwrap().unwrap();
        assert_eq!(target.error_message.as_deref(), Some("timeout"));
    }

    #[test]
    fn test_insert_discovered_absorbs_conflicts() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        store.insert_targets(&[seed_target("a"), seed_target("b")]).unwrap();
        let targets = store.fetch_pending_targets(1, 10).unwrap();

        let first = store
            .insert_discovered(&[
                discovered("https://maps.example/place/1", targets[0].id),
                discovered("https://maps.example/place/2", targets[0].id),
            ])
            .unwrap();
        assert_eq!(first, InsertOutcome { inserted: 2, conflicts: 0 });

        // Same URL rediscovered from a different target collapses to one row
        let second = store
            .insert_discovered(&[
                discovered("https://maps.example/place/2", targets[1].id),
                discovered("https://maps.example/place/3", targets[1].id),
            ])
            .unwrap();
        assert_eq!(second, InsertOutcome { inserted: 1, conflicts: 1 });

        assert_eq!(store.count_places().unwrap(), 3);
        let kept = store
            .get_place_by_url("https://maps.example/place/2")
            .unwrap()
            .unwrap();
        assert_eq!(kept.target_id, targets[0].id);
    }

    #[test]
    fn test_place_lifecycle() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        store.insert_targets(&[seed_target("t")]).unwrap();
        let target_id = store.fetch_pending_targets(1, 10).unwrap()[0].id;
        store
            .insert_discovered(&[discovered("https://maps.example/place/1", target_id)])
            .unwrap();

        let place = store.fetch_waiting_places(1, 10).unwrap().remove(0);
        assert_eq!(place.status, PlaceStatus::Waiting);

        let mut attrs = BTreeMap::new();
        attrs.insert("rating".to_string(), "4.5".to_string());
        store.complete_place(place.id, "Cafe Azure", &attrs).unwrap();

        let done = store
            .get_place_by_url("https://maps.example/place/1")
            .unwrap()
            .unwrap();
        assert_eq!(done.status, PlaceStatus::Completed);
        assert_eq!(done.name.as_deref(), Some("Cafe Azure"));
        assert_eq!(done.attrs.get("rating").map(String::as_str), Some("4.5"));
        assert!(done.scraped_at.is_some());
        assert_eq!(store.count_waiting_places().unwrap(), 0);
    }

    #[test]
    fn test_errored_place_is_refetched_but_not_waiting() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        store.insert_targets(&[seed_target("t")]).unwrap();
        let target_id = store.fetch_pending_targets(1, 10).unwrap()[0].id;
        store
            .insert_discovered(&[discovered("https://maps.example/place/1", target_id)])
            .unwrap();
        let place_id = store.fetch_waiting_places(1, 10).unwrap()[0].id;

        store.fail_place(place_id, "name missing").unwrap();

        assert_eq!(store.count_waiting_places().unwrap(), 0);
        assert_eq!(store.fetch_waiting_places(1, 10).unwrap().len(), 1);
    }

    #[test]
    fn test_reset_targets() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        store.insert_targets(&[seed_target("a"), seed_target("b")]).unwrap();
        let targets = store.fetch_pending_targets(1, 10).unwrap();
        store.mark_target_completed(targets[0].id, 9).unwrap();
        store.mark_target_failed(targets[1].id, "boom").unwrap();

        assert_eq!(store.reset_targets().unwrap(), 2);

        for target in store.fetch_pending_targets(1, 10).unwrap() {
            assert_eq!(target.status, TargetStatus::Entry);
            assert_eq!(target.result_count, 0);
            assert!(target.error_message.is_none());
        }
    }

    #[test]
    fn test_summary_counts() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        store.insert_targets(&[seed_target("a"), seed_target("b")]).unwrap();
        let targets = store.fetch_pending_targets(1, 10).unwrap();
        store.mark_target_completed(targets[0].id, 4).unwrap();

        let summary = store.summary().unwrap();
        assert_eq!(summary.targets_by_status.get("completed"), Some(&1));
        assert_eq!(summary.targets_by_status.get("entry"), Some(&1));
        assert_eq!(summary.total_result_count, 4);
    }
}
