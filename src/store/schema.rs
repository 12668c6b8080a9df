//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the geoharvest
//! database.

use rusqlite::Connection;

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Search work queue: one row per query + location
CREATE TABLE IF NOT EXISTS search_targets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    encoded_query TEXT NOT NULL,
    label TEXT NOT NULL,
    lat TEXT NOT NULL,
    lng TEXT NOT NULL,
    region TEXT,
    category TEXT,
    status TEXT NOT NULL DEFAULT 'entry',
    result_count INTEGER NOT NULL DEFAULT 0,
    error_message TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_targets_status ON search_targets(status);
CREATE INDEX IF NOT EXISTS idx_targets_region ON search_targets(region);
CREATE INDEX IF NOT EXISTS idx_targets_category ON search_targets(category);

-- Discovered places, deduplicated by canonical URL
CREATE TABLE IF NOT EXISTS places (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    target_id INTEGER NOT NULL REFERENCES search_targets(id),
    region TEXT,
    category TEXT,
    status TEXT NOT NULL DEFAULT 'waiting',
    name TEXT,
    attrs TEXT NOT NULL DEFAULT '{}',
    error_message TEXT,
    scraped_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_places_status ON places(status);
CREATE INDEX IF NOT EXISTS idx_places_target ON places(target_id);
CREATE INDEX IF NOT EXISTS idx_places_region ON places(region);
"#;

/// Initializes the database schema
///
/// Safe to call on every open: all statements use IF NOT EXISTS.
pub fn initialize_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}
