//! Geoharvest: a resumable place-discovery crawler
//!
//! This crate implements a batch-partitioned crawl pipeline that discovers
//! place URLs from search result pages, then extracts structured attributes
//! for each place, keeping all progress durable in a document store so the
//! whole job survives crashes and re-runs.

pub mod config;
pub mod crawler;
pub mod fetch;
pub mod monitor;
pub mod store;

use thiserror::Error;

/// Main error type for geoharvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] store::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Fetch error: {0}")]
    Fetch(#[from] fetch::FetchError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for geoharvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::AppContext;
pub use store::{PlaceStatus, TargetStatus};
