//! Crawl orchestration engine
//!
//! This module contains the status-driven crawl pipeline:
//! - Per-record crawl tasks (search discovery and detail extraction)
//! - The attribute extraction rule table
//! - Concurrency-bounded batch scheduling with admission control
//! - The top-level supervision loop

mod extract;
mod scheduler;
mod supervisor;
mod task;

pub use extract::{extract_fields, FieldRule, Normalizer, FIELD_RULES, REQUIRED_FIELD};
pub use scheduler::{BatchScheduler, PassReport};
pub use supervisor::run_supervisor;
pub use task::{build_search_url, run_detail_task, run_search_task, TaskOutcome};

use crate::config::Config;
use crate::fetch::FetchEngine;
use crate::monitor::CpuMonitor;
use crate::store::SqliteStore;
use crate::Result;
use indicatif::MultiProgress;
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared context handed to every component.
///
/// Built once at startup and cloned into tasks; there is no process-wide
/// mutable state anywhere else. The store is the only shared mutable
/// resource; all mutation goes through single-record atomic operations.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub store: Arc<Mutex<SqliteStore>>,
    pub engine: Arc<dyn FetchEngine>,
    pub monitor: CpuMonitor,
    pub progress: MultiProgress,
}

impl AppContext {
    pub fn new(
        config: Config,
        store: SqliteStore,
        engine: Arc<dyn FetchEngine>,
        monitor: CpuMonitor,
        progress: MultiProgress,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store: Arc::new(Mutex::new(store)),
            engine,
            monitor,
            progress,
        }
    }

    /// Locks the store, recovering a poisoned guard.
    ///
    /// A panicked task must not wedge the supervision loop: single-statement
    /// store operations leave no partial state behind, so the data under a
    /// poisoned lock is still consistent.
    pub fn store(&self) -> MutexGuard<'_, SqliteStore> {
        match self.store.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Runs the supervised crawl to completion
///
/// # Arguments
///
/// * `ctx` - The shared application context
///
/// # Returns
///
/// * `Ok(PassReport)` - Aggregate tallies once all batch groups drained
/// * `Err(HarvestError)` - Storage became unusable for the drain check
pub async fn crawl(ctx: &AppContext) -> Result<PassReport> {
    run_supervisor(ctx).await
}
