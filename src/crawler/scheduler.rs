//! Batch scheduler: concurrency-bounded execution of crawl tasks
//!
//! One scheduler owns one batch group. A pass sweeps the group's window of
//! pending search targets (discovery phase), then its window of non-completed
//! places (detail phase). Each sweep partitions its task list into fixed-size
//! chunks: the chunk is admitted through the resource monitor, launched
//! concurrently, and fully settled before the next chunk starts (a chunk
//! barrier, not a sliding window). A single task failure never aborts the
//! sweep.

use crate::crawler::task::{run_detail_task, run_search_task, TaskOutcome};
use crate::crawler::AppContext;
use crate::store::DocumentStore;
use crate::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::task::JoinHandle;

/// Tallies from one scheduler pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    pub targets_completed: u64,
    pub targets_failed: u64,
    pub places_discovered: u64,
    pub places_completed: u64,
    pub places_failed: u64,
}

impl PassReport {
    pub fn merge(&mut self, other: &PassReport) {
        self.targets_completed += other.targets_completed;
        self.targets_failed += other.targets_failed;
        self.places_discovered += other.places_discovered;
        self.places_completed += other.places_completed;
        self.places_failed += other.places_failed;
    }
}

/// Executes crawl tasks for one batch group
pub struct BatchScheduler {
    ctx: AppContext,
    batch_id: u32,
}

impl BatchScheduler {
    pub fn new(ctx: AppContext, batch_id: u32) -> Self {
        Self { ctx, batch_id }
    }

    /// Runs one full pass over this batch group: discovery, then details
    pub async fn run_pass(&self) -> Result<PassReport> {
        let mut report = self.run_discovery_phase().await?;
        let details = self.run_detail_phase().await?;
        report.merge(&details);
        Ok(report)
    }

    /// Sweeps the group's window of pending search targets
    async fn run_discovery_phase(&self) -> Result<PassReport> {
        let batch = &self.ctx.config.batch;
        let targets = self
            .ctx
            .store()
            .fetch_pending_targets(self.batch_id, batch.batch_size)?;

        let mut report = PassReport::default();
        if targets.is_empty() {
            return Ok(report);
        }

        tracing::info!(
            batch_id = self.batch_id,
            window = targets.len(),
            "Discovery window loaded"
        );
        let bar = self.phase_bar(targets.len() as u64, "search");

        for chunk in targets.chunks(batch.scrap_batch_size as usize) {
            // Admission gate suspends the whole scheduler, not single tasks
            self.ctx.monitor.admit().await;

            let mut handles: Vec<(i64, JoinHandle<TaskOutcome>)> = Vec::with_capacity(chunk.len());
            for target in chunk {
                let ctx = self.ctx.clone();
                let target = target.clone();
                handles.push((
                    target.id,
                    tokio::spawn(async move { run_search_task(&ctx, &target).await }),
                ));
            }

            // Chunk barrier: every task settles before the next chunk launches
            for (target_id, handle) in handles {
                match handle.await {
                    Ok(TaskOutcome::Completed { new_places }) => {
                        self.ctx
                            .store()
                            .mark_target_completed(target_id, new_places as i64)?;
                        report.targets_completed += 1;
                        report.places_discovered += new_places;
                    }
                    Ok(TaskOutcome::Failed { reason }) => {
                        tracing::warn!(batch_id = self.batch_id, target_id, reason = %reason, "Search task failed");
                        self.ctx.store().mark_target_failed(target_id, &reason)?;
                        report.targets_failed += 1;
                    }
                    Err(join_err) => {
                        let reason = format!("task panicked: {join_err}");
                        tracing::error!(batch_id = self.batch_id, target_id, reason = %reason, "Search task crashed");
                        self.ctx.store().mark_target_failed(target_id, &reason)?;
                        report.targets_failed += 1;
                    }
                }
                bar.inc(1);
            }
        }

        bar.finish_and_clear();
        Ok(report)
    }

    /// Sweeps the group's window of places awaiting detail extraction
    async fn run_detail_phase(&self) -> Result<PassReport> {
        let batch = &self.ctx.config.batch;
        let places = self
            .ctx
            .store()
            .fetch_waiting_places(self.batch_id, batch.batch_size)?;

        let mut report = PassReport::default();
        if places.is_empty() {
            return Ok(report);
        }

        tracing::info!(
            batch_id = self.batch_id,
            window = places.len(),
            "Detail window loaded"
        );
        let bar = self.phase_bar(places.len() as u64, "detail");

        for chunk in places.chunks(batch.scrap_batch_size as usize) {
            self.ctx.monitor.admit().await;

            let mut handles: Vec<(i64, JoinHandle<TaskOutcome>)> = Vec::with_capacity(chunk.len());
            for place in chunk {
                let ctx = self.ctx.clone();
                let place = place.clone();
                handles.push((
                    place.id,
                    tokio::spawn(async move { run_detail_task(&ctx, &place).await }),
                ));
            }

            for (place_id, handle) in handles {
                match handle.await {
                    // Detail tasks persist their own outcome; only tally here
                    Ok(TaskOutcome::Completed { .. }) => report.places_completed += 1,
                    Ok(TaskOutcome::Failed { .. }) => report.places_failed += 1,
                    Err(join_err) => {
                        // A panicked task persisted nothing: pin the record to
                        // a terminal status so it is never lost mid-flight
                        let reason = format!("task panicked: {join_err}");
                        tracing::error!(batch_id = self.batch_id, place_id, reason = %reason, "Detail task crashed");
                        self.ctx.store().fail_place(place_id, &reason)?;
                        report.places_failed += 1;
                    }
                }
                bar.inc(1);
            }
        }

        bar.finish_and_clear();
        Ok(report)
    }

    fn phase_bar(&self, len: u64, phase: &str) -> ProgressBar {
        let bar = self.ctx.progress.add(ProgressBar::new(len));
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{prefix} |{bar:30}| {pos}/{len} ({percent}%)")
                .unwrap()
                .progress_chars("█▓░"),
        );
        bar.set_prefix(format!("batch {} {}", self.batch_id, phase));
        bar
    }
}
