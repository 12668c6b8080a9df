//! Supervision loop
//!
//! The supervisor runs one parallel pass across all configured batch groups.
//! Any unhandled fault from any group (an error escaping a scheduler or a
//! panicked group task) aborts nothing permanently: the supervisor waits a
//! fixed delay and re-runs the entire pass from scratch. Per-record progress
//! is already durable in the store, so a full re-run only re-touches
//! non-completed records. The loop ends once every group observes zero
//! unsettled records; with work forever arriving it runs forever.

use crate::crawler::scheduler::{BatchScheduler, PassReport};
use crate::crawler::AppContext;
use crate::store::DocumentStore;
use crate::Result;
use std::sync::Once;
use std::time::Duration;

static PANIC_HOOK: Once = Once::new();

/// Installs a process-wide hook that logs otherwise-fatal panics.
///
/// Panics inside chunk tasks are intercepted as join errors at the scheduler;
/// panics of whole group tasks surface as join errors here and trigger the
/// delayed restart. The hook makes sure both leave a trace before unwinding.
fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let default = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::error!("Uncaught panic: {info}");
            default(info);
        }));
    });
}

/// Runs the supervised crawl until all batch groups are drained.
///
/// Never returns early on pass faults; only storage becoming unusable for
/// the drain check itself can surface an error to the caller.
pub async fn run_supervisor(ctx: &AppContext) -> Result<PassReport> {
    install_panic_hook();

    let batch = &ctx.config.batch;
    let restart_delay = Duration::from_secs(batch.restart_delay_secs);
    let mut attempt: u64 = 1;
    let mut total = PassReport::default();

    loop {
        tracing::info!(
            attempt,
            first_group = batch.first_group,
            group_count = batch.group_count,
            "Starting crawl pass"
        );

        let mut handles = Vec::with_capacity(batch.group_count as usize);
        for offset in 0..batch.group_count {
            let batch_id = batch.first_group + offset;
            let ctx = ctx.clone();
            handles.push((
                batch_id,
                tokio::spawn(async move { BatchScheduler::new(ctx, batch_id).run_pass().await }),
            ));
        }

        let mut crash: Option<String> = None;
        for (batch_id, handle) in handles {
            match handle.await {
                Ok(Ok(report)) => total.merge(&report),
                Ok(Err(e)) => crash = Some(format!("batch group {batch_id}: {e}")),
                Err(join_err) => {
                    crash = Some(format!("batch group {batch_id} panicked: {join_err}"))
                }
            }
        }

        if let Some(reason) = crash {
            tracing::error!(attempt, reason = %reason, "Crawl pass crashed; restarting whole pass");
            attempt += 1;
            tokio::time::sleep(restart_delay).await;
            continue;
        }

        let (unsettled_targets, waiting_places) = {
            let store = ctx.store();
            (
                store.count_unsettled_targets()?,
                store.count_waiting_places()?,
            )
        };

        if unsettled_targets == 0 && waiting_places == 0 {
            tracing::info!(
                targets_completed = total.targets_completed,
                targets_failed = total.targets_failed,
                places_discovered = total.places_discovered,
                places_completed = total.places_completed,
                places_failed = total.places_failed,
                "All batch groups drained"
            );
            return Ok(total);
        }

        tracing::info!(
            attempt,
            unsettled_targets,
            waiting_places,
            "Work remains; running another pass"
        );
        attempt += 1;
    }
}
