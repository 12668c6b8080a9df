//! Resource monitor for admission control
//!
//! Samples process-host CPU utilization on a fixed interval, independent of
//! task admission. The scheduler gates each chunk of concurrent work through
//! [`CpuMonitor::admit`]; sustained load above the critical threshold is a
//! fail-fast valve that terminates the process (exit code 1) so an external
//! process manager can restart it.

use crate::config::MonitorConfig;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use sysinfo::System;

/// Tracks how long utilization has stayed above the critical threshold.
///
/// Pure dwell-time logic, separated from sampling so it can be tested with
/// synthetic clocks. Returns true once critical samples have been observed
/// continuously for the dwell duration.
#[derive(Debug)]
pub struct OverloadTracker {
    dwell: Duration,
    over_since: Option<Instant>,
}

impl OverloadTracker {
    pub fn new(dwell: Duration) -> Self {
        Self {
            dwell,
            over_since: None,
        }
    }

    /// Feeds one sample; `critical` is whether it exceeded the critical
    /// threshold. Any non-critical sample resets the dwell.
    pub fn observe(&mut self, critical: bool, now: Instant) -> bool {
        if !critical {
            self.over_since = None;
            return false;
        }
        let since = *self.over_since.get_or_insert(now);
        now.duration_since(since) >= self.dwell
    }
}

/// Shared handle to the CPU sampler
#[derive(Clone)]
pub struct CpuMonitor {
    config: MonitorConfig,
    // Latest utilization in hundredths of a percent
    latest: Arc<AtomicU32>,
}

impl CpuMonitor {
    /// Starts the background sampler and returns a shared handle.
    ///
    /// The sampler refreshes CPU usage every `sample_interval_secs`. When
    /// utilization stays above `critical_cpu_percent` for the configured
    /// dwell, it logs and terminates the process with exit code 1.
    pub fn spawn(config: MonitorConfig) -> Self {
        let monitor = Self::fixed(config.clone(), 0.0);
        let latest = Arc::clone(&monitor.latest);

        tokio::spawn(async move {
            let mut system = System::new();
            let mut tracker =
                OverloadTracker::new(Duration::from_secs(config.overload_dwell_secs));
            let interval = Duration::from_secs(config.sample_interval_secs);

            loop {
                system.refresh_cpu_usage();
                let cpu = system.global_cpu_info().cpu_usage();
                latest.store((cpu * 100.0) as u32, Ordering::Relaxed);

                if tracker.observe(cpu > config.critical_cpu_percent, Instant::now()) {
                    tracing::error!(
                        utilization = cpu as f64,
                        "Sustained CPU overload; terminating for external restart"
                    );
                    std::process::exit(1);
                }

                tokio::time::sleep(interval).await;
            }
        });

        monitor
    }

    /// A monitor that never samples and always reports `utilization`.
    ///
    /// Useful to disable throttling (`fixed(config, 0.0)`) and for tests.
    pub fn fixed(config: MonitorConfig, utilization: f32) -> Self {
        Self {
            config,
            latest: Arc::new(AtomicU32::new((utilization * 100.0) as u32)),
        }
    }

    /// Latest sampled utilization as a percentage
    pub fn utilization(&self) -> f32 {
        self.latest.load(Ordering::Relaxed) as f32 / 100.0
    }

    /// Whether the latest sample exceeds `threshold`
    pub fn should_throttle(&self, threshold: f32) -> bool {
        self.utilization() > threshold
    }

    /// Suspends the caller while the host is above the throttle threshold.
    ///
    /// Re-checks every `cooldown_secs`. This gates whole chunks of work, not
    /// individual tasks.
    pub async fn admit(&self) {
        while self.should_throttle(self.config.throttle_cpu_percent) {
            tracing::warn!(
                utilization = self.utilization() as f64,
                cooldown_secs = self.config.cooldown_secs,
                "High CPU usage; pausing scheduler to cool down"
            );
            tokio::time::sleep(Duration::from_secs(self.config.cooldown_secs)).await;
        }
    }
}
