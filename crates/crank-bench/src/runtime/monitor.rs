use crank_core::SnapshotExchange;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

/// Reads published snapshots off the poll thread and logs them every `period`.
pub fn start_monitor(
    exchange: Arc<SnapshotExchange>,
    stop: Arc<AtomicBool>,
    period: Duration,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut last_count = 0u64;
        while !stop.load(Ordering::Relaxed) {
            thread::sleep(period);

            let count = exchange.published_count();
            if count == last_count {
                if count > 0 && !stop.load(Ordering::Relaxed) {
                    warn!(published = count, "no new engine state since last report");
                }
                continue;
            }
            last_count = count;

            let snapshot = exchange.read();
            info!(
                tracker_us = snapshot.timestamp_us,
                crank_deg = snapshot.crank_angle_deg,
                rpm = snapshot.rpm,
                temperature_c = snapshot.temperature_c,
                running = snapshot.is_running,
                "engine state"
            );
        }
    })
}
