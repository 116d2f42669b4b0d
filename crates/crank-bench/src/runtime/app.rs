use crate::infra::trace::{TraceEventType, TraceRecorder};
use crate::runtime::config::RuntimeConfig;
use crate::runtime::error::BenchError;
use crate::runtime::logging::init_tracing;
use crate::runtime::monitor::start_monitor;
use crank_core::{
    CrankTracker, EngineLines, EngineSnapshot, HardwareLine, SimulatedEngine, SnapshotExchange,
    ThermistorCurve, TickOutcome, TimeBase, TimingError, TrackerStats,
};
use serde_json::json;
use std::sync::{atomic::AtomicBool, atomic::Ordering, Arc};
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

/// Snapshots go to the exchange about once per simulated millisecond.
const PUBLISH_PERIOD_US: u64 = 1_000;

type BenchTracker = CrankTracker<SimulatedEngine>;

struct PollSummary {
    stats: TrackerStats,
    last: EngineSnapshot,
    overruns: u64,
}

pub fn run_from_args() -> Result<(), BenchError> {
    let config = RuntimeConfig::from_env();
    if config.show_help {
        RuntimeConfig::print_help();
        return Ok(());
    }
    run(config)
}

pub fn run(config: RuntimeConfig) -> Result<(), BenchError> {
    init_tracing(config.log_format);

    let timebase = TimeBase::new();
    let estimator = config.estimator();
    estimator.validate()?;

    let trace = match config.trace_path.as_deref() {
        Some(path) => {
            let recorder = TraceRecorder::new(path)?;
            info!(path = %path.display(), "Event trace enabled");
            Some(Arc::new(recorder))
        }
        None => None,
    };

    let lines = EngineLines::default();
    let sim = SimulatedEngine::new(config.simulation(), lines.clone());
    let tracker = CrankTracker::new(sim, lines, ThermistorCurve::default(), &estimator)?;

    if let Some(ref trace) = trace {
        trace.record_event(
            0,
            timebase.unix_us(),
            TraceEventType::SessionStart,
            json!({
                "version": env!("CARGO_PKG_VERSION"),
                "rpm": config.rpm,
                "increment_deg": config.increment_deg,
                "poll_us": config.poll_us,
                "duration_ms": config.duration_ms,
                "realtime": config.realtime,
            }),
        )?;
    }

    let exchange = Arc::new(SnapshotExchange::new());
    let stop = Arc::new(AtomicBool::new(false));
    let monitor = start_monitor(
        Arc::clone(&exchange),
        Arc::clone(&stop),
        Duration::from_millis(config.report_ms.max(1)),
    );

    info!(
        rpm = config.rpm,
        increment_deg = config.increment_deg,
        poll_us = config.poll_us,
        duration_ms = config.duration_ms,
        realtime = config.realtime,
        "Starting crank tracker poll loop"
    );

    let poll_config = config.clone();
    let poll_exchange = Arc::clone(&exchange);
    let poll_trace = trace.clone();
    let poll_handle = thread::spawn(move || {
        let mut tracker = tracker;
        poll_loop(
            &mut tracker,
            &poll_config,
            &poll_exchange,
            poll_trace.as_deref(),
            &timebase,
        )
    });

    let summary = poll_handle.join().map_err(|_| BenchError::PollThread);
    stop.store(true, Ordering::Relaxed);
    join_monitor(monitor);
    let summary = summary??;

    let stats = &summary.stats;
    info!(
        ticks = stats.ticks,
        ipg_pulses = stats.ipg_pulses,
        cpg_pulses = stats.cpg_pulses,
        phase_syncs = stats.phase_syncs,
        phase_faults = stats.phase_faults,
        velocity_rejections = stats.velocity_rejections,
        final_rpm = summary.last.rpm,
        final_crank_deg = summary.last.crank_angle_deg,
        "Run complete"
    );
    if summary.overruns > 0 {
        warn!(
            overruns = summary.overruns,
            "Polling fell behind the wall clock; edges may have been missed"
        );
    }
    if !summary.last.is_running {
        warn!("Engine never synchronized; run longer or check the phase table");
    }

    if let Some(ref trace) = trace {
        trace.record_event(
            summary.last.timestamp_us,
            timebase.unix_us(),
            TraceEventType::SessionShutdown,
            json!({
                "ticks": stats.ticks,
                "phase_syncs": stats.phase_syncs,
                "phase_faults": stats.phase_faults,
                "velocity_rejections": stats.velocity_rejections,
                "final_rpm": summary.last.rpm,
            }),
        )?;
        trace.flush()?;
    }

    Ok(())
}

/// Returns false when the monitor thread panicked.
fn join_monitor(monitor: thread::JoinHandle<()>) -> bool {
    match monitor.join() {
        Ok(()) => true,
        Err(_) => {
            warn!("Monitor thread panicked; periodic state reports stopped early");
            false
        }
    }
}

fn poll_loop(
    tracker: &mut BenchTracker,
    config: &RuntimeConfig,
    exchange: &SnapshotExchange,
    trace: Option<&TraceRecorder>,
    timebase: &TimeBase,
) -> std::io::Result<PollSummary> {
    let poll_us = config.poll_period().as_micros() as u64;
    let duration_us = config.duration_us();
    let publish_every = (PUBLISH_PERIOD_US / poll_us).max(1);
    let started_us = timebase.now_us();
    let mut overruns = 0u64;

    while tracker.hardware().now_micros() < duration_us {
        tracker.hardware_mut().advance(poll_us);
        if config.realtime {
            let deadline_us = started_us + tracker.hardware().now_micros();
            if timebase.spin_until(deadline_us) > config.poll_period() {
                overruns += 1;
            }
        }

        let outcome = tracker.tick();
        if let Some(trace) = trace {
            record_outcome(trace, timebase, tracker, &outcome)?;
        }
        if tracker.stats().ticks % publish_every == 0 {
            exchange.publish(tracker.snapshot());
        }
    }

    tracker.shutdown();
    let last = tracker.snapshot();
    exchange.publish(last);

    Ok(PollSummary {
        stats: tracker.stats().clone(),
        last,
        overruns,
    })
}

fn record_outcome(
    trace: &TraceRecorder,
    timebase: &TimeBase,
    tracker: &BenchTracker,
    outcome: &TickOutcome,
) -> std::io::Result<()> {
    let engine = tracker.engine();

    if outcome.synchronized {
        trace.record_event(
            outcome.now_us,
            timebase.unix_us(),
            TraceEventType::PhaseSynchronized,
            json!({
                "angle_deg": engine.crank_angle(),
                "rpm": tracker.snapshot().rpm,
            }),
        )?;
    }

    if let Some(Err(TimingError::PartialWindow { pulses })) = outcome.phase {
        trace.record_event(
            outcome.now_us,
            timebase.unix_us(),
            TraceEventType::PhaseArmed,
            json!({ "discarded_pulses": pulses }),
        )?;
    }

    if let Some(Err(TimingError::Unsynchronized { pulses })) = outcome.phase {
        trace.record_event(
            outcome.now_us,
            timebase.unix_us(),
            TraceEventType::PhaseFault,
            json!({
                "pulses": pulses,
                "held_angle_deg": engine.crank_angle(),
                "running": engine.is_running(),
            }),
        )?;
    }

    if let Some(Err(e)) = outcome.velocity {
        trace.record_event(
            outcome.now_us,
            timebase.unix_us(),
            TraceEventType::VelocityRejected,
            json!({
                "error": e.to_string(),
                "held_velocity": engine.angular_velocity(),
            }),
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monitor_panic_is_reported() {
        let monitor: thread::JoinHandle<()> = thread::spawn(|| panic!("monitor failure"));
        assert!(!join_monitor(monitor));

        let monitor = thread::spawn(|| {});
        assert!(join_monitor(monitor));
    }
}
