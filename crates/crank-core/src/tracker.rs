use crate::config::EstimatorConfig;
use crate::engine::{Engine, EngineLines, EngineSnapshot, ThermistorCurve};
use crate::error::{ConfigError, TimingError};
use crate::hal::HardwareLine;
use crate::interpolate::AngleInterpolator;
use crate::phase::PhaseSynchronizer;
use crate::speed::SpeedEstimator;
use log::{debug, info, warn};

/// Running counters over the life of a tracker.
#[derive(Clone, Default, Debug)]
pub struct TrackerStats {
    /// Calls to [`CrankTracker::tick`].
    pub ticks: u64,
    /// Rising edges on the crank line.
    pub ipg_pulses: u64,
    /// Rising edges on the cam line, including the one that arms phase sync.
    pub cpg_pulses: u64,
    /// Cam edges that set an absolute angle.
    pub phase_syncs: u64,
    /// Cam edges after arming whose pulse count matched no landmark.
    pub phase_faults: u64,
    /// Crank intervals that gave no velocity.
    pub velocity_rejections: u64,
}

/// What a single poll observed and changed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickOutcome {
    /// Hardware clock at the start of the tick.
    pub now_us: u64,
    /// Rising edge on the crank line this tick.
    pub ipg_pulsed: bool,
    /// Rising edge on the cam line this tick.
    pub cpg_pulsed: bool,
    /// Set when a crank pulse closed an interval.
    pub velocity: Option<Result<f32, TimingError>>,
    /// Set on every cam edge. The first one after start is always
    /// [`TimingError::PartialWindow`].
    pub phase: Option<Result<f32, TimingError>>,
    /// True on the tick the engine first gained an absolute angle.
    pub synchronized: bool,
}

/// Poll-driven crank position tracking over one hardware implementation.
///
/// On a phase fault the last angle is held and tracking continues; on an
/// undefined velocity the previous velocity is held. Rotation direction and
/// missed pulses are not detected.
pub struct CrankTracker<H: HardwareLine> {
    hw: H,
    engine: Engine,
    sync: PhaseSynchronizer,
    speed: SpeedEstimator,
    interp: AngleInterpolator,
    stats: TrackerStats,
}

impl<H: HardwareLine> CrankTracker<H> {
    pub fn new(
        mut hw: H,
        lines: EngineLines,
        thermistor: ThermistorCurve,
        config: &EstimatorConfig,
    ) -> Result<Self, ConfigError> {
        let sync = PhaseSynchronizer::from_config(config)?;
        let engine = Engine::init(&mut hw, lines, thermistor);
        debug!(
            "phase table for {} degree increment: {:?}",
            config.increment_deg,
            sync.table().landmarks()
        );
        Ok(Self {
            hw,
            engine,
            sync,
            speed: SpeedEstimator::new(config.increment_deg),
            interp: AngleInterpolator::new(config.increment_deg),
            stats: TrackerStats::default(),
        })
    }

    /// One poll. Must run faster than the shortest sensor high or low phase.
    ///
    /// A crank pulse seen on the same tick as a cam edge is counted toward
    /// the window the cam edge closes.
    pub fn tick(&mut self) -> TickOutcome {
        let now_us = self.hw.now_micros();
        self.engine.update_signals(&mut self.hw);

        let mut outcome = TickOutcome {
            now_us,
            ipg_pulsed: self.engine.ipg_pulsed(),
            cpg_pulsed: self.engine.cpg_pulsed(),
            ..TickOutcome::default()
        };

        if outcome.ipg_pulsed {
            self.stats.ipg_pulses += 1;
            self.sync.on_ipg_pulse();

            if let Some(last_us) = self.engine.record_ipg_pulse(now_us) {
                let width_us = now_us.saturating_sub(last_us);
                let velocity = self.engine.update_velocity(&self.speed, width_us);
                if let Err(e) = velocity {
                    self.stats.velocity_rejections += 1;
                    debug!("holding velocity {}: {}", self.engine.angular_velocity(), e);
                }
                outcome.velocity = Some(velocity);
            }

            if self.engine.is_running() {
                self.engine.advance_crank(self.speed.increment_deg());
            }
        }

        if outcome.cpg_pulsed {
            self.stats.cpg_pulses += 1;
            let phase = self.sync.on_cpg_pulse();
            match phase {
                Ok(angle) => {
                    if !self.engine.is_running() {
                        outcome.synchronized = true;
                        info!("phase synchronized at {} degrees, t={}us", angle, now_us);
                    }
                    self.stats.phase_syncs += 1;
                    self.engine.set_crank(angle);
                }
                Err(TimingError::PartialWindow { pulses }) => {
                    debug!(
                        "first cam edge after {} crank pulses, counting from here",
                        pulses
                    );
                }
                Err(e) => {
                    self.stats.phase_faults += 1;
                    warn!(
                        "phase fault, holding crank at {:.1}: {}",
                        self.engine.crank_angle(),
                        e
                    );
                }
            }
            outcome.phase = Some(phase);
        }

        self.stats.ticks += 1;
        outcome
    }

    /// Sub-pulse angle at the hardware's current time.
    pub fn estimate_angle(&self) -> Result<f32, TimingError> {
        self.engine.estimate_angle(&self.interp, self.hw.now_micros())
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        self.engine.snapshot(self.hw.now_micros())
    }

    pub fn shutdown(&mut self) {
        self.engine.shutdown(&mut self.hw);
        info!(
            "tracker shut down after {} ticks, {} phase faults",
            self.stats.ticks, self.stats.phase_faults
        );
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn hardware(&self) -> &H {
        &self.hw
    }

    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.hw
    }

    pub fn stats(&self) -> &TrackerStats {
        &self.stats
    }
}
