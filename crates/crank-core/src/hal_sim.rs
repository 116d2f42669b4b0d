use crate::engine::EngineLines;
use crate::hal::{Direction, HardwareLine, Level, LineId};
use crate::phase::DEFAULT_LANDMARKS_DEG;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const CYCLE_DEG: f64 = 720.0;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SimConfig {
    pub rpm: f64,
    /// Crank wheel tooth pitch. Each tooth is high for the first half of its pitch.
    pub increment_deg: f64,
    /// Cam edge angles.
    pub landmarks_deg: Vec<f64>,
    /// How long the cam line stays high after each landmark.
    pub cam_pulse_deg: f64,
    /// Crank angle at simulated time zero.
    pub start_angle_deg: f64,
    pub thermistor_raw: u16,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            rpm: 1200.0,
            increment_deg: 6.0,
            landmarks_deg: DEFAULT_LANDMARKS_DEG.iter().map(|&a| f64::from(a)).collect(),
            cam_pulse_deg: 3.0,
            start_angle_deg: 200.0,
            thermistor_raw: 287,
        }
    }
}

/// Constant-speed engine producing cam and crank sensor waveforms.
///
/// Time only moves when [`SimulatedEngine::advance`] is called, which keeps
/// runs reproducible regardless of host load.
#[derive(Debug, Clone)]
pub struct SimulatedEngine {
    config: SimConfig,
    lines: EngineLines,
    clock_us: u64,
    angle_deg: f64,
    directions: HashMap<LineId, Direction>,
    outputs: HashMap<LineId, Level>,
}

impl SimulatedEngine {
    pub fn new(config: SimConfig, lines: EngineLines) -> Self {
        let angle_deg = config.start_angle_deg.rem_euclid(CYCLE_DEG);
        Self {
            config,
            lines,
            clock_us: 0,
            angle_deg,
            directions: HashMap::new(),
            outputs: HashMap::new(),
        }
    }

    pub fn advance(&mut self, dt_us: u64) {
        self.clock_us += dt_us;
        let deg_per_us = self.config.rpm * 360.0 / 60_000_000.0;
        self.angle_deg = (self.angle_deg + deg_per_us * dt_us as f64).rem_euclid(CYCLE_DEG);
    }

    pub fn set_rpm(&mut self, rpm: f64) {
        self.config.rpm = rpm.max(0.0);
    }

    pub fn set_thermistor_raw(&mut self, raw: u16) {
        self.config.thermistor_raw = raw;
    }

    /// Actual crank angle in `[0, 720)`.
    pub fn true_angle(&self) -> f64 {
        self.angle_deg
    }

    pub fn direction(&self, line: LineId) -> Option<Direction> {
        self.directions.get(&line).copied()
    }

    pub fn output(&self, line: LineId) -> Level {
        self.outputs.get(&line).copied().unwrap_or_default()
    }

    fn ipg_level(&self) -> Level {
        let pitch = self.config.increment_deg;
        Level::from(self.angle_deg.rem_euclid(pitch) < pitch / 2.0)
    }

    fn cpg_level(&self) -> Level {
        Level::from(self.config.landmarks_deg.iter().any(|&landmark| {
            (self.angle_deg - landmark).rem_euclid(CYCLE_DEG) < self.config.cam_pulse_deg
        }))
    }
}

impl HardwareLine for SimulatedEngine {
    fn configure_line(&mut self, line: LineId, direction: Direction) {
        self.directions.insert(line, direction);
    }

    fn read_digital(&mut self, line: LineId) -> Level {
        if self.direction(line) == Some(Direction::Output) {
            self.output(line)
        } else if line == self.lines.cpg {
            self.cpg_level()
        } else if line == self.lines.ipg {
            self.ipg_level()
        } else {
            Level::Low
        }
    }

    fn read_analog(&mut self, line: LineId) -> u16 {
        if line == self.lines.thermistor {
            self.config.thermistor_raw
        } else {
            0
        }
    }

    fn write_digital(&mut self, line: LineId, level: Level) {
        self.outputs.insert(line, level);
    }

    fn now_micros(&self) -> u64 {
        self.clock_us
    }
}
