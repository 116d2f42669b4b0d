use crate::config::EstimatorConfig;
use crate::error::{ConfigError, TimingError};
use crate::CYCLE_DEG;
use serde::{Deserialize, Serialize};

/// Cylinder 1 at TDC before the intake stroke.
pub const CYCLE_START_DEG: f32 = 0.0;
/// Cam reference pulse shortly after cycle start.
pub const REFERENCE_DEG: f32 = 60.0;
/// Cylinder 1 at TDC before the power stroke.
pub const MID_CYCLE_DEG: f32 = 360.0;

pub const DEFAULT_LANDMARKS_DEG: [f32; 3] = [CYCLE_START_DEG, REFERENCE_DEG, MID_CYCLE_DEG];

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct PhaseLandmark {
    /// Crank pulses counted since the previous cam edge when this cam edge arrives.
    pub pulses: u8,
    /// Absolute crank angle at this cam edge, in `[0, 720)`.
    pub angle_deg: f32,
}

/// Maps a crank pulse count between cam edges to an absolute crank angle.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PhaseTable {
    landmarks: Vec<PhaseLandmark>,
}

impl PhaseTable {
    pub fn new(landmarks: Vec<PhaseLandmark>) -> Result<Self, ConfigError> {
        if landmarks.is_empty() {
            return Err(ConfigError::EmptyPhaseTable);
        }
        for (i, landmark) in landmarks.iter().enumerate() {
            if !(0.0..CYCLE_DEG).contains(&landmark.angle_deg) {
                return Err(ConfigError::LandmarkOutOfRange(landmark.angle_deg));
            }
            if landmark.pulses == u8::MAX {
                return Err(ConfigError::GapTooLong {
                    angle_deg: landmark.angle_deg,
                    pulses: u32::from(landmark.pulses),
                });
            }
            if landmarks[..i].iter().any(|l| l.pulses == landmark.pulses) {
                return Err(ConfigError::DuplicatePulseCount(landmark.pulses));
            }
        }
        Ok(Self { landmarks })
    }

    /// Derives pulse counts from cam landmark angles, given in cycle order.
    ///
    /// Each landmark's count is the angular gap back to the previous landmark
    /// (wrapping from the first to the last) divided by the crank increment.
    pub fn from_landmarks(landmarks_deg: &[f32], increment_deg: f32) -> Result<Self, ConfigError> {
        if !(increment_deg.is_finite() && increment_deg > 0.0) {
            return Err(ConfigError::InvalidIncrement(increment_deg));
        }
        let Some(&last) = landmarks_deg.last() else {
            return Err(ConfigError::EmptyPhaseTable);
        };

        let mut previous = last;
        let mut landmarks = Vec::with_capacity(landmarks_deg.len());
        for (i, &angle_deg) in landmarks_deg.iter().enumerate() {
            if !(0.0..CYCLE_DEG).contains(&angle_deg) {
                return Err(ConfigError::LandmarkOutOfRange(angle_deg));
            }
            if i > 0 && angle_deg <= previous {
                return Err(ConfigError::UnorderedLandmarks(previous, angle_deg));
            }

            let mut gap_deg = (angle_deg - previous).rem_euclid(CYCLE_DEG);
            if gap_deg == 0.0 {
                // A single landmark spans the whole cycle.
                gap_deg = CYCLE_DEG;
            }
            let pulses = gap_deg / increment_deg;
            if (pulses - pulses.round()).abs() > 1e-3 {
                return Err(ConfigError::UnevenGap {
                    angle_deg,
                    gap_deg,
                    increment_deg,
                });
            }
            let pulses = pulses.round() as u32;
            // The counter saturates at u8::MAX, so that value cannot name a gap.
            let pulses = u8::try_from(pulses)
                .ok()
                .filter(|&p| p < u8::MAX)
                .ok_or(ConfigError::GapTooLong { angle_deg, pulses })?;

            landmarks.push(PhaseLandmark { pulses, angle_deg });
            previous = angle_deg;
        }

        Self::new(landmarks)
    }

    /// Four-stroke cam pattern: cycle start, reference and mid-cycle.
    pub fn four_stroke(increment_deg: f32) -> Result<Self, ConfigError> {
        Self::from_landmarks(&DEFAULT_LANDMARKS_DEG, increment_deg)
    }

    /// Looks up the angle for a completed window's pulse count.
    pub fn true_crank_angle(&self, pulses: u8) -> Result<f32, TimingError> {
        self.landmarks
            .iter()
            .find(|l| l.pulses == pulses)
            .map(|l| l.angle_deg)
            .ok_or(TimingError::Unsynchronized { pulses })
    }

    pub fn landmarks(&self) -> &[PhaseLandmark] {
        &self.landmarks
    }

    pub fn pulses_for(&self, angle_deg: f32) -> Option<u8> {
        self.landmarks
            .iter()
            .find(|l| l.angle_deg == angle_deg)
            .map(|l| l.pulses)
    }
}

/// Counts crank pulses between cam edges and resolves the count on each cam edge.
///
/// Counting only means something once a cam edge has opened the window, so
/// the first cam edge after construction arms the synchronizer and never
/// resolves to an angle.
#[derive(Debug, Clone)]
pub struct PhaseSynchronizer {
    table: PhaseTable,
    pulses_since_cpg: u8,
    armed: bool,
}

impl PhaseSynchronizer {
    pub fn new(table: PhaseTable) -> Self {
        Self {
            table,
            pulses_since_cpg: 0,
            armed: false,
        }
    }

    pub fn from_config(config: &EstimatorConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.phase_table()?))
    }

    pub fn on_ipg_pulse(&mut self) {
        self.pulses_since_cpg = self.pulses_since_cpg.saturating_add(1);
    }

    /// Resolves the count accumulated since the previous cam edge and starts
    /// a new count. The count resets whether or not it matched.
    ///
    /// Returns [`TimingError::PartialWindow`] for the first cam edge and
    /// [`TimingError::Unsynchronized`] for a saturated count.
    pub fn on_cpg_pulse(&mut self) -> Result<f32, TimingError> {
        let pulses = std::mem::take(&mut self.pulses_since_cpg);
        if !std::mem::replace(&mut self.armed, true) {
            return Err(TimingError::PartialWindow { pulses });
        }
        if pulses == u8::MAX {
            return Err(TimingError::Unsynchronized { pulses });
        }
        self.table.true_crank_angle(pulses)
    }

    /// True once a cam edge has opened a counting window.
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn pulses_since_cpg(&self) -> u8 {
        self.pulses_since_cpg
    }

    pub fn table(&self) -> &PhaseTable {
        &self.table
    }
}
