use crate::error::ConfigError;
use crate::phase::{PhaseTable, DEFAULT_LANDMARKS_DEG};
use serde::{Deserialize, Serialize};

/// Trigger geometry shared by the synchronizer, speed estimator and interpolator.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Crank angle covered by one crank (IPG) pulse.
    pub increment_deg: f32,
    /// Cam (CPG) edge angles in cycle order.
    pub landmarks_deg: Vec<f32>,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            increment_deg: 6.0,
            landmarks_deg: DEFAULT_LANDMARKS_DEG.to_vec(),
        }
    }
}

impl EstimatorConfig {
    pub fn with_increment(increment_deg: f32) -> Self {
        Self {
            increment_deg,
            ..Self::default()
        }
    }

    pub fn phase_table(&self) -> Result<PhaseTable, ConfigError> {
        PhaseTable::from_landmarks(&self.landmarks_deg, self.increment_deg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.phase_table().map(|_| ())
    }
}
