use crate::error::TimingError;

const US_PER_MINUTE: f32 = 60_000_000.0;
const DEG_PER_REV: f32 = 360.0;

/// Angular velocity from a single crank pulse interval.
///
/// Only the most recent interval is used. There is no smoothing across
/// pulses, so tooth-to-tooth jitter passes straight through.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedEstimator {
    increment_deg: f32,
}

impl SpeedEstimator {
    pub fn new(increment_deg: f32) -> Self {
        Self { increment_deg }
    }

    /// Degrees per microsecond for one pulse interval of `width_us`.
    pub fn estimate(&self, width_us: u64) -> Result<f32, TimingError> {
        if width_us == 0 {
            return Err(TimingError::UndefinedVelocity { width_us });
        }
        Ok(self.increment_deg / width_us as f32)
    }

    pub fn increment_deg(&self) -> f32 {
        self.increment_deg
    }

    pub fn to_rpm(deg_per_us: f32) -> f32 {
        deg_per_us * US_PER_MINUTE / DEG_PER_REV
    }
}
