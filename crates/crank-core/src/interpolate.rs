use crate::engine::Engine;
use crate::error::TimingError;

/// Linear angle estimate between confirmed crank pulses:
/// `theta(t) = theta_i + w * (t - t_i)`.
///
/// The extrapolated change never exceeds one crank increment, since the next
/// pulse is due before then. Going past it means a pulse was missed or the
/// engine stalled, and the estimate parks at the increment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleInterpolator {
    increment_deg: f32,
}

impl AngleInterpolator {
    pub fn new(increment_deg: f32) -> Self {
        Self { increment_deg }
    }

    /// The result lies in `[last_angle, last_angle + increment]` and is not
    /// wrapped at 720.
    pub fn interpolate(&self, last_angle: f32, velocity: f32, last_pulse_us: u64, now_us: u64) -> f32 {
        let elapsed_us = now_us.saturating_sub(last_pulse_us);
        let delta = velocity * elapsed_us as f32;
        if delta < self.increment_deg {
            last_angle + delta
        } else {
            last_angle + self.increment_deg
        }
    }

    pub fn estimate(&self, engine: Option<&Engine>, last_pulse_us: u64, now_us: u64) -> Result<f32, TimingError> {
        let engine = engine.ok_or(TimingError::NoEngine)?;
        Ok(self.interpolate(
            engine.crank_angle(),
            engine.angular_velocity(),
            last_pulse_us,
            now_us,
        ))
    }

    pub fn increment_deg(&self) -> f32 {
        self.increment_deg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_to_one_increment() {
        let interp = AngleInterpolator::new(6.0);
        assert_eq!(interp.interpolate(100.0, 0.006, 0, 2000), 106.0);
    }

    #[test]
    fn extrapolates_within_increment() {
        let interp = AngleInterpolator::new(6.0);
        assert_eq!(interp.interpolate(100.0, 1.0 / 256.0, 1000, 1512), 102.0);
    }

    #[test]
    fn clock_behind_last_pulse_counts_as_no_time() {
        let interp = AngleInterpolator::new(6.0);
        assert_eq!(interp.interpolate(42.0, 0.006, 5000, 4000), 42.0);
    }

    #[test]
    fn missing_engine_is_an_error() {
        let interp = AngleInterpolator::new(6.0);
        assert_eq!(interp.estimate(None, 0, 10), Err(TimingError::NoEngine));
    }
}
