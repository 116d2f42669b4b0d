use thiserror::Error;

/// Recoverable per-pulse failures. None of these invalidate Engine state; the
/// caller holds its last known good value and waits for the next pulse.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum TimingError {
    /// Cam edge closed a window whose pulse count is not in the phase table.
    #[error("{pulses} crank pulses since the last cam edge match no phase landmark")]
    Unsynchronized { pulses: u8 },
    /// First cam edge seen. It opens the first full window; the pulses
    /// counted before it started at an unknown angle.
    #[error("first cam edge after {pulses} crank pulses only opens a counting window")]
    PartialWindow { pulses: u8 },
    /// Zero time between two crank pulses.
    #[error("crank pulse interval of {width_us} us gives no defined velocity")]
    UndefinedVelocity { width_us: u64 },
    /// Interpolation was asked for without an engine.
    #[error("no engine state to estimate from")]
    NoEngine,
    /// Interpolation before the first crank pulse.
    #[error("no crank pulse has been recorded yet")]
    NoPulseReference,
    /// Interpolation before phase sync; the crank angle is not absolute yet.
    #[error("crank angle has not been synchronized to the cam")]
    NotSynchronized,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("crank pulse increment must be finite and positive, got {0}")]
    InvalidIncrement(f32),
    #[error("phase table needs at least one landmark")]
    EmptyPhaseTable,
    #[error("landmark angle {0} is outside [0, 720)")]
    LandmarkOutOfRange(f32),
    #[error("landmarks {0} and {1} are not ordered within the cycle")]
    UnorderedLandmarks(f32, f32),
    #[error("gap of {gap_deg} degrees before landmark {angle_deg} is not a whole number of {increment_deg} degree pulses")]
    UnevenGap {
        angle_deg: f32,
        gap_deg: f32,
        increment_deg: f32,
    },
    #[error("gap before landmark {angle_deg} needs {pulses} pulses, more than a count can hold")]
    GapTooLong { angle_deg: f32, pulses: u32 },
    #[error("pulse count {0} maps to more than one landmark")]
    DuplicatePulseCount(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ActuatorError {
    #[error("no actuator for cylinder {cylinder}, engine has {cylinders}")]
    NoSuchCylinder { cylinder: usize, cylinders: usize },
}
