pub mod config;
pub mod edge;
pub mod engine;
pub mod error;
pub mod exchange;
pub mod hal;
#[cfg(feature = "simulation")]
pub mod hal_sim;
pub mod interpolate;
pub mod phase;
pub mod speed;
pub mod timebase;
pub mod tracker;

/// One four-stroke engine cycle: two crank revolutions.
pub const CYCLE_DEG: f32 = 720.0;

pub use config::EstimatorConfig;
pub use edge::PulseEdgeTracker;
pub use engine::{Engine, EngineLines, EngineSnapshot, ThermistorCurve};
pub use error::{ActuatorError, ConfigError, TimingError};
pub use exchange::SnapshotExchange;
pub use hal::{Direction, HardwareLine, Level, LineId};
#[cfg(feature = "simulation")]
pub use hal_sim::{SimConfig, SimulatedEngine};
pub use interpolate::AngleInterpolator;
pub use phase::{PhaseLandmark, PhaseSynchronizer, PhaseTable};
pub use speed::SpeedEstimator;
pub use timebase::TimeBase;
pub use tracker::{CrankTracker, TickOutcome, TrackerStats};
