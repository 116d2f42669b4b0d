use serde::{Deserialize, Serialize};

/// Platform pin number. What the number addresses is up to the
/// [`HardwareLine`] implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub struct LineId(pub u8);

/// Digital line state. Unwritten outputs and unknown inputs read as `Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum Level {
    #[default]
    Low,
    High,
}

impl Level {
    pub fn is_high(self) -> bool {
        self == Level::High
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

/// Pin-level access supplied by the platform. Calls are expected to return
/// immediately; the estimator never waits on hardware.
pub trait HardwareLine {
    fn configure_line(&mut self, line: LineId, direction: Direction);
    fn read_digital(&mut self, line: LineId) -> Level;
    /// Raw ADC sample, scaled by the caller.
    fn read_analog(&mut self, line: LineId) -> u16;
    fn write_digital(&mut self, line: LineId, level: Level);
    /// Monotonic microseconds.
    fn now_micros(&self) -> u64;
}
