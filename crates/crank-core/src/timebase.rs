use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Host clock for bench runs. Targets supply their own timer through
/// [`crate::hal::HardwareLine::now_micros`].
#[derive(Debug, Clone, Copy)]
pub struct TimeBase {
    start: Instant,
}

impl TimeBase {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Monotonic microseconds since construction.
    pub fn now_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    /// Wall-clock microseconds since the Unix epoch, for trace records only.
    pub fn unix_us(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_micros() as u64
    }

    /// Busy-waits until `deadline_us` on this clock. Returns how far past the
    /// deadline the call already was, zero if it had to wait.
    pub fn spin_until(&self, deadline_us: u64) -> Duration {
        let now = self.now_us();
        if now >= deadline_us {
            return Duration::from_micros(now - deadline_us);
        }
        while self.now_us() < deadline_us {
            std::hint::spin_loop();
        }
        Duration::ZERO
    }
}

impl Default for TimeBase {
    fn default() -> Self {
        Self::new()
    }
}
