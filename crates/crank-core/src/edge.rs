use crate::hal::Level;

/// Current and previous sampled level of one sensor line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeDetector {
    current: Level,
    previous: Level,
}

impl EdgeDetector {
    pub fn sample(&mut self, level: Level) {
        self.previous = self.current;
        self.current = level;
    }

    /// True only on the sample where the line went low to high.
    pub fn rose(&self) -> bool {
        self.current.is_high() && !self.previous.is_high()
    }

    pub fn current(&self) -> Level {
        self.current
    }

    pub fn previous(&self) -> Level {
        self.previous
    }
}

/// Rising-edge state for the cam (CPG) and crank (IPG) sensors.
///
/// Edges are found by comparing consecutive samples, so the caller must poll
/// faster than the shortest high or low phase of either sensor or a pulse
/// will be missed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PulseEdgeTracker {
    cpg: EdgeDetector,
    ipg: EdgeDetector,
}

impl PulseEdgeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample(&mut self, cpg: Level, ipg: Level) {
        self.cpg.sample(cpg);
        self.ipg.sample(ipg);
    }

    pub fn cpg_pulsed(&self) -> bool {
        self.cpg.rose()
    }

    pub fn ipg_pulsed(&self) -> bool {
        self.ipg.rose()
    }

    pub fn cpg(&self) -> EdgeDetector {
        self.cpg
    }

    pub fn ipg(&self) -> EdgeDetector {
        self.ipg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Level::{High, Low};

    #[test]
    fn reports_only_the_transition_tick() {
        let mut tracker = PulseEdgeTracker::new();
        let ipg = [Low, High, High, High, Low, High, Low];
        let expected = [false, true, false, false, false, true, false];

        for (level, want) in ipg.into_iter().zip(expected) {
            tracker.sample(Low, level);
            assert_eq!(tracker.ipg_pulsed(), want);
            assert!(!tracker.cpg_pulsed());
        }
    }

    #[test]
    fn lines_are_independent() {
        let mut tracker = PulseEdgeTracker::new();
        tracker.sample(High, Low);
        assert!(tracker.cpg_pulsed());
        assert!(!tracker.ipg_pulsed());

        tracker.sample(High, High);
        assert!(!tracker.cpg_pulsed());
        assert!(tracker.ipg_pulsed());
    }

    #[test]
    fn shifts_previous_level() {
        let mut detector = EdgeDetector::default();
        detector.sample(High);
        detector.sample(Low);
        assert_eq!(detector.previous(), High);
        assert_eq!(detector.current(), Low);
        assert!(!detector.rose());
    }
}
