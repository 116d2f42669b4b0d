use crate::edge::PulseEdgeTracker;
use crate::error::{ActuatorError, TimingError};
use crate::hal::{Direction, HardwareLine, Level, LineId};
use crate::interpolate::AngleInterpolator;
use crate::speed::SpeedEstimator;
use crate::CYCLE_DEG;
use log::{debug, info};
use serde::{Deserialize, Serialize};

pub const CYLINDERS: usize = 4;

/// Wraps any angle into `[0, 720)`.
pub fn wrap_angle(angle_deg: f32) -> f32 {
    let wrapped = angle_deg.rem_euclid(CYCLE_DEG);
    // rem_euclid can round up to the modulus for tiny negative inputs.
    if wrapped >= CYCLE_DEG {
        0.0
    } else {
        wrapped
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EngineLines {
    pub coils: [LineId; CYLINDERS],
    pub injectors: [LineId; CYLINDERS],
    pub thermistor: LineId,
    pub cpg: LineId,
    pub ipg: LineId,
}

impl Default for EngineLines {
    fn default() -> Self {
        Self {
            coils: [LineId(2), LineId(3), LineId(4), LineId(5)],
            injectors: [LineId(6), LineId(7), LineId(8), LineId(9)],
            thermistor: LineId(14),
            cpg: LineId(10),
            ipg: LineId(11),
        }
    }
}

/// Linear thermistor transfer: `offset_c + slope_c_per_v * volts`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ThermistorCurve {
    pub supply_v: f32,
    pub adc_max: u16,
    pub offset_c: f32,
    pub slope_c_per_v: f32,
}

impl Default for ThermistorCurve {
    fn default() -> Self {
        Self {
            supply_v: 5.0,
            adc_max: 1023,
            offset_c: -50.0,
            slope_c_per_v: 100.0,
        }
    }
}

impl ThermistorCurve {
    pub fn celsius(&self, raw: u16) -> f32 {
        let volts = self.supply_v * f32::from(raw) / f32::from(self.adc_max.max(1));
        self.offset_c + self.slope_c_per_v * volts
    }
}

/// Copy of engine state handed to other threads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EngineSnapshot {
    /// Hardware clock when the snapshot was taken.
    pub timestamp_us: u64,
    /// Angle at the last crank pulse, in `[0, 720)`.
    pub crank_angle_deg: f32,
    /// Degrees per microsecond.
    pub angular_velocity: f32,
    pub rpm: f32,
    pub temperature_c: f32,
    /// Set by the first phase sync.
    pub is_running: bool,
}

/// Position, speed and sensor history of one engine.
///
/// Not synchronized: a single poll loop or interrupt context owns it. Readers
/// on other threads go through [`crate::exchange::SnapshotExchange`].
#[derive(Debug, Clone)]
pub struct Engine {
    lines: EngineLines,
    thermistor: ThermistorCurve,
    crank_angle: f32,
    angular_velocity: f32,
    temperature_c: f32,
    is_running: bool,
    edges: PulseEdgeTracker,
    last_ipg_us: Option<u64>,
}

impl Engine {
    /// Configures actuator lines as outputs and sensor lines as inputs, then
    /// takes a first temperature reading.
    pub fn init<H: HardwareLine + ?Sized>(hw: &mut H, lines: EngineLines, thermistor: ThermistorCurve) -> Self {
        for (&coil, &injector) in lines.coils.iter().zip(lines.injectors.iter()) {
            hw.configure_line(coil, Direction::Output);
            hw.configure_line(injector, Direction::Output);
        }
        hw.configure_line(lines.thermistor, Direction::Input);
        hw.configure_line(lines.cpg, Direction::Input);
        hw.configure_line(lines.ipg, Direction::Input);

        let temperature_c = thermistor.celsius(hw.read_analog(lines.thermistor));
        info!(
            "engine lines configured: cpg={:?} ipg={:?} temp={:.1}C",
            lines.cpg, lines.ipg, temperature_c
        );

        Self {
            lines,
            thermistor,
            crank_angle: 0.0,
            angular_velocity: 0.0,
            temperature_c,
            is_running: false,
            edges: PulseEdgeTracker::new(),
            last_ipg_us: None,
        }
    }

    pub fn update_signals<H: HardwareLine + ?Sized>(&mut self, hw: &mut H) {
        let cpg = hw.read_digital(self.lines.cpg);
        let ipg = hw.read_digital(self.lines.ipg);
        self.edges.sample(cpg, ipg);
        self.temperature_c = self.thermistor.celsius(hw.read_analog(self.lines.thermistor));
    }

    pub fn cpg_pulsed(&self) -> bool {
        self.edges.cpg_pulsed()
    }

    pub fn ipg_pulsed(&self) -> bool {
        self.edges.ipg_pulsed()
    }

    /// Sets an absolute angle from phase synchronization and marks the engine running.
    pub fn set_crank(&mut self, angle_deg: f32) {
        self.crank_angle = wrap_angle(angle_deg);
        self.is_running = true;
    }

    pub fn advance_crank(&mut self, delta_deg: f32) {
        self.crank_angle = wrap_angle(self.crank_angle + delta_deg);
    }

    /// On error the previous velocity is kept.
    pub fn update_velocity(&mut self, speed: &SpeedEstimator, width_us: u64) -> Result<f32, TimingError> {
        let velocity = speed.estimate(width_us)?;
        self.angular_velocity = velocity;
        Ok(velocity)
    }

    /// Stores the timestamp of a crank pulse and returns the one it replaces.
    pub fn record_ipg_pulse(&mut self, now_us: u64) -> Option<u64> {
        self.last_ipg_us.replace(now_us)
    }

    /// Fails with [`TimingError::NotSynchronized`] until a phase sync has
    /// anchored the crank angle.
    pub fn estimate_angle(&self, interp: &AngleInterpolator, now_us: u64) -> Result<f32, TimingError> {
        if !self.is_running {
            return Err(TimingError::NotSynchronized);
        }
        let last_pulse_us = self.last_ipg_us.ok_or(TimingError::NoPulseReference)?;
        interp.estimate(Some(self), last_pulse_us, now_us)
    }

    pub fn drive_coil<H: HardwareLine + ?Sized>(
        &self,
        hw: &mut H,
        cylinder: usize,
        level: Level,
    ) -> Result<(), ActuatorError> {
        let line = Self::actuator(&self.lines.coils, cylinder)?;
        hw.write_digital(line, level);
        Ok(())
    }

    pub fn drive_injector<H: HardwareLine + ?Sized>(
        &self,
        hw: &mut H,
        cylinder: usize,
        level: Level,
    ) -> Result<(), ActuatorError> {
        let line = Self::actuator(&self.lines.injectors, cylinder)?;
        hw.write_digital(line, level);
        Ok(())
    }

    fn actuator(lines: &[LineId; CYLINDERS], cylinder: usize) -> Result<LineId, ActuatorError> {
        lines
            .get(cylinder)
            .copied()
            .ok_or(ActuatorError::NoSuchCylinder {
                cylinder,
                cylinders: CYLINDERS,
            })
    }

    /// De-energizes every injector and coil. Position state is left as is.
    pub fn shutdown<H: HardwareLine + ?Sized>(&self, hw: &mut H) {
        for (&injector, &coil) in self.lines.injectors.iter().zip(self.lines.coils.iter()) {
            hw.write_digital(injector, Level::Low);
            hw.write_digital(coil, Level::Low);
        }
        debug!("actuators de-energized at crank {:.1}", self.crank_angle);
    }

    pub fn snapshot(&self, timestamp_us: u64) -> EngineSnapshot {
        EngineSnapshot {
            timestamp_us,
            crank_angle_deg: self.crank_angle,
            angular_velocity: self.angular_velocity,
            rpm: SpeedEstimator::to_rpm(self.angular_velocity),
            temperature_c: self.temperature_c,
            is_running: self.is_running,
        }
    }

    pub fn crank_angle(&self) -> f32 {
        self.crank_angle
    }

    pub fn angular_velocity(&self) -> f32 {
        self.angular_velocity
    }

    pub fn internal_temperature(&self) -> f32 {
        self.temperature_c
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn last_ipg_us(&self) -> Option<u64> {
        self.last_ipg_us
    }

    pub fn edges(&self) -> &PulseEdgeTracker {
        &self.edges
    }

    pub fn lines(&self) -> &EngineLines {
        &self.lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeLines {
        directions: HashMap<LineId, Direction>,
        inputs: HashMap<LineId, Level>,
        outputs: HashMap<LineId, Level>,
        analog: u16,
        now_us: u64,
    }

    impl HardwareLine for FakeLines {
        fn configure_line(&mut self, line: LineId, direction: Direction) {
            self.directions.insert(line, direction);
        }

        fn read_digital(&mut self, line: LineId) -> Level {
            self.inputs.get(&line).copied().unwrap_or_default()
        }

        fn read_analog(&mut self, _line: LineId) -> u16 {
            self.analog
        }

        fn write_digital(&mut self, line: LineId, level: Level) {
            self.outputs.insert(line, level);
        }

        fn now_micros(&self) -> u64 {
            self.now_us
        }
    }

    fn engine(hw: &mut FakeLines) -> Engine {
        Engine::init(hw, EngineLines::default(), ThermistorCurve::default())
    }

    #[test]
    fn init_configures_every_line() {
        let mut hw = FakeLines::default();
        let engine = engine(&mut hw);
        let lines = engine.lines().clone();

        assert_eq!(hw.directions.len(), 11);
        for line in lines.coils.iter().chain(lines.injectors.iter()) {
            assert_eq!(hw.directions[line], Direction::Output);
        }
        for line in [lines.thermistor, lines.cpg, lines.ipg] {
            assert_eq!(hw.directions[&line], Direction::Input);
        }

        assert_eq!(engine.crank_angle(), 0.0);
        assert_eq!(engine.angular_velocity(), 0.0);
        assert!(!engine.is_running());
        assert_eq!(engine.last_ipg_us(), None);
    }

    #[test]
    fn update_signals_tracks_edges_and_temperature() {
        let mut hw = FakeLines::default();
        let mut engine = engine(&mut hw);
        let ipg = engine.lines().ipg;

        hw.inputs.insert(ipg, Level::High);
        hw.analog = 1023;
        engine.update_signals(&mut hw);
        assert!(engine.ipg_pulsed());
        assert!(!engine.cpg_pulsed());
        assert_eq!(engine.edges().ipg().previous(), Level::Low);
        assert_eq!(engine.edges().cpg().current(), Level::Low);
        assert_eq!(engine.internal_temperature(), 450.0);

        engine.update_signals(&mut hw);
        assert!(!engine.ipg_pulsed());
    }

    #[test]
    fn set_crank_marks_running() {
        let mut hw = FakeLines::default();
        let mut engine = engine(&mut hw);
        engine.set_crank(360.0);
        assert_eq!(engine.crank_angle(), 360.0);
        assert!(engine.is_running());
    }

    #[test]
    fn advance_wraps_at_cycle_end() {
        let mut hw = FakeLines::default();
        let mut engine = engine(&mut hw);
        engine.set_crank(714.0);
        engine.advance_crank(6.0);
        assert_eq!(engine.crank_angle(), 0.0);
        engine.advance_crank(1450.0);
        assert_eq!(engine.crank_angle(), 10.0);
    }

    #[test]
    fn failed_velocity_update_holds_previous() {
        let mut hw = FakeLines::default();
        let mut engine = engine(&mut hw);
        let speed = SpeedEstimator::new(6.0);

        assert_eq!(engine.update_velocity(&speed, 1000), Ok(0.006));
        assert!(engine.update_velocity(&speed, 0).is_err());
        assert_eq!(engine.angular_velocity(), 0.006);
    }

    #[test]
    fn estimate_needs_sync_and_a_pulse_reference() {
        let mut hw = FakeLines::default();
        let mut engine = engine(&mut hw);
        let interp = AngleInterpolator::new(6.0);

        assert_eq!(
            engine.estimate_angle(&interp, 100),
            Err(TimingError::NotSynchronized)
        );

        engine.set_crank(100.0);
        assert_eq!(
            engine.estimate_angle(&interp, 100),
            Err(TimingError::NoPulseReference)
        );

        engine.update_velocity(&SpeedEstimator::new(6.0), 1000).unwrap();
        assert_eq!(engine.record_ipg_pulse(1000), None);
        assert_eq!(engine.estimate_angle(&interp, 3000), Ok(106.0));
    }

    #[test]
    fn shutdown_opens_every_actuator_and_keeps_position() {
        let mut hw = FakeLines::default();
        let mut engine = engine(&mut hw);
        engine.set_crank(420.0);
        for cylinder in 0..CYLINDERS {
            engine.drive_coil(&mut hw, cylinder, Level::High).unwrap();
            engine.drive_injector(&mut hw, cylinder, Level::High).unwrap();
        }

        engine.shutdown(&mut hw);

        assert_eq!(hw.outputs.len(), 8);
        assert!(hw.outputs.values().all(|level| *level == Level::Low));
        assert_eq!(engine.crank_angle(), 420.0);
        assert!(engine.is_running());
    }

    #[test]
    fn rejects_unknown_cylinder() {
        let mut hw = FakeLines::default();
        let engine = engine(&mut hw);
        assert_eq!(
            engine.drive_coil(&mut hw, 4, Level::High),
            Err(ActuatorError::NoSuchCylinder {
                cylinder: 4,
                cylinders: CYLINDERS
            })
        );
    }

    #[test]
    fn wrap_angle_handles_negative_input() {
        assert_eq!(wrap_angle(-6.0), 714.0);
        assert_eq!(wrap_angle(720.0), 0.0);
    }
}
