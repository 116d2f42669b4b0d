use super::logging::LogFormat;
use crank_core::{EstimatorConfig, SimConfig};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub show_help: bool,
    pub rpm: f64,
    pub duration_ms: u64,
    pub poll_us: u64,
    pub increment_deg: f32,
    pub start_angle_deg: f64,
    pub realtime: bool,
    pub report_ms: u64,
    pub log_format: LogFormat,
    pub trace_path: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            show_help: false,
            rpm: 1200.0,
            duration_ms: 1000,
            poll_us: 20,
            increment_deg: 6.0,
            start_angle_deg: 200.0,
            realtime: false,
            report_ms: 250,
            log_format: LogFormat::default(),
            trace_path: None,
        }
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        let args: Vec<String> = std::env::args().collect();
        Self::from_args(&args)
    }

    pub fn from_args(args: &[String]) -> Self {
        let mut cfg = RuntimeConfig::default();
        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--rpm" => {
                    if i + 1 < args.len() {
                        cfg.rpm = args[i + 1].parse().unwrap_or(cfg.rpm);
                        i += 1;
                    }
                }
                "--duration-ms" => {
                    if i + 1 < args.len() {
                        cfg.duration_ms = args[i + 1].parse().unwrap_or(cfg.duration_ms);
                        i += 1;
                    }
                }
                "--poll-us" => {
                    if i + 1 < args.len() {
                        cfg.poll_us = args[i + 1].parse().unwrap_or(cfg.poll_us);
                        i += 1;
                    }
                }
                "--increment" => {
                    if i + 1 < args.len() {
                        cfg.increment_deg = args[i + 1].parse().unwrap_or(cfg.increment_deg);
                        i += 1;
                    }
                }
                "--start-angle" => {
                    if i + 1 < args.len() {
                        cfg.start_angle_deg = args[i + 1].parse().unwrap_or(cfg.start_angle_deg);
                        i += 1;
                    }
                }
                "--realtime" => {
                    cfg.realtime = true;
                }
                "--report-ms" => {
                    if i + 1 < args.len() {
                        cfg.report_ms = args[i + 1].parse().unwrap_or(cfg.report_ms);
                        i += 1;
                    }
                }
                "--json-logs" => {
                    cfg.log_format = LogFormat::Json;
                }
                "--log-format" => {
                    if i + 1 < args.len() {
                        cfg.log_format = args[i + 1].parse().unwrap_or(cfg.log_format);
                        i += 1;
                    }
                }
                "--trace" => {
                    if i + 1 < args.len() {
                        cfg.trace_path = Some(PathBuf::from(&args[i + 1]));
                        i += 1;
                    }
                }
                "--help" | "-h" => {
                    cfg.show_help = true;
                    break;
                }
                _ => {}
            }
            i += 1;
        }
        cfg
    }

    pub fn estimator(&self) -> EstimatorConfig {
        EstimatorConfig::with_increment(self.increment_deg)
    }

    pub fn simulation(&self) -> SimConfig {
        SimConfig {
            rpm: self.rpm,
            increment_deg: f64::from(self.increment_deg),
            start_angle_deg: self.start_angle_deg,
            ..SimConfig::default()
        }
    }

    pub fn poll_period(&self) -> Duration {
        Duration::from_micros(self.poll_us.max(1))
    }

    pub fn duration_us(&self) -> u64 {
        self.duration_ms.saturating_mul(1000)
    }

    pub fn print_help() {
        println!(
            r#"crank-bench - Crank position estimator bench run against a simulated engine

USAGE:
    crank-bench [OPTIONS]

OPTIONS:
    --rpm <RPM>             Simulated engine speed [default: 1200]
    --duration-ms <MS>      Simulated run length [default: 1000]
    --poll-us <US>          Sensor polling period [default: 20]
    --increment <DEG>       Crank angle per crank sensor pulse [default: 6]
    --start-angle <DEG>     Simulated crank angle at start [default: 200]
    --realtime              Pace polling against the wall clock
    --report-ms <MS>        Monitor thread reporting interval [default: 250]
    --log-format <FMT>      Log output format (pretty|compact|json) [default: pretty]
    --json-logs             Shorthand for --log-format json
    --trace <PATH>          Write tracker events to a JSONL file
    -h, --help              Print this help message

ENVIRONMENT VARIABLES:
    RUST_LOG                Set log filter (e.g., RUST_LOG=debug,crank_core=trace)

EXAMPLES:
    # One second at 3000 rpm with an event trace
    crank-bench --rpm 3000 --trace /tmp/crank.jsonl

    # Paced run with JSON logs
    crank-bench --realtime --duration-ms 5000 --json-logs
"#
        );
    }
}
