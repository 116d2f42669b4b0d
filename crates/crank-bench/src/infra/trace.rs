//! JSONL trace of tracker events for offline inspection of a bench run.

use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceEventType {
    SessionStart,
    /// First cam edge; pulse counting starts here.
    PhaseArmed,
    /// First absolute angle after start.
    PhaseSynchronized,
    /// Cam edge after arming with a pulse count outside the phase table.
    PhaseFault,
    /// Crank pulse interval that gave no velocity.
    VelocityRejected,
    SessionShutdown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Tracker clock in microseconds.
    pub timestamp_us: u64,
    pub unix_us: u64,
    pub event_type: TraceEventType,
    pub details: serde_json::Value,
}

/// Append-only JSONL writer, shareable between the poll and main threads.
pub struct TraceRecorder {
    writer: Mutex<BufWriter<File>>,
}

impl TraceRecorder {
    /// Opens `path` for appending, creating parent directories as needed.
    pub fn new(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: Mutex::new(BufWriter::with_capacity(8192, file)),
        })
    }

    pub fn record(&self, entry: &TraceEntry) -> std::io::Result<()> {
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        serde_json::to_writer(&mut *writer, entry)?;
        writer.write_all(b"\n")
    }

    pub fn record_event(
        &self,
        timestamp_us: u64,
        unix_us: u64,
        event_type: TraceEventType,
        details: serde_json::Value,
    ) -> std::io::Result<()> {
        self.record(&TraceEntry {
            timestamp_us,
            unix_us,
            event_type,
            details,
        })
    }

    pub fn flush(&self) -> std::io::Result<()> {
        self.writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::tempdir;

    #[test]
    fn writes_one_json_object_per_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("runs").join("trace.jsonl");

        let recorder = TraceRecorder::new(&path).unwrap();
        recorder
            .record_event(
                72_000,
                1_704_067_200_000_000,
                TraceEventType::PhaseSynchronized,
                serde_json::json!({"angle_deg": 0.0}),
            )
            .unwrap();
        recorder
            .record_event(
                80_000,
                1_704_067_200_008_000,
                TraceEventType::PhaseFault,
                serde_json::json!({"pulses": 3}),
            )
            .unwrap();
        recorder.flush().unwrap();

        let mut content = String::new();
        File::open(&path)
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();

        let entries: Vec<TraceEntry> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].event_type, TraceEventType::PhaseSynchronized);
        assert_eq!(entries[1].timestamp_us, 80_000);
        assert_eq!(entries[1].details["pulses"], 3);
        assert!(content.contains("\"phase_fault\""));
    }
}
