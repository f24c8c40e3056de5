//! ProcessSupervisor types

use super::termination::TerminationOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Process collection a managed process belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessKind {
    /// Live decode + display pipeline (player window)
    View,
    /// Recording to disk
    Record,
    /// Re-encode and push to the streaming endpoint
    Relay,
}

impl ProcessKind {
    pub const ALL: [ProcessKind; 3] = [ProcessKind::View, ProcessKind::Record, ProcessKind::Relay];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessKind::View => "view",
            ProcessKind::Record => "record",
            ProcessKind::Relay => "relay",
        }
    }
}

impl std::fmt::Display for ProcessKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One failed (or, for the last entry of a success, chosen) step of a fallback chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FallbackAttempt {
    /// 1-based position in the chain
    pub tier: usize,
    pub strategy: String,
    pub program: String,
    /// Spawn error; `None` when this tier succeeded
    pub error: Option<String>,
}

/// Snapshot of a tracked process
#[derive(Debug, Clone, Serialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub kind: ProcessKind,
    /// Source code the pipeline reads from
    pub source: String,
    pub program: String,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate_kbps: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_mb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_percent: Option<f32>,
}

/// Processes grouped by kind, as returned by a listing
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessListing {
    pub view: Vec<ProcessInfo>,
    pub record: Vec<ProcessInfo>,
    pub relay: Vec<ProcessInfo>,
}

impl ProcessListing {
    pub fn count(&self, kind: ProcessKind) -> usize {
        match kind {
            ProcessKind::View => self.view.len(),
            ProcessKind::Record => self.record.len(),
            ProcessKind::Relay => self.relay.len(),
        }
    }

    pub(crate) fn push(&mut self, info: ProcessInfo) {
        match info.kind {
            ProcessKind::View => self.view.push(info),
            ProcessKind::Record => self.record.push(info),
            ProcessKind::Relay => self.relay.push(info),
        }
    }
}

/// Result of a successful view launch
#[derive(Debug, Clone, Serialize)]
pub struct ViewLaunch {
    pub pid: u32,
    pub program: String,
    pub tier: usize,
    pub bitrate_kbps: u32,
    /// Candidates that failed before the chosen one
    pub failed_attempts: Vec<FallbackAttempt>,
}

/// The single active recording
#[derive(Debug, Clone, Serialize)]
pub struct RecordingSession {
    pub pid: u32,
    pub source: String,
    pub output_path: PathBuf,
    /// 1-based container fallback tier that spawned
    pub tier: usize,
    pub strategy: String,
    pub log_path: PathBuf,
    pub bitrate_kbps: u32,
    pub monitor_pid: Option<u32>,
    pub started_at: DateTime<Utc>,
}

/// Result of a successful recording start
#[derive(Debug, Clone, Serialize)]
pub struct RecordingOutcome {
    pub session: RecordingSession,
    pub failed_attempts: Vec<FallbackAttempt>,
}

/// Result of `stop_recording`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StopRecordingOutcome {
    Stopped {
        pid: u32,
        output_path: PathBuf,
        termination: TerminationOutcome,
    },
    /// Nothing was recording; not an error
    NotRecording,
}

impl StopRecordingOutcome {
    pub fn was_recording(&self) -> bool {
        matches!(self, StopRecordingOutcome::Stopped { .. })
    }
}

/// A process removed by a stop operation
#[derive(Debug, Clone, Serialize)]
pub struct StoppedProcess {
    pub pid: u32,
    pub kind: ProcessKind,
    pub termination: TerminationOutcome,
}
