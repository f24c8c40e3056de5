//! Process tables with liveness reconciliation
//!
//! Each table owns its children exclusively. Every read goes through
//! `reconcile` first so entries whose OS process has exited are evicted
//! rather than reported.

use super::types::{ProcessInfo, ProcessKind, RecordingSession};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tokio::process::Child;
use tokio::sync::Mutex;

/// A running subprocess owned by the supervisor
#[derive(Debug)]
pub struct ManagedProcess {
    pub pid: u32,
    pub kind: ProcessKind,
    pub source: String,
    pub program: String,
    pub started_at: DateTime<Utc>,
    pub bitrate_kbps: Option<u32>,
    pub log_path: Option<PathBuf>,
    pub child: Child,
}

impl ManagedProcess {
    /// `true` while the OS process has not exited
    fn is_alive(&mut self) -> bool {
        match self.child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                tracing::info!(
                    pid = self.pid,
                    kind = %self.kind,
                    source = %self.source,
                    status = %status,
                    "Evicting exited process"
                );
                false
            }
            Err(e) => {
                tracing::warn!(pid = self.pid, error = %e, "Liveness check failed, evicting");
                false
            }
        }
    }

    pub fn info(&self) -> ProcessInfo {
        ProcessInfo {
            pid: self.pid,
            kind: self.kind,
            source: self.source.clone(),
            program: self.program.clone(),
            started_at: self.started_at,
            uptime_secs: (Utc::now() - self.started_at).num_seconds(),
            bitrate_kbps: self.bitrate_kbps,
            log_path: self.log_path.clone(),
            memory_mb: None,
            cpu_percent: None,
        }
    }
}

/// Processes of one kind, in launch order
#[derive(Debug)]
pub struct ProcessTable {
    kind: ProcessKind,
    processes: Vec<ManagedProcess>,
}

impl ProcessTable {
    pub fn new(kind: ProcessKind) -> Self {
        Self {
            kind,
            processes: Vec::new(),
        }
    }

    pub fn insert(&mut self, process: ManagedProcess) {
        debug_assert_eq!(process.kind, self.kind);
        self.processes.push(process);
    }

    /// Drop exited entries; returns how many were evicted
    pub fn reconcile(&mut self) -> usize {
        let before = self.processes.len();
        self.processes.retain_mut(|p| p.is_alive());
        before - self.processes.len()
    }

    pub fn contains(&self, pid: u32) -> bool {
        self.processes.iter().any(|p| p.pid == pid)
    }

    pub fn remove(&mut self, pid: u32) -> Option<ManagedProcess> {
        let index = self.processes.iter().position(|p| p.pid == pid)?;
        Some(self.processes.remove(index))
    }

    pub fn drain(&mut self) -> Vec<ManagedProcess> {
        std::mem::take(&mut self.processes)
    }

    pub fn pids(&self) -> Vec<u32> {
        self.processes.iter().map(|p| p.pid).collect()
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    pub fn infos(&self) -> Vec<ProcessInfo> {
        self.processes.iter().map(ManagedProcess::info).collect()
    }
}

/// Record table plus the single-flight session slot, guarded together
#[derive(Debug)]
pub struct RecordState {
    pub table: ProcessTable,
    pub session: Option<RecordingSession>,
}

impl RecordState {
    fn new() -> Self {
        Self {
            table: ProcessTable::new(ProcessKind::Record),
            session: None,
        }
    }

    /// Reconcile the table and clear the session if its process is gone
    pub fn reconcile(&mut self) -> usize {
        let evicted = self.table.reconcile();
        if let Some(session) = &self.session {
            if !self.table.contains(session.pid) {
                tracing::info!(
                    pid = session.pid,
                    output = %session.output_path.display(),
                    "Recording process exited on its own, clearing session"
                );
                self.session = None;
            }
        }
        evicted
    }

    /// pid of the live recording, if any
    pub fn active_pid(&self) -> Option<u32> {
        self.table.pids().first().copied()
    }
}

/// The three process collections, each behind its own lock.
///
/// Lock order when more than one is needed: record, then view.
pub struct ProcessRegistry {
    pub view: Mutex<ProcessTable>,
    pub record: Mutex<RecordState>,
    pub relay: Mutex<ProcessTable>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self {
            view: Mutex::new(ProcessTable::new(ProcessKind::View)),
            record: Mutex::new(RecordState::new()),
            relay: Mutex::new(ProcessTable::new(ProcessKind::Relay)),
        }
    }
}

impl Default for ProcessRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tokio::process::Command;

    fn managed(kind: ProcessKind, script: &str) -> ManagedProcess {
        let child = Command::new("sh")
            .arg("-c")
            .arg(script)
            .kill_on_drop(true)
            .spawn()
            .unwrap();
        ManagedProcess {
            pid: child.id().unwrap(),
            kind,
            source: "1so".into(),
            program: "sh".into(),
            started_at: Utc::now(),
            bitrate_kbps: None,
            log_path: None,
            child,
        }
    }

    #[tokio::test]
    async fn test_reconcile_evicts_dead() {
        let mut table = ProcessTable::new(ProcessKind::View);
        table.insert(managed(ProcessKind::View, "sleep 30"));
        table.insert(managed(ProcessKind::View, "sleep 30"));
        let mut short = managed(ProcessKind::View, "exit 0");
        short.child.wait().await.unwrap();
        let short_pid = short.pid;
        table.insert(short);

        assert_eq!(table.len(), 3);
        assert_eq!(table.reconcile(), 1);
        assert_eq!(table.len(), 2);
        assert!(!table.contains(short_pid));
    }

    #[tokio::test]
    async fn test_remove_and_drain() {
        let mut table = ProcessTable::new(ProcessKind::Relay);
        let p = managed(ProcessKind::Relay, "sleep 30");
        let pid = p.pid;
        table.insert(p);
        table.insert(managed(ProcessKind::Relay, "sleep 30"));

        assert!(table.remove(pid).is_some());
        assert!(table.remove(pid).is_none());
        assert_eq!(table.drain().len(), 1);
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_record_session_cleared_with_process() {
        let mut state = RecordState::new();
        let mut p = managed(ProcessKind::Record, "exit 0");
        p.child.wait().await.unwrap();
        state.session = Some(RecordingSession {
            pid: p.pid,
            source: "1so".into(),
            output_path: "/tmp/x.mp4".into(),
            tier: 1,
            strategy: "fmp4_copy".into(),
            log_path: "/tmp/x.log".into(),
            bitrate_kbps: 3000,
            monitor_pid: None,
            started_at: Utc::now(),
        });
        state.table.insert(p);

        assert_eq!(state.reconcile(), 1);
        assert!(state.session.is_none());
        assert!(state.active_pid().is_none());
    }
}
