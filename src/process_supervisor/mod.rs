//! ProcessSupervisor - External media process lifecycle
//!
//! ## Responsibilities
//!
//! - Launch view (player), record (ffmpeg) and relay (ffmpeg) pipelines
//! - Ordered fallback chains for players and recording containers
//! - Single-flight recording
//! - Liveness reconciliation before every listing/stop
//! - Graceful-then-forced termination
//!
//! ## Locking
//!
//! Each collection has its own lock, held for the whole read-modify-write.
//! View and relay entries are removed under the lock and terminated after it
//! is released. The record lock is held through termination so a new
//! recording cannot start while the old one is still shutting down.

pub mod binary_resolver;
pub mod fallback;
pub mod pipelines;
pub mod registry;
pub mod spawner;
pub mod stats;
pub mod termination;
mod types;

pub use binary_resolver::BinaryResolver;
pub use pipelines::{RecordingChain, RecordingStrategy};
pub use spawner::{CommandSpec, ProcessSpawner, TokioSpawner};
pub use termination::TerminationOutcome;
pub use types::*;

use crate::bitrate_policy::EncoderRates;
use crate::error::{Error, Result};
use crate::location_registry::Source;
use chrono::{Local, Utc};
use fallback::{run_fallback_chain, Tier};
use pipelines::RecordingPaths;
use registry::{ManagedProcess, ProcessRegistry, ProcessTable};
use stats::ProcessStats;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// ProcessSupervisor configuration
#[derive(Debug, Clone)]
pub struct ProcessSupervisorConfig {
    /// Recording outputs; session logs go to `{recordings_dir}/logs`
    pub recordings_dir: PathBuf,
    pub recording_chain: RecordingChain,
    /// Wait between terminate signal and forced kill
    pub termination_grace: Duration,
}

/// ProcessSupervisor instance
pub struct ProcessSupervisor {
    config: ProcessSupervisorConfig,
    resolver: BinaryResolver,
    spawner: Arc<dyn ProcessSpawner>,
    registry: ProcessRegistry,
    stats: ProcessStats,
}

impl ProcessSupervisor {
    /// Create new ProcessSupervisor spawning real processes
    pub fn new(config: ProcessSupervisorConfig, resolver: BinaryResolver) -> Self {
        Self::with_spawner(config, resolver, Arc::new(TokioSpawner))
    }

    /// Create with a custom spawner
    pub fn with_spawner(
        config: ProcessSupervisorConfig,
        resolver: BinaryResolver,
        spawner: Arc<dyn ProcessSpawner>,
    ) -> Self {
        Self {
            config,
            resolver,
            spawner,
            registry: ProcessRegistry::new(),
            stats: ProcessStats::new(),
        }
    }

    pub fn resolver(&self) -> &BinaryResolver {
        &self.resolver
    }

    // ========================================
    // View
    // ========================================

    /// Launch a player window for `source` through the player fallback chain
    pub async fn start_view(&self, source: &Source, bitrate: u32) -> Result<ViewLaunch> {
        let rates = EncoderRates::from_requested(bitrate);
        let title = pipelines::view_title(&source.code, &source.server_address);
        let launch = self.launch_view(source, &title, rates.bitrate_kbps).await?;

        tracing::info!(
            pid = launch.pid,
            source = %source.code,
            program = %launch.program,
            tier = launch.tier,
            bitrate_kbps = rates.bitrate_kbps,
            "View started"
        );
        Ok(launch)
    }

    /// Run the player chain and register the winner in the view table
    async fn launch_view(
        &self,
        source: &Source,
        title: &str,
        bitrate_kbps: u32,
    ) -> Result<ViewLaunch> {
        let url = source.rtsp_url();
        let tiers = pipelines::view_tiers(&self.resolver, &url, title);

        let success = run_fallback_chain(self.spawner.as_ref(), "view", tiers)
            .map_err(|attempts| Error::LaunchFailed { attempts })?;

        let program = success.command.program_name();
        self.registry.view.lock().await.insert(ManagedProcess {
            pid: success.pid,
            kind: ProcessKind::View,
            source: source.code.clone(),
            program: program.clone(),
            started_at: Utc::now(),
            bitrate_kbps: Some(bitrate_kbps),
            log_path: None,
            child: success.child,
        });

        Ok(ViewLaunch {
            pid: success.pid,
            program,
            tier: success.tier,
            bitrate_kbps,
            failed_attempts: success.failed,
        })
    }

    // ========================================
    // Recording
    // ========================================

    /// Start the single recording.
    ///
    /// Fails with `AlreadyRecording` while a record process is alive. Tries
    /// each tier of the configured chain until one spawns, then opens a
    /// monitor view (best effort).
    pub async fn start_recording(&self, source: &Source, bitrate: u32) -> Result<RecordingOutcome> {
        let mut record = self.registry.record.lock().await;
        record.reconcile();

        if let Some(pid) = record.active_pid() {
            tracing::warn!(pid, source = %source.code, "Recording already in progress");
            return Err(Error::AlreadyRecording { pid });
        }

        let rates = EncoderRates::from_requested(bitrate);
        let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let paths = RecordingPaths::allocate(&self.config.recordings_dir, &source.code, &timestamp);
        if let Some(log_dir) = paths.log_path.parent() {
            tokio::fs::create_dir_all(log_dir).await?;
        }

        let url = source.rtsp_url();
        let tiers: Vec<Tier> = pipelines::recording_tiers(
            &self.resolver,
            self.config.recording_chain,
            &url,
            &rates,
            &paths,
        );

        let success = run_fallback_chain(self.spawner.as_ref(), "record", tiers)
            .map_err(|attempts| Error::RecordingFailed { attempts })?;

        let output_path = success
            .output
            .clone()
            .unwrap_or_else(|| paths.recordings_dir.join(&paths.stem));
        let started_at = Utc::now();

        record.table.insert(ManagedProcess {
            pid: success.pid,
            kind: ProcessKind::Record,
            source: source.code.clone(),
            program: success.command.program_name(),
            started_at,
            bitrate_kbps: Some(rates.bitrate_kbps),
            log_path: Some(paths.log_path.clone()),
            child: success.child,
        });

        tracing::info!(
            pid = success.pid,
            source = %source.code,
            tier = success.tier,
            strategy = %success.strategy,
            output = %output_path.display(),
            log = %paths.log_path.display(),
            "Recording started"
        );

        // Monitor failure never fails the recording
        let monitor_title = format!("{} (recording monitor)", source.code);
        let monitor_pid = match self
            .launch_view(source, &monitor_title, rates.bitrate_kbps)
            .await
        {
            Ok(monitor) => Some(monitor.pid),
            Err(e) => {
                tracing::warn!(source = %source.code, error = %e, "Recording monitor failed to start");
                None
            }
        };

        let session = RecordingSession {
            pid: success.pid,
            source: source.code.clone(),
            output_path,
            tier: success.tier,
            strategy: success.strategy,
            log_path: paths.log_path,
            bitrate_kbps: rates.bitrate_kbps,
            monitor_pid,
            started_at,
        };
        record.session = Some(session.clone());

        Ok(RecordingOutcome {
            session,
            failed_attempts: success.failed,
        })
    }

    /// Stop the active recording; a no-op when nothing is recording
    pub async fn stop_recording(&self) -> StopRecordingOutcome {
        let mut record = self.registry.record.lock().await;
        record.reconcile();

        let session = record.session.take();
        let processes = record.table.drain();
        if processes.is_empty() {
            tracing::info!("Stop recording requested but nothing is recording");
            return StopRecordingOutcome::NotRecording;
        }

        let stopped = terminate_all(processes, self.config.termination_grace).await;
        drop(record);

        let Some(first) = stopped.first() else {
            return StopRecordingOutcome::NotRecording;
        };
        let output_path = session
            .map(|s| s.output_path)
            .unwrap_or_default();

        tracing::info!(
            pid = first.pid,
            output = %output_path.display(),
            termination = ?first.termination,
            "Recording stopped"
        );

        StopRecordingOutcome::Stopped {
            pid: first.pid,
            output_path,
            termination: first.termination,
        }
    }

    /// Active recording session, after reconciliation
    pub async fn recording_status(&self) -> Option<RecordingSession> {
        let mut record = self.registry.record.lock().await;
        record.reconcile();
        record.session.clone()
    }

    // ========================================
    // Relay (launched only by the relay supervisor loop)
    // ========================================

    /// Spawn one relay process and register it
    pub(crate) async fn launch_relay(
        &self,
        source: &Source,
        command: CommandSpec,
        bitrate_kbps: u32,
    ) -> Result<u32> {
        let log_path = command.log_file.clone();
        let tiers = vec![Tier::new("relay", command)];
        let success = run_fallback_chain(self.spawner.as_ref(), "relay", tiers)
            .map_err(|attempts| Error::LaunchFailed { attempts })?;

        let pid = success.pid;
        self.registry.relay.lock().await.insert(ManagedProcess {
            pid,
            kind: ProcessKind::Relay,
            source: source.code.clone(),
            program: success.command.program_name(),
            started_at: Utc::now(),
            bitrate_kbps: Some(bitrate_kbps),
            log_path,
            child: success.child,
        });
        Ok(pid)
    }

    /// Whether `pid` is a live, tracked process of `kind`
    pub async fn is_tracked(&self, kind: ProcessKind, pid: u32) -> bool {
        match kind {
            ProcessKind::Record => {
                let mut record = self.registry.record.lock().await;
                record.reconcile();
                record.table.contains(pid)
            }
            ProcessKind::View => reconcile_contains(&mut *self.registry.view.lock().await, pid),
            ProcessKind::Relay => reconcile_contains(&mut *self.registry.relay.lock().await, pid),
        }
    }

    // ========================================
    // Stop / list
    // ========================================

    /// Stop every process of `kind`
    pub async fn stop_all(&self, kind: ProcessKind) -> Vec<StoppedProcess> {
        let stopped = match kind {
            ProcessKind::Record => {
                let mut record = self.registry.record.lock().await;
                record.reconcile();
                record.session = None;
                let processes = record.table.drain();
                terminate_all(processes, self.config.termination_grace).await
            }
            ProcessKind::View | ProcessKind::Relay => {
                let processes = {
                    let mut table = self.table(kind).lock().await;
                    table.reconcile();
                    table.drain()
                };
                terminate_all(processes, self.config.termination_grace).await
            }
        };

        tracing::info!(kind = %kind, stopped = stopped.len(), "Stopped all processes of kind");
        stopped
    }

    /// Stop `pid` if it is a live process of `kind`
    pub async fn stop_one_of(&self, kind: ProcessKind, pid: u32) -> Result<StoppedProcess> {
        let stopped = match kind {
            ProcessKind::Record => {
                let mut record = self.registry.record.lock().await;
                record.reconcile();
                let process = record.table.remove(pid);
                if process.is_some() {
                    record.session = None;
                }
                match process {
                    Some(p) => Some(terminate_one(p, self.config.termination_grace).await),
                    None => None,
                }
            }
            ProcessKind::View | ProcessKind::Relay => {
                let process = {
                    let mut table = self.table(kind).lock().await;
                    table.reconcile();
                    table.remove(pid)
                };
                match process {
                    Some(p) => Some(terminate_one(p, self.config.termination_grace).await),
                    None => None,
                }
            }
        };

        let stopped = stopped
            .ok_or_else(|| Error::NotFound(format!("No live {} process with pid {}", kind, pid)))?;
        tracing::info!(
            pid,
            kind = %kind,
            termination = ?stopped.termination,
            "Process stopped"
        );
        Ok(stopped)
    }

    /// Stop `pid` in whichever collection tracks it
    pub async fn stop_one(&self, pid: u32) -> Result<StoppedProcess> {
        for kind in ProcessKind::ALL {
            if self.is_tracked(kind, pid).await {
                match self.stop_one_of(kind, pid).await {
                    Ok(stopped) => return Ok(stopped),
                    // Exited between the check and the stop
                    Err(Error::NotFound(_)) => continue,
                    Err(e) => return Err(e),
                }
            }
        }
        Err(Error::NotFound(format!("No live process with pid {}", pid)))
    }

    /// Reconciled listing of every collection, with resource usage
    pub async fn list_processes(&self) -> ProcessListing {
        let mut listing = ProcessListing::default();

        {
            let mut record = self.registry.record.lock().await;
            record.reconcile();
            record.table.infos().into_iter().for_each(|i| listing.push(i));
        }
        for kind in [ProcessKind::View, ProcessKind::Relay] {
            let mut table = self.table(kind).lock().await;
            table.reconcile();
            table.infos().into_iter().for_each(|i| listing.push(i));
        }

        let pids: Vec<u32> = ProcessKind::ALL
            .iter()
            .flat_map(|k| listing_slice(&listing, *k).iter().map(|p| p.pid))
            .collect();
        let usage = self.stats.sample(&pids).await;

        for info in listing
            .view
            .iter_mut()
            .chain(listing.record.iter_mut())
            .chain(listing.relay.iter_mut())
        {
            if let Some((_, u)) = usage.iter().find(|(pid, _)| *pid == info.pid) {
                info.memory_mb = Some((u.memory_mb * 10.0).round() / 10.0);
                info.cpu_percent = Some(u.cpu_percent);
            }
        }

        listing
    }

    /// Live process count per kind (reconciled)
    pub async fn counts(&self) -> [(ProcessKind, usize); 3] {
        let record = {
            let mut record = self.registry.record.lock().await;
            record.reconcile();
            record.table.len()
        };
        let view = {
            let mut table = self.registry.view.lock().await;
            table.reconcile();
            table.len()
        };
        let relay = {
            let mut table = self.registry.relay.lock().await;
            table.reconcile();
            table.len()
        };
        [
            (ProcessKind::View, view),
            (ProcessKind::Record, record),
            (ProcessKind::Relay, relay),
        ]
    }

    /// Terminate everything (server shutdown)
    pub async fn shutdown(&self) -> usize {
        let mut total = 0;
        for kind in [ProcessKind::Record, ProcessKind::Relay, ProcessKind::View] {
            total += self.stop_all(kind).await.len();
        }
        tracing::info!(stopped = total, "ProcessSupervisor shut down");
        total
    }

    fn table(&self, kind: ProcessKind) -> &tokio::sync::Mutex<ProcessTable> {
        match kind {
            ProcessKind::Relay => &self.registry.relay,
            _ => &self.registry.view,
        }
    }
}

fn reconcile_contains(table: &mut ProcessTable, pid: u32) -> bool {
    table.reconcile();
    table.contains(pid)
}

fn listing_slice(listing: &ProcessListing, kind: ProcessKind) -> &[ProcessInfo] {
    match kind {
        ProcessKind::View => &listing.view,
        ProcessKind::Record => &listing.record,
        ProcessKind::Relay => &listing.relay,
    }
}

async fn terminate_one(mut process: ManagedProcess, grace: Duration) -> StoppedProcess {
    let termination = termination::terminate(&mut process.child, grace).await;
    StoppedProcess {
        pid: process.pid,
        kind: process.kind,
        termination,
    }
}

/// Terminate concurrently so N stubborn processes cost one grace period
async fn terminate_all(processes: Vec<ManagedProcess>, grace: Duration) -> Vec<StoppedProcess> {
    let mut set = JoinSet::new();
    for process in processes {
        set.spawn(terminate_one(process, grace));
    }

    let mut stopped = Vec::new();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(s) => stopped.push(s),
            Err(e) => tracing::error!(error = %e, "Termination task failed"),
        }
    }
    stopped
}

#[cfg(all(test, unix))]
pub(crate) mod tests {
    use super::*;
    use crate::location_registry::tests::sample_registry;
    use fallback::tests::ScriptedSpawner;

    pub(crate) fn supervisor_with(
        spawner: Arc<dyn ProcessSpawner>,
        dir: &std::path::Path,
    ) -> ProcessSupervisor {
        ProcessSupervisor::with_spawner(
            ProcessSupervisorConfig {
                recordings_dir: dir.to_path_buf(),
                recording_chain: RecordingChain::Standard,
                termination_grace: Duration::from_millis(500),
            },
            BinaryResolver::new(vec![]),
            spawner,
        )
    }

    fn source(code: &str) -> Source {
        sample_registry().resolve(code).unwrap().clone()
    }

    #[tokio::test]
    async fn test_start_view_registers_process() {
        let dir = tempfile::tempdir().unwrap();
        let sup = supervisor_with(Arc::new(ScriptedSpawner::default()), dir.path());

        let launch = sup.start_view(&source("1so"), 500).await.unwrap();
        assert_eq!(launch.tier, 1);
        assert_eq!(launch.bitrate_kbps, 1000);

        let listing = sup.list_processes().await;
        assert_eq!(listing.view.len(), 1);
        assert_eq!(listing.view[0].pid, launch.pid);
        assert_eq!(listing.view[0].source, "1so");

        sup.shutdown().await;
    }

    #[tokio::test]
    async fn test_view_chain_exhausted() {
        let dir = tempfile::tempdir().unwrap();
        let sup = supervisor_with(Arc::new(ScriptedSpawner::failing_first(100)), dir.path());

        let err = sup.start_view(&source("1so"), 3000).await.unwrap_err();
        match err {
            Error::LaunchFailed { attempts } => {
                assert!(attempts.len() >= 2);
                assert_eq!(attempts.last().unwrap().strategy, "ffplay");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(sup.list_processes().await.view.is_empty());
    }

    #[tokio::test]
    async fn test_recording_single_flight() {
        let dir = tempfile::tempdir().unwrap();
        let sup = supervisor_with(Arc::new(ScriptedSpawner::default()), dir.path());

        let first = sup.start_recording(&source("1so"), 3000).await.unwrap();
        assert_eq!(first.session.tier, 1);
        assert!(first.session.monitor_pid.is_some());

        let err = sup.start_recording(&source("1se"), 3000).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyRecording { pid } if pid == first.session.pid));
        assert_eq!(sup.list_processes().await.record.len(), 1);

        sup.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_start_recording_admits_one() {
        let dir = tempfile::tempdir().unwrap();
        let sup = Arc::new(supervisor_with(
            Arc::new(ScriptedSpawner::default()),
            dir.path(),
        ));

        let mut calls = JoinSet::new();
        for code in ["1so", "1se", "dae", "lobby", "1so", "1se", "dae", "lobby"] {
            let sup = sup.clone();
            let source = source(code);
            calls.spawn(async move { sup.start_recording(&source, 3000).await });
        }
        // A concurrent stop_all on another kind must not disturb the record slot
        let stop_views = {
            let sup = sup.clone();
            tokio::spawn(async move { sup.stop_all(ProcessKind::View).await })
        };

        let mut successes = 0;
        while let Some(result) = calls.join_next().await {
            match result.unwrap() {
                Ok(_) => successes += 1,
                Err(err) => assert!(matches!(err, Error::AlreadyRecording { .. })),
            }
        }
        stop_views.await.unwrap();

        assert_eq!(successes, 1);
        assert_eq!(sup.list_processes().await.record.len(), 1);
        assert!(sup.recording_status().await.is_some());

        sup.shutdown().await;
    }

    #[tokio::test]
    async fn test_recording_falls_back_to_third_tier() {
        let dir = tempfile::tempdir().unwrap();
        let sup = supervisor_with(Arc::new(ScriptedSpawner::failing_first(2)), dir.path());

        let outcome = sup.start_recording(&source("1so"), 3000).await.unwrap();
        assert_eq!(outcome.session.tier, 3);
        assert_eq!(outcome.session.strategy, "mpegts_copy");
        assert_eq!(outcome.failed_attempts.len(), 2);
        assert_eq!(
            outcome.session.output_path.extension().and_then(|e| e.to_str()),
            Some("ts")
        );
        assert!(outcome.session.log_path.starts_with(dir.path().join("logs")));

        sup.shutdown().await;
    }

    #[tokio::test]
    async fn test_recording_exhausted() {
        let dir = tempfile::tempdir().unwrap();
        let sup = supervisor_with(Arc::new(ScriptedSpawner::failing_first(100)), dir.path());

        let err = sup.start_recording(&source("1so"), 3000).await.unwrap_err();
        let attempts = err.attempts().unwrap();
        assert_eq!(attempts.len(), 4);
        assert!(sup.recording_status().await.is_none());
    }

    #[tokio::test]
    async fn test_monitor_failure_does_not_fail_recording() {
        let dir = tempfile::tempdir().unwrap();
        // Players fail, the encoder works
        let players: Vec<String> = BinaryResolver::new(vec![])
            .candidates("mpv")
            .into_iter()
            .chain(BinaryResolver::new(vec![]).candidates("ffplay"))
            .map(|p| p.display().to_string())
            .collect();
        let players: Vec<&str> = players.iter().map(String::as_str).collect();
        let sup = supervisor_with(
            Arc::new(ScriptedSpawner::failing_programs(&players)),
            dir.path(),
        );

        let outcome = sup.start_recording(&source("1so"), 3000).await.unwrap();
        assert!(outcome.session.monitor_pid.is_none());
        assert!(sup.recording_status().await.is_some());

        sup.shutdown().await;
    }

    #[tokio::test]
    async fn test_stop_recording_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let sup = supervisor_with(Arc::new(ScriptedSpawner::default()), dir.path());

        assert_eq!(sup.stop_recording().await, StopRecordingOutcome::NotRecording);

        let started = sup.start_recording(&source("1so"), 3000).await.unwrap();
        let stopped = sup.stop_recording().await;
        assert!(stopped.was_recording());
        assert!(matches!(
            stopped,
            StopRecordingOutcome::Stopped { pid, .. } if pid == started.session.pid
        ));
        assert!(sup.recording_status().await.is_none());
        assert!(!sup.stop_recording().await.was_recording());

        // Slot is free again
        sup.start_recording(&source("1se"), 3000).await.unwrap();
        sup.shutdown().await;
    }

    #[tokio::test]
    async fn test_restart_same_room_keeps_first_file() {
        let dir = tempfile::tempdir().unwrap();
        let sup = supervisor_with(Arc::new(ScriptedSpawner::default()), dir.path());

        let first = sup.start_recording(&source("1so"), 3000).await.unwrap();
        // Stand in for the encoder's output
        std::fs::write(&first.session.output_path, b"frames").unwrap();
        sup.stop_recording().await;

        let second = sup.start_recording(&source("1so"), 3000).await.unwrap();
        assert_ne!(second.session.output_path, first.session.output_path);
        assert_eq!(std::fs::read(&first.session.output_path).unwrap(), b"frames");

        sup.shutdown().await;
    }

    #[tokio::test]
    async fn test_reconcile_evicts_externally_killed() {
        let dir = tempfile::tempdir().unwrap();
        let sup = supervisor_with(Arc::new(ScriptedSpawner::default()), dir.path());

        let a = sup.start_view(&source("1so"), 3000).await.unwrap();
        sup.start_view(&source("1se"), 3000).await.unwrap();
        assert_eq!(sup.list_processes().await.view.len(), 2);

        // Kill outside the supervisor
        unsafe {
            libc::kill(a.pid as libc::pid_t, libc::SIGKILL);
        }
        tokio::time::sleep(Duration::from_millis(200)).await;

        let listing = sup.list_processes().await;
        assert_eq!(listing.view.len(), 1);
        assert!(listing.view.iter().all(|p| p.pid != a.pid));

        sup.shutdown().await;
    }

    #[tokio::test]
    async fn test_stop_one_cross_kind() {
        let dir = tempfile::tempdir().unwrap();
        let sup = supervisor_with(Arc::new(ScriptedSpawner::default()), dir.path());

        let view = sup.start_view(&source("1so"), 3000).await.unwrap();
        let rec = sup.start_recording(&source("1se"), 3000).await.unwrap();

        let stopped = sup.stop_one(rec.session.pid).await.unwrap();
        assert_eq!(stopped.kind, ProcessKind::Record);
        assert!(sup.recording_status().await.is_none());

        let err = sup.stop_one_of(ProcessKind::Record, view.pid).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        assert_eq!(sup.stop_one(view.pid).await.unwrap().kind, ProcessKind::View);
        assert!(matches!(sup.stop_one(view.pid).await, Err(Error::NotFound(_))));

        sup.shutdown().await;
    }

    #[tokio::test]
    async fn test_stop_all_views_counts() {
        let dir = tempfile::tempdir().unwrap();
        let sup = supervisor_with(Arc::new(ScriptedSpawner::default()), dir.path());

        for code in ["1so", "1se", "dae"] {
            sup.start_view(&source(code), 3000).await.unwrap();
        }
        let stopped = sup.stop_all(ProcessKind::View).await;
        assert_eq!(stopped.len(), 3);
        assert!(stopped
            .iter()
            .all(|s| s.termination == TerminationOutcome::Exited));
        assert!(sup.stop_all(ProcessKind::View).await.is_empty());
    }

    /// Ignores SIGTERM
    struct StubbornSpawner;

    impl ProcessSpawner for StubbornSpawner {
        fn spawn(&self, _spec: &CommandSpec) -> std::io::Result<tokio::process::Child> {
            tokio::process::Command::new("sh")
                .arg("-c")
                .arg("trap '' TERM; while true; do sleep 1; done")
                .kill_on_drop(true)
                .spawn()
        }
    }

    #[tokio::test]
    async fn test_stubborn_process_force_killed_and_evicted() {
        let dir = tempfile::tempdir().unwrap();
        let sup = supervisor_with(Arc::new(StubbornSpawner), dir.path());

        let launch = sup.start_view(&source("1so"), 3000).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        let started = std::time::Instant::now();
        let stopped = sup.stop_one(launch.pid).await.unwrap();
        assert_eq!(stopped.termination, TerminationOutcome::Killed);
        assert!(started.elapsed() < Duration::from_secs(3));
        assert!(sup.list_processes().await.view.is_empty());
    }
}
