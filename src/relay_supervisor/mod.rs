//! RelaySupervisor - Always-on relay with crash-loop restart
//!
//! ## Responsibilities
//!
//! - Keep one relay ffmpeg running while the operator wants it
//! - Relaunch after any exit, waiting a fixed cool-down between attempts
//! - Stop cleanly: no launch ever happens after `stop()` returns
//!
//! The loop is the only caller of `ProcessSupervisor::launch_relay`. Each
//! launch happens under the state lock after re-checking the desired flag and
//! generation, so `stop()` either sees the new pid and terminates it, or the
//! loop sees the stop and never launches.

use crate::bitrate_policy::EncoderRates;
use crate::error::Result;
use crate::location_registry::Source;
use crate::process_supervisor::{pipelines, ProcessKind, ProcessSupervisor};
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};

/// Default wait between relay exit and relaunch
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(5);

/// How often the in-flight relay's liveness is checked
const LIVENESS_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// RelaySupervisor configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Streaming ingest base URL; the destination key is appended
    pub endpoint: String,
    /// Per-launch ffmpeg logs
    pub log_dir: PathBuf,
    pub cooldown: Duration,
}

#[derive(Debug, Clone)]
struct RelayTarget {
    source: Source,
    destination: String,
    rates: EncoderRates,
}

#[derive(Debug, Default)]
struct RelayState {
    desired_running: bool,
    /// Bumped by every start/stop; a loop only acts while its generation is current
    generation: u64,
    loop_active: bool,
    current_pid: Option<u32>,
    restart_count: u64,
    last_started_at: Option<DateTime<Utc>>,
    target: Option<RelayTarget>,
}

/// Relay status snapshot
#[derive(Debug, Clone, Serialize)]
pub struct RelayStatus {
    pub desired_running: bool,
    pub current_pid: Option<u32>,
    pub restart_count: u64,
    pub source: Option<String>,
    pub bitrate_kbps: Option<u32>,
    pub last_started_at: Option<DateTime<Utc>>,
}

/// RelaySupervisor instance
pub struct RelaySupervisor {
    config: RelayConfig,
    supervisor: Arc<ProcessSupervisor>,
    state: Arc<Mutex<RelayState>>,
    generation_tx: watch::Sender<u64>,
}

impl RelaySupervisor {
    /// Create new RelaySupervisor
    pub fn new(config: RelayConfig, supervisor: Arc<ProcessSupervisor>) -> Self {
        let (generation_tx, _) = watch::channel(0);
        Self {
            config,
            supervisor,
            state: Arc::new(Mutex::new(RelayState::default())),
            generation_tx,
        }
    }

    /// Start relaying `source` to `{endpoint}/{destination_key}`.
    ///
    /// Returns `false` when a relay loop is already active; the running relay
    /// is left untouched.
    pub async fn start(&self, source: &Source, bitrate: u32, destination_key: &str) -> Result<bool> {
        tokio::fs::create_dir_all(&self.config.log_dir).await?;

        let generation = {
            let mut state = self.state.lock().await;
            if state.desired_running && state.loop_active {
                tracing::warn!(
                    source = %source.code,
                    current_pid = ?state.current_pid,
                    "Relay already running"
                );
                return Ok(false);
            }

            state.generation += 1;
            state.desired_running = true;
            state.loop_active = true;
            state.restart_count = 0;
            state.target = Some(RelayTarget {
                source: source.clone(),
                destination: pipelines::relay_destination(&self.config.endpoint, destination_key),
                rates: EncoderRates::from_requested(bitrate),
            });
            state.generation
        };
        self.generation_tx.send_replace(generation);

        tracing::info!(source = %source.code, generation, "Starting relay loop");

        let ctx = LoopContext {
            generation,
            config: self.config.clone(),
            supervisor: self.supervisor.clone(),
            state: self.state.clone(),
            generation_rx: self.generation_tx.subscribe(),
        };
        tokio::spawn(ctx.run());

        Ok(true)
    }

    /// Clear the desired flag and terminate the in-flight relay; idempotent
    pub async fn stop(&self) {
        let pid = {
            let mut state = self.state.lock().await;
            if !state.desired_running && state.current_pid.is_none() {
                tracing::debug!("Relay stop requested but relay is not running");
                return;
            }
            state.desired_running = false;
            state.generation += 1;
            self.generation_tx.send_replace(state.generation);
            state.current_pid.take()
        };

        if let Some(pid) = pid {
            match self.supervisor.stop_one_of(ProcessKind::Relay, pid).await {
                Ok(stopped) => tracing::info!(
                    pid,
                    termination = ?stopped.termination,
                    "Relay process stopped"
                ),
                Err(e) => tracing::debug!(pid, error = %e, "Relay process already gone"),
            }
        }
        tracing::info!("Relay stopped");
    }

    pub async fn status(&self) -> RelayStatus {
        let state = self.state.lock().await;
        RelayStatus {
            desired_running: state.desired_running,
            current_pid: state.current_pid,
            restart_count: state.restart_count,
            source: state.target.as_ref().map(|t| t.source.code.clone()),
            bitrate_kbps: state.target.as_ref().map(|t| t.rates.bitrate_kbps),
            last_started_at: state.last_started_at,
        }
    }

    pub async fn is_desired(&self) -> bool {
        self.state.lock().await.desired_running
    }
}

/// Everything one loop generation needs
struct LoopContext {
    generation: u64,
    config: RelayConfig,
    supervisor: Arc<ProcessSupervisor>,
    state: Arc<Mutex<RelayState>>,
    generation_rx: watch::Receiver<u64>,
}

impl LoopContext {
    async fn run(mut self) {
        loop {
            let Some(pid) = self.launch().await else {
                break;
            };

            if let Some(pid) = pid {
                self.wait_for_exit(pid).await;
                tracing::warn!(pid, "Relay process exited");
            }

            {
                let mut state = self.state.lock().await;
                if !self.is_current(&state) {
                    break;
                }
                state.current_pid = None;
                state.restart_count += 1;
                tracing::info!(
                    restart_count = state.restart_count,
                    cooldown_secs = self.config.cooldown.as_secs_f32(),
                    "Relay will restart after cool-down"
                );
            }

            if !self.sleep_unless_stopped(self.config.cooldown).await {
                break;
            }
        }

        let mut state = self.state.lock().await;
        if state.generation == self.generation {
            state.loop_active = false;
        }
        tracing::info!(generation = self.generation, "Relay loop exited");
    }

    fn is_current(&self, state: &RelayState) -> bool {
        state.desired_running && state.generation == self.generation
    }

    /// `None` to stop the loop, `Some(None)` when the spawn failed
    async fn launch(&self) -> Option<Option<u32>> {
        let mut state = self.state.lock().await;
        if !self.is_current(&state) {
            return None;
        }
        let target = state.target.clone()?;

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let log_path = self
            .config
            .log_dir
            .join(format!("relay_{}_{}.log", target.source.code, timestamp));
        let command = pipelines::relay_command(
            self.supervisor.resolver(),
            &target.source.rtsp_url(),
            &target.destination,
            &target.rates,
        )
        .log_to(&log_path)
        .current_dir(&self.config.log_dir);

        match self
            .supervisor
            .launch_relay(&target.source, command, target.rates.bitrate_kbps)
            .await
        {
            Ok(pid) => {
                tracing::info!(
                    pid,
                    source = %target.source.code,
                    bitrate_kbps = target.rates.bitrate_kbps,
                    log = %log_path.display(),
                    "Relay launched"
                );
                state.current_pid = Some(pid);
                state.last_started_at = Some(Utc::now());
                Some(Some(pid))
            }
            Err(e) => {
                tracing::error!(source = %target.source.code, error = %e, "Relay launch failed");
                Some(None)
            }
        }
    }

    /// Returns once the process is no longer tracked (exited or stopped)
    async fn wait_for_exit(&mut self, pid: u32) {
        loop {
            if !self.supervisor.is_tracked(ProcessKind::Relay, pid).await {
                return;
            }
            if !self.sleep_unless_stopped(LIVENESS_POLL_INTERVAL).await {
                return;
            }
        }
    }

    /// `false` if the generation changed while sleeping
    async fn sleep_unless_stopped(&mut self, duration: Duration) -> bool {
        if *self.generation_rx.borrow() != self.generation {
            return false;
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            changed = self.generation_rx.changed() => match changed {
                Ok(()) => *self.generation_rx.borrow() == self.generation,
                Err(_) => false,
            },
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::location_registry::tests::sample_registry;
    use crate::process_supervisor::fallback::tests::ScriptedSpawner;
    use crate::process_supervisor::tests::supervisor_with;

    struct Fixture {
        relay: RelaySupervisor,
        supervisor: Arc<ProcessSupervisor>,
        _dir: tempfile::TempDir,
    }

    fn fixture(spawner: ScriptedSpawner) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let supervisor = Arc::new(supervisor_with(Arc::new(spawner), dir.path()));
        let relay = RelaySupervisor::new(
            RelayConfig {
                endpoint: "rtmp://127.0.0.1/live2".into(),
                log_dir: dir.path().join("relay_logs"),
                cooldown: Duration::from_millis(100),
            },
            supervisor.clone(),
        );
        Fixture {
            relay,
            supervisor,
            _dir: dir,
        }
    }

    fn source() -> Source {
        sample_registry().resolve("1so").unwrap().clone()
    }

    async fn wait_for_pid(relay: &RelaySupervisor, not: Option<u32>) -> u32 {
        for _ in 0..100 {
            if let Some(pid) = relay.status().await.current_pid {
                if Some(pid) != not {
                    return pid;
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("relay did not (re)launch in time");
    }

    #[tokio::test]
    async fn test_start_launches_and_rejects_second_start() {
        let f = fixture(ScriptedSpawner::default());

        assert!(f.relay.start(&source(), 4000, "key").await.unwrap());
        let pid = wait_for_pid(&f.relay, None).await;
        assert!(f.supervisor.is_tracked(ProcessKind::Relay, pid).await);

        assert!(!f.relay.start(&source(), 4000, "key").await.unwrap());
        assert_eq!(f.supervisor.list_processes().await.relay.len(), 1);

        let status = f.relay.status().await;
        assert!(status.desired_running);
        assert_eq!(status.bitrate_kbps, Some(4000));

        f.relay.stop().await;
    }

    #[tokio::test]
    async fn test_crash_is_relaunched() {
        let f = fixture(ScriptedSpawner::default());
        f.relay.start(&source(), 3000, "key").await.unwrap();
        let first = wait_for_pid(&f.relay, None).await;

        // Simulate a crash by stopping the process behind the loop's back
        f.supervisor.stop_one(first).await.unwrap();

        let second = wait_for_pid(&f.relay, Some(first)).await;
        assert_ne!(first, second);
        assert!(f.relay.status().await.restart_count >= 1);

        f.relay.stop().await;
    }

    #[tokio::test]
    async fn test_stop_prevents_relaunch() {
        let f = fixture(ScriptedSpawner::default());
        f.relay.start(&source(), 3000, "key").await.unwrap();
        wait_for_pid(&f.relay, None).await;

        f.relay.stop().await;
        let status = f.relay.status().await;
        assert!(!status.desired_running);
        assert!(status.current_pid.is_none());

        // Well past cool-down + poll interval
        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert!(f.supervisor.list_processes().await.relay.is_empty());
        assert!(f.relay.status().await.current_pid.is_none());

        // Idempotent
        f.relay.stop().await;
    }

    #[tokio::test]
    async fn test_failed_launch_retries_after_cooldown() {
        // First two spawns fail, the third succeeds
        let f = fixture(ScriptedSpawner::failing_first(2));
        f.relay.start(&source(), 3000, "key").await.unwrap();

        let pid = wait_for_pid(&f.relay, None).await;
        assert!(f.supervisor.is_tracked(ProcessKind::Relay, pid).await);
        assert!(f.relay.status().await.restart_count >= 2);

        f.relay.stop().await;
    }

    #[tokio::test]
    async fn test_restart_after_stop() {
        let f = fixture(ScriptedSpawner::default());
        f.relay.start(&source(), 3000, "key").await.unwrap();
        let first = wait_for_pid(&f.relay, None).await;
        f.relay.stop().await;

        assert!(f.relay.start(&source(), 3000, "key").await.unwrap());
        let second = wait_for_pid(&f.relay, Some(first)).await;
        assert_eq!(f.supervisor.list_processes().await.relay.len(), 1);
        assert_eq!(
            f.supervisor.list_processes().await.relay[0].pid,
            second
        );

        f.relay.stop().await;
    }
}
