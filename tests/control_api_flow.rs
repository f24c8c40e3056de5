//! End-to-end flow through ControlApi and the HTTP router
//!
//! Players and encoders are replaced by `sleep` so no media binaries are
//! needed; device commands go to local fixtures.

#![cfg(unix)]

use rtsp_control::control_api::ControlApi;
use rtsp_control::device_controller::{Credentials, DeviceController, DeviceControllerConfig};
use rtsp_control::location_registry::LocationRegistry;
use rtsp_control::process_supervisor::{
    BinaryResolver, CommandSpec, ProcessSpawner, ProcessSupervisor, ProcessSupervisorConfig,
    RecordingChain,
};
use rtsp_control::relay_supervisor::{RelayConfig, RelaySupervisor};
use rtsp_control::state::AppState;
use rtsp_control::{web_api, Error};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::process::{Child, Command};

/// Runs `sleep 30` for every command; programs named in `failing` fail to spawn
struct SleepSpawner {
    failing: Vec<&'static str>,
}

impl ProcessSpawner for SleepSpawner {
    fn spawn(&self, spec: &CommandSpec) -> std::io::Result<Child> {
        let args = spec.args.join(" ");
        if self.failing.iter().any(|f| args.contains(f)) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "simulated missing binary",
            ));
        }
        Command::new("sleep").arg("30").kill_on_drop(true).spawn()
    }
}

fn table(visca_host: &str) -> String {
    format!(
        r#"{{
            "servers": [{{"address": "192.168.116.41", "label": "Server 1"}}],
            "sources": [
                {{"code": "dae", "display_name": "대회의실", "server_address": "192.168.116.41"}},
                {{"code": "1so", "display_name": "1소회의실", "server_address": "192.168.116.41"}}
            ],
            "cameras": [
                {{"source_code": "dae", "address": "{}", "control_protocol": "visca"}}
            ]
        }}"#,
        visca_host
    )
}

struct Harness {
    api: Arc<ControlApi>,
    _dir: tempfile::TempDir,
}

fn harness(failing: Vec<&'static str>, visca_port: u16) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let registry = Arc::new(LocationRegistry::from_json(&table("127.0.0.1")).unwrap());

    let supervisor = Arc::new(ProcessSupervisor::with_spawner(
        ProcessSupervisorConfig {
            recordings_dir: dir.path().join("recordings"),
            recording_chain: RecordingChain::Standard,
            termination_grace: Duration::from_millis(500),
        },
        BinaryResolver::new(vec![]),
        Arc::new(SleepSpawner { failing }),
    ));
    let relay = Arc::new(RelaySupervisor::new(
        RelayConfig {
            endpoint: "rtmp://127.0.0.1/live2".into(),
            log_dir: dir.path().join("relay_logs"),
            cooldown: Duration::from_millis(100),
        },
        supervisor.clone(),
    ));
    let devices = Arc::new(
        DeviceController::new(DeviceControllerConfig {
            camera_credentials: Credentials {
                username: "admin".into(),
                password: "admin".into(),
            },
            bridge_credentials: Credentials {
                username: "admin".into(),
                password: "admin".into(),
            },
            visca_port,
            timeout: Duration::from_secs(2),
        })
        .unwrap(),
    );

    Harness {
        api: Arc::new(ControlApi::new(registry, supervisor, relay, devices, 3000)),
        _dir: dir,
    }
}

#[tokio::test]
async fn recording_falls_back_when_first_two_tiers_fail() {
    // Tier 1 is the fragmented MP4 copy, tier 2 the libx264 transcode
    let h = harness(vec!["frag_keyframe", "libx264"], 52381);

    let started = h.api.start_recording("대회의실", None, Some(4000)).await.unwrap();
    assert_eq!(started.tier, 3);
    assert_eq!(started.strategy, "mpegts_copy");
    assert_eq!(started.failed_attempts.len(), 2);

    let second = h.api.start_recording("1so", None, None).await;
    assert!(matches!(second, Err(Error::AlreadyRecording { .. })));
    assert_eq!(h.api.list_processes().await.record.len(), 1);

    let stopped = h.api.stop_recording().await;
    assert!(stopped.was_recording);
    assert!(!h.api.stop_recording().await.was_recording);

    h.api.shutdown().await;
}

#[tokio::test]
async fn stop_process_on_relay_triggers_relaunch() {
    let h = harness(vec![], 52381);

    let started = h.api.start_relay("dae", None, "stream-key", Some(500)).await.unwrap();
    assert!(started.accepted);
    assert_eq!(started.bitrate_kbps, 1000);

    let first = wait_relay_pid(&h.api, None).await;
    h.api.stop_process(first).await.unwrap();
    let second = wait_relay_pid(&h.api, Some(first)).await;
    assert_ne!(first, second);

    h.api.stop_relay().await;
    tokio::time::sleep(Duration::from_millis(800)).await;
    assert!(h.api.list_processes().await.relay.is_empty());
    assert!(!h.api.relay_status().await.desired_running);

    h.api.shutdown().await;
}

#[tokio::test]
async fn camera_power_frame_reaches_device() {
    let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = receiver.local_addr().unwrap().port();
    let h = harness(vec![], port);

    let result = h.api.control_camera("대회의실", false).await.unwrap();
    assert!(result.success);
    assert!(!result.acknowledged);

    let mut buf = [0u8; 16];
    let (len, _) = tokio::time::timeout(Duration::from_secs(2), receiver.recv_from(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&buf[..len], &[0x81, 0x01, 0x04, 0x00, 0x03, 0xFF]);
}

#[tokio::test]
async fn http_surface_round_trip() {
    let h = harness(vec![], 52381);
    let state = AppState::new(h.api.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, web_api::create_router(state)).await.unwrap();
    });
    let base = format!("http://{}", addr);
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/view", base))
        .json(&serde_json::json!({"location": "1소회의실", "bitrate": 2000}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], true);
    let pid = body["data"]["pid"].as_u64().unwrap();

    let listing: Value = client
        .get(format!("{}/api/processes", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listing["data"]["view"][0]["pid"].as_u64(), Some(pid));

    let resp = client
        .post(format!("{}/api/view", base))
        .json(&serde_json::json!({"location": "nowhere"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error_code"], "NOT_FOUND");

    let resp = client
        .delete(format!("{}/api/processes/{}", base, pid))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client
        .delete(format!("{}/api/processes/{}", base, pid))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    // Missing power_on must not default to a power command
    let resp = client
        .post(format!("{}/api/camera/power", base))
        .json(&serde_json::json!({"location": "대회의실"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 422);

    let health: Value = client
        .get(format!("{}/healthz", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["data"]["view_count"], 0);

    h.api.shutdown().await;
}

async fn wait_relay_pid(api: &ControlApi, not: Option<u32>) -> u32 {
    for _ in 0..100 {
        if let Some(pid) = api.relay_status().await.current_pid {
            if Some(pid) != not {
                return pid;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("relay did not launch in time");
}
