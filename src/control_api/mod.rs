//! ControlApi - Operator-facing operations
//!
//! Every call that names a location resolves it through the LocationRegistry
//! before touching any process or device; an unknown name fails the whole
//! call with `NotFound`.

mod types;

pub use types::*;

use crate::device_controller::DeviceController;
use crate::error::{Error, Result};
use crate::location_registry::{LocationRegistry, Source};
use crate::process_supervisor::{ProcessKind, ProcessListing, ProcessSupervisor, StopRecordingOutcome};
use crate::relay_supervisor::{RelayStatus, RelaySupervisor};
use std::sync::Arc;
use std::time::Instant;

/// ControlApi instance
pub struct ControlApi {
    registry: Arc<LocationRegistry>,
    supervisor: Arc<ProcessSupervisor>,
    relay: Arc<RelaySupervisor>,
    devices: Arc<DeviceController>,
    default_bitrate: u32,
    started_at: Instant,
}

impl ControlApi {
    /// Create new ControlApi
    pub fn new(
        registry: Arc<LocationRegistry>,
        supervisor: Arc<ProcessSupervisor>,
        relay: Arc<RelaySupervisor>,
        devices: Arc<DeviceController>,
        default_bitrate: u32,
    ) -> Self {
        Self {
            registry,
            supervisor,
            relay,
            devices,
            default_bitrate,
            started_at: Instant::now(),
        }
    }

    /// Resolve a location and apply the requested server
    fn media_source(&self, location: &str, server_address: Option<&str>) -> Result<Source> {
        let source = self.registry.resolve(location)?;
        match server_address.map(str::trim).filter(|s| !s.is_empty()) {
            Some(server) => {
                self.registry.check_server(server)?;
                Ok(source.with_server(server))
            }
            None => Ok(source.clone()),
        }
    }

    fn bitrate(&self, requested: Option<u32>) -> u32 {
        requested.unwrap_or(self.default_bitrate)
    }

    // ========================================
    // View
    // ========================================

    pub async fn start_view(
        &self,
        location: &str,
        server_address: Option<&str>,
        bitrate: Option<u32>,
    ) -> Result<StartViewResponse> {
        let source = self.media_source(location, server_address)?;
        let launch = self
            .supervisor
            .start_view(&source, self.bitrate(bitrate))
            .await?;

        Ok(StartViewResponse {
            pid: launch.pid,
            tier: launch.tier,
            program: launch.program,
            source: source.code,
            bitrate_kbps: launch.bitrate_kbps,
            failed_attempts: launch.failed_attempts,
        })
    }

    /// Stop one view process
    pub async fn stop_view(&self, pid: u32) -> Result<StopProcessResponse> {
        let stopped = self.supervisor.stop_one_of(ProcessKind::View, pid).await?;
        Ok(StopProcessResponse {
            success: true,
            pid: stopped.pid,
            termination: stopped.termination,
        })
    }

    pub async fn stop_all_views(&self) -> StopAllResponse {
        StopAllResponse {
            stopped_count: self.supervisor.stop_all(ProcessKind::View).await.len(),
        }
    }

    // ========================================
    // Recording
    // ========================================

    pub async fn start_recording(
        &self,
        location: &str,
        server_address: Option<&str>,
        bitrate: Option<u32>,
    ) -> Result<StartRecordingResponse> {
        let source = self.media_source(location, server_address)?;
        let outcome = self
            .supervisor
            .start_recording(&source, self.bitrate(bitrate))
            .await?;

        let session = outcome.session;
        Ok(StartRecordingResponse {
            pid: session.pid,
            tier: session.tier,
            strategy: session.strategy,
            output_path: session.output_path,
            log_path: session.log_path,
            monitor_pid: session.monitor_pid,
            failed_attempts: outcome.failed_attempts,
        })
    }

    pub async fn stop_recording(&self) -> StopRecordingResponse {
        match self.supervisor.stop_recording().await {
            StopRecordingOutcome::Stopped {
                pid, output_path, ..
            } => StopRecordingResponse {
                was_recording: true,
                pid: Some(pid),
                output_path: Some(output_path),
            },
            StopRecordingOutcome::NotRecording => StopRecordingResponse {
                was_recording: false,
                pid: None,
                output_path: None,
            },
        }
    }

    pub async fn recording_status(&self) -> RecordingStatusResponse {
        let session = self.supervisor.recording_status().await;
        RecordingStatusResponse {
            is_recording: session.is_some(),
            session,
        }
    }

    // ========================================
    // Relay
    // ========================================

    pub async fn start_relay(
        &self,
        location: &str,
        server_address: Option<&str>,
        destination_key: &str,
        bitrate: Option<u32>,
    ) -> Result<StartRelayResponse> {
        let key = destination_key.trim();
        if key.is_empty() {
            return Err(Error::Validation("destination key is required".to_string()));
        }

        let source = self.media_source(location, server_address)?;
        let accepted = self
            .relay
            .start(&source, self.bitrate(bitrate), key)
            .await?;
        let status = self.relay.status().await;

        Ok(StartRelayResponse {
            accepted,
            source: status.source.unwrap_or(source.code),
            bitrate_kbps: status.bitrate_kbps.unwrap_or_default(),
        })
    }

    pub async fn stop_relay(&self) -> StopRelayResponse {
        let was_running = self.relay.is_desired().await;
        self.relay.stop().await;
        StopRelayResponse { was_running }
    }

    pub async fn relay_status(&self) -> RelayStatus {
        self.relay.status().await
    }

    // ========================================
    // Devices
    // ========================================

    pub async fn control_camera(
        &self,
        location: &str,
        power_on: bool,
    ) -> Result<ControlCameraResponse> {
        let source = self.registry.resolve(location)?;
        let target = self.registry.camera(source).ok_or_else(|| {
            Error::NotFound(format!("No controllable camera for {}", source.display_name))
        })?;

        let outcome = self.devices.control_camera(target, power_on).await?;
        Ok(ControlCameraResponse {
            success: true,
            address: outcome.address,
            protocol: outcome.protocol,
            power_on: outcome.power_on,
            acknowledged: outcome.acknowledged,
        })
    }

    pub async fn reset_device(&self, location: &str) -> Result<ResetDeviceResponse> {
        let source = self.registry.resolve(location)?;
        let address = self.registry.reset_address(source)?;

        self.devices.reboot_bridge(address).await?;
        Ok(ResetDeviceResponse {
            success: true,
            address: address.to_string(),
        })
    }

    // ========================================
    // Processes
    // ========================================

    pub async fn list_processes(&self) -> ProcessListing {
        self.supervisor.list_processes().await
    }

    /// Stop any tracked process; a stopped relay is relaunched by its loop
    pub async fn stop_process(&self, pid: u32) -> Result<StopProcessResponse> {
        let stopped = self.supervisor.stop_one(pid).await?;
        Ok(StopProcessResponse {
            success: true,
            pid: stopped.pid,
            termination: stopped.termination,
        })
    }

    // ========================================
    // Registry / health
    // ========================================

    pub fn locations(&self) -> LocationsResponse {
        LocationsResponse {
            display_names: self
                .registry
                .display_names()
                .into_iter()
                .map(String::from)
                .collect(),
            mapping: self
                .registry
                .display_mapping()
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            servers: self.registry.servers().to_vec(),
            cameras: self.registry.cameras().to_vec(),
            reset_addresses: self
                .registry
                .reset_addresses()
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    pub async fn health(&self) -> HealthSummary {
        let mut summary = HealthSummary {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_sec: self.started_at.elapsed().as_secs(),
            view_count: 0,
            record_count: 0,
            relay_count: 0,
            is_recording: false,
            relay_desired: self.relay.is_desired().await,
        };
        for (kind, count) in self.supervisor.counts().await {
            match kind {
                ProcessKind::View => summary.view_count = count,
                ProcessKind::Record => summary.record_count = count,
                ProcessKind::Relay => summary.relay_count = count,
            }
        }
        summary.is_recording = summary.record_count > 0;
        summary
    }

    /// Stop the relay loop and every tracked process
    pub async fn shutdown(&self) {
        self.relay.stop().await;
        let stopped = self.supervisor.shutdown().await;
        tracing::info!(stopped, "ControlApi shut down");
    }
}
