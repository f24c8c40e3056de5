//! ControlApi request/response types

use crate::location_registry::{CameraTarget, ControlProtocol, RtspServer};
use crate::process_supervisor::{FallbackAttempt, RecordingSession, TerminationOutcome};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct StartViewRequest {
    /// Display name or internal code
    pub location: String,
    #[serde(default)]
    pub server_address: Option<String>,
    #[serde(default)]
    pub bitrate: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartRecordingRequest {
    pub location: String,
    #[serde(default)]
    pub server_address: Option<String>,
    #[serde(default)]
    pub bitrate: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartRelayRequest {
    pub location: String,
    #[serde(default)]
    pub server_address: Option<String>,
    pub destination_key: String,
    #[serde(default)]
    pub bitrate: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ControlCameraRequest {
    pub location: String,
    pub power_on: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResetDeviceRequest {
    pub location: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartViewResponse {
    pub pid: u32,
    pub tier: usize,
    pub program: String,
    pub source: String,
    pub bitrate_kbps: u32,
    pub failed_attempts: Vec<FallbackAttempt>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartRecordingResponse {
    pub pid: u32,
    pub tier: usize,
    pub strategy: String,
    pub output_path: PathBuf,
    pub log_path: PathBuf,
    pub monitor_pid: Option<u32>,
    pub failed_attempts: Vec<FallbackAttempt>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StopRecordingResponse {
    pub was_recording: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordingStatusResponse {
    pub is_recording: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<RecordingSession>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartRelayResponse {
    /// `false` when a relay was already running
    pub accepted: bool,
    pub source: String,
    pub bitrate_kbps: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct StopRelayResponse {
    pub was_running: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StopProcessResponse {
    pub success: bool,
    pub pid: u32,
    pub termination: TerminationOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct StopAllResponse {
    pub stopped_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ControlCameraResponse {
    pub success: bool,
    pub address: String,
    pub protocol: ControlProtocol,
    pub power_on: bool,
    /// `false` for fire-and-forget UDP: sent, not confirmed
    pub acknowledged: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResetDeviceResponse {
    pub success: bool,
    pub address: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LocationsResponse {
    pub display_names: Vec<String>,
    /// code -> display name
    pub mapping: BTreeMap<String, String>,
    pub servers: Vec<RtspServer>,
    pub cameras: Vec<CameraTarget>,
    /// code -> bridge address
    pub reset_addresses: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthSummary {
    pub status: String,
    pub version: String,
    pub uptime_sec: u64,
    pub view_count: usize,
    pub record_count: usize,
    pub relay_count: usize,
    pub is_recording: bool,
    pub relay_desired: bool,
}
