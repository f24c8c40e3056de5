//! Application state
//!
//! Configuration from the environment and the shared components handed to
//! request handlers.

use crate::control_api::ControlApi;
use crate::device_controller::{visca::DEFAULT_VISCA_PORT, Credentials};
use crate::process_supervisor::{binary_resolver::DEFAULT_FALLBACK_DIRS, RecordingChain};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Location table (sources, cameras, servers)
    pub locations_file: PathBuf,
    /// Recording output directory
    pub recordings_dir: PathBuf,
    /// Relay ffmpeg logs
    pub relay_log_dir: PathBuf,
    /// Streaming ingest base URL
    pub relay_endpoint: String,
    /// Wait between relay exit and relaunch
    pub relay_cooldown: Duration,
    /// Wait between terminate signal and forced kill
    pub termination_grace: Duration,
    /// Device HTTP/UDP command timeout
    pub device_timeout: Duration,
    /// Bitrate used when a request omits one (kbps)
    pub default_bitrate_kbps: u32,
    pub recording_chain: RecordingChain,
    pub visca_port: u16,
    pub camera_credentials: Credentials,
    pub bridge_credentials: Credentials,
    /// Directories searched after PATH for player/encoder binaries
    pub binary_fallback_dirs: String,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn desktop_dir(name: &str) -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Desktop")
        .join(name)
}

impl Default for AppConfig {
    fn default() -> Self {
        let recording_chain = match std::env::var("RECORDING_CHAIN") {
            Ok(value) => value.parse::<RecordingChain>().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Invalid RECORDING_CHAIN, using standard");
                RecordingChain::Standard
            }),
            Err(_) => RecordingChain::Standard,
        };

        Self {
            host: env_or("HOST", "0.0.0.0"),
            port: env_parse("PORT", 8000),
            locations_file: PathBuf::from(env_or("LOCATIONS_FILE", "config/locations.json")),
            recordings_dir: std::env::var("RECORDINGS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| desktop_dir("rtsp_recordings")),
            relay_log_dir: std::env::var("RELAY_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| desktop_dir("relay_logs")),
            relay_endpoint: env_or("RELAY_ENDPOINT", "rtmp://a.rtmp.youtube.com/live2"),
            relay_cooldown: Duration::from_secs(env_parse("RELAY_COOLDOWN_SECS", 5)),
            termination_grace: Duration::from_millis(env_parse("TERMINATION_GRACE_MS", 3000)),
            device_timeout: Duration::from_secs(env_parse("DEVICE_TIMEOUT_SECS", 5)),
            default_bitrate_kbps: env_parse("DEFAULT_BITRATE_KBPS", 3000),
            recording_chain,
            visca_port: env_parse("VISCA_PORT", DEFAULT_VISCA_PORT),
            camera_credentials: Credentials {
                username: env_or("CAMERA_USERNAME", "admin"),
                password: env_or("CAMERA_PASSWORD", "admin"),
            },
            bridge_credentials: Credentials {
                username: env_or("BRIDGE_USERNAME", "admin"),
                password: env_or("BRIDGE_PASSWORD", "admin"),
            },
            binary_fallback_dirs: env_or("BINARY_FALLBACK_DIRS", DEFAULT_FALLBACK_DIRS),
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Control operations
    pub control: Arc<ControlApi>,
}

impl AppState {
    pub fn new(control: Arc<ControlApi>) -> Self {
        Self { control }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_parse_falls_back() {
        std::env::set_var("RTSP_CONTROL_TEST_PORT", "not-a-number");
        assert_eq!(env_parse("RTSP_CONTROL_TEST_PORT", 8000u16), 8000);
        std::env::set_var("RTSP_CONTROL_TEST_PORT", " 9100 ");
        assert_eq!(env_parse("RTSP_CONTROL_TEST_PORT", 8000u16), 9100);
        std::env::remove_var("RTSP_CONTROL_TEST_PORT");
        assert_eq!(env_parse("RTSP_CONTROL_TEST_PORT", 8000u16), 8000);
    }

    #[test]
    fn test_desktop_dir() {
        assert!(desktop_dir("relay_logs").ends_with("Desktop/relay_logs"));
    }
}
