//! LocationRegistry type definitions

use serde::{Deserialize, Serialize};

/// RTSP port served by every relay server
pub const RTSP_PORT: u16 = 554;

/// One network video feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Stable internal code (also the RTSP path)
    pub code: String,
    /// Operator-facing name
    pub display_name: String,
    /// RTSP host serving this code
    pub server_address: String,
    /// Companion bridge device used for reboot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_address: Option<String>,
}

impl Source {
    /// `rtsp://{server}:554/{code}`
    pub fn rtsp_url(&self) -> String {
        format!("rtsp://{}:{}/{}", self.server_address, RTSP_PORT, self.code)
    }

    /// Same source served from another RTSP server
    pub fn with_server(&self, server_address: &str) -> Self {
        Self {
            server_address: server_address.to_string(),
            ..self.clone()
        }
    }
}

/// Camera control protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlProtocol {
    /// `main.cgi?System=on|standby` with HTTP Digest auth
    #[serde(alias = "http")]
    HttpToggle,
    /// 6-byte VISCA frame over UDP
    #[serde(alias = "visca")]
    BinaryUdp,
}

impl ControlProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlProtocol::HttpToggle => "http_toggle",
            ControlProtocol::BinaryUdp => "binary_udp",
        }
    }
}

/// Controllable camera in a room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraTarget {
    pub source_code: String,
    pub address: String,
    pub control_protocol: ControlProtocol,
}

/// Known RTSP relay server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RtspServer {
    pub address: String,
    pub label: String,
}

/// On-disk layout of the location table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationTable {
    #[serde(default)]
    pub servers: Vec<RtspServer>,
    pub sources: Vec<Source>,
    #[serde(default)]
    pub cameras: Vec<CameraTarget>,
}
