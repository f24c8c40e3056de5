//! DeviceController - Camera and bridge hardware control
//!
//! ## Responsibilities
//!
//! - Camera power on/standby over HTTP (Digest) or VISCA-over-UDP
//! - Bridge device reboot over HTTP (Basic)
//!
//! Every command is sent once with a short timeout. Retry policy belongs to
//! the caller.

pub mod bridge;
pub mod digest;
pub mod http_toggle;
pub mod visca;

use crate::error::{Error, Result};
use crate::location_registry::{CameraTarget, ControlProtocol};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

/// Username/password pair for a device class
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// DeviceController configuration
#[derive(Debug, Clone)]
pub struct DeviceControllerConfig {
    /// Camera web UI credentials (Digest)
    pub camera_credentials: Credentials,
    /// Bridge device credentials (Basic)
    pub bridge_credentials: Credentials,
    /// VISCA-over-IP port
    pub visca_port: u16,
    /// Per-command timeout
    pub timeout: Duration,
}

/// Result of a camera command
#[derive(Debug, Clone, Serialize)]
pub struct ControlOutcome {
    pub address: String,
    pub protocol: ControlProtocol,
    pub power_on: bool,
    /// `false` for UDP frames: the device never confirms
    pub acknowledged: bool,
}

/// DeviceController instance
pub struct DeviceController {
    client: Client,
    config: DeviceControllerConfig,
}

impl DeviceController {
    /// Create new DeviceController
    pub fn new(config: DeviceControllerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Power a camera on or to standby using its configured protocol
    pub async fn control_camera(
        &self,
        target: &CameraTarget,
        power_on: bool,
    ) -> Result<ControlOutcome> {
        tracing::info!(
            source = %target.source_code,
            address = %target.address,
            protocol = target.control_protocol.as_str(),
            power_on,
            "Camera control requested"
        );

        let acknowledged = match target.control_protocol {
            ControlProtocol::HttpToggle => {
                // The Digest challenge and the authorized retry share one deadline
                let command = http_toggle::send_power_command(
                    &self.client,
                    &target.address,
                    &self.config.camera_credentials,
                    power_on,
                );
                tokio::time::timeout(self.config.timeout, command)
                    .await
                    .map_err(|_| {
                        Error::control_failed(
                            &target.address,
                            None,
                            format!("timed out after {}ms", self.config.timeout.as_millis()),
                        )
                    })??;
                true
            }
            ControlProtocol::BinaryUdp => {
                visca::send_frame(
                    &target.address,
                    self.config.visca_port,
                    &visca::power_frame(power_on),
                    self.config.timeout,
                )
                .await?;
                false
            }
        };

        Ok(ControlOutcome {
            address: target.address.clone(),
            protocol: target.control_protocol,
            power_on,
            acknowledged,
        })
    }

    /// Reboot the bridge device at `address`
    pub async fn reboot_bridge(&self, address: &str) -> Result<()> {
        tracing::info!(address = %address, "Bridge reboot requested");
        bridge::reboot(&self.client, address, &self.config.bridge_credentials).await
    }
}
