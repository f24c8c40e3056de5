//! VISCA-over-IP power frames (UDP, fire-and-forget)
//!
//! The camera never acknowledges these frames; a successful send only means
//! the datagram was handed to the network stack.

use crate::error::{Error, Result};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;

/// Default VISCA-over-IP control port
pub const DEFAULT_VISCA_PORT: u16 = 52381;

/// `81 01 04 00 02 FF` - CAM_Power On
pub const POWER_ON_FRAME: [u8; 6] = [0x81, 0x01, 0x04, 0x00, 0x02, 0xFF];

/// `81 01 04 00 03 FF` - CAM_Power Standby
pub const POWER_OFF_FRAME: [u8; 6] = [0x81, 0x01, 0x04, 0x00, 0x03, 0xFF];

pub fn power_frame(power_on: bool) -> [u8; 6] {
    if power_on {
        POWER_ON_FRAME
    } else {
        POWER_OFF_FRAME
    }
}

/// Send one frame to `(address, port)`
pub async fn send_frame(
    address: &str,
    port: u16,
    frame: &[u8],
    send_timeout: Duration,
) -> Result<()> {
    let target = resolve(address, port).await?;

    // Bind to the unspecified address of the target's family
    let bind_addr: SocketAddr = if target.is_ipv4() {
        ([0, 0, 0, 0], 0).into()
    } else {
        ([0u16; 8], 0).into()
    };

    let socket = UdpSocket::bind(bind_addr)
        .await
        .map_err(|e| Error::control_failed(address, None, format!("UDP bind failed: {}", e)))?;

    let sent = timeout(send_timeout, socket.send_to(frame, target))
        .await
        .map_err(|_| Error::control_failed(address, None, "UDP send timed out"))?
        .map_err(|e| Error::control_failed(address, None, format!("UDP send failed: {}", e)))?;

    if sent != frame.len() {
        return Err(Error::control_failed(
            address,
            None,
            format!("short UDP send ({} of {} bytes)", sent, frame.len()),
        ));
    }

    tracing::info!(
        target = %target,
        frame = %hex(frame),
        "VISCA frame sent"
    );
    Ok(())
}

async fn resolve(address: &str, port: u16) -> Result<SocketAddr> {
    tokio::net::lookup_host((address, port))
        .await
        .map_err(|e| Error::control_failed(address, None, format!("address lookup failed: {}", e)))?
        .next()
        .ok_or_else(|| Error::control_failed(address, None, "address did not resolve"))
}

fn hex(frame: &[u8]) -> String {
    frame
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
