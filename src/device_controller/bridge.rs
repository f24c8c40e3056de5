//! Bridge device reboot (`/api/v1/reboot.lua`, HTTP Basic auth)

use super::Credentials;
use crate::error::{Error, Result};
use reqwest::{Client, StatusCode};

pub fn reboot_url(address: &str) -> String {
    format!("http://{}/api/v1/reboot.lua", address)
}

/// Reboot the companion bridge device at `address`
pub async fn reboot(client: &Client, address: &str, credentials: &Credentials) -> Result<()> {
    let url = reboot_url(address);

    let response = client
        .get(&url)
        .basic_auth(&credentials.username, Some(&credentials.password))
        .send()
        .await
        .map_err(|e| Error::control_failed(address, None, format!("request failed: {}", e)))?;

    let status = response.status();
    if status != StatusCode::OK {
        tracing::error!(address = %address, status = %status, "Bridge reboot rejected");
        return Err(Error::control_failed(
            address,
            Some(status.as_u16()),
            format!("HTTP {}", status.as_u16()),
        ));
    }

    tracing::info!(address = %address, "Bridge reboot accepted");
    Ok(())
}
