//! HTTP power toggle (`/command/main.cgi`) with Digest authentication

use super::digest::{generate_cnonce, DigestChallenge, DigestRequest};
use super::Credentials;
use crate::error::{Error, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, WWW_AUTHENTICATE};
use reqwest::{Client, StatusCode};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Request path + query for a power command
pub fn command_uri(power_on: bool) -> String {
    format!(
        "/command/main.cgi?System={}",
        if power_on { "on" } else { "standby" }
    )
}

/// Browser-like headers; some firmwares reject requests without Referer/Origin
fn browser_headers(address: &str) -> Result<HeaderMap> {
    let header = |value: String| {
        HeaderValue::from_str(&value)
            .map_err(|e| Error::Validation(format!("Invalid camera address {}: {}", address, e)))
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        reqwest::header::USER_AGENT,
        HeaderValue::from_static(BROWSER_USER_AGENT),
    );
    headers.insert(
        reqwest::header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache"),
    );
    headers.insert(reqwest::header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(reqwest::header::REFERER, header(format!("http://{}/", address))?);
    headers.insert(reqwest::header::ORIGIN, header(format!("http://{}", address))?);
    Ok(headers)
}

/// Send a power command; success is HTTP 200 only, no retries
pub async fn send_power_command(
    client: &Client,
    address: &str,
    credentials: &Credentials,
    power_on: bool,
) -> Result<()> {
    let uri = command_uri(power_on);
    let url = format!("http://{}{}", address, uri);
    let headers = browser_headers(address)?;

    tracing::debug!(url = %url, power_on, "Sending HTTP camera power command");

    let first = client
        .get(&url)
        .headers(headers.clone())
        .send()
        .await
        .map_err(|e| Error::control_failed(address, None, format!("request failed: {}", e)))?;

    let response = match first.status() {
        StatusCode::UNAUTHORIZED => {
            let challenge = first
                .headers()
                .get_all(WWW_AUTHENTICATE)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .find_map(DigestChallenge::parse)
                .ok_or_else(|| {
                    Error::control_failed(address, Some(401), "no Digest challenge offered")
                })?;

            if !challenge.is_supported() {
                return Err(Error::control_failed(
                    address,
                    Some(401),
                    format!(
                        "unsupported digest algorithm {}",
                        challenge.algorithm.as_deref().unwrap_or_default()
                    ),
                ));
            }

            let cnonce = generate_cnonce();
            let authorization = challenge.authorization(&DigestRequest {
                username: &credentials.username,
                password: &credentials.password,
                method: "GET",
                uri: &uri,
                cnonce: &cnonce,
                nc: 1,
            });
            let authorization = HeaderValue::from_str(&authorization).map_err(|e| {
                Error::control_failed(address, None, format!("invalid credentials: {}", e))
            })?;

            client
                .get(&url)
                .headers(headers)
                .header(AUTHORIZATION, authorization)
                .send()
                .await
                .map_err(|e| {
                    Error::control_failed(address, None, format!("request failed: {}", e))
                })?
        }
        _ => first,
    };

    let status = response.status();
    if status != StatusCode::OK {
        tracing::error!(address = %address, status = %status, "HTTP camera command rejected");
        return Err(Error::control_failed(
            address,
            Some(status.as_u16()),
            format!("HTTP {}", status.as_u16()),
        ));
    }

    tracing::info!(
        address = %address,
        power = if power_on { "on" } else { "standby" },
        "HTTP camera power command accepted"
    );
    Ok(())
}
