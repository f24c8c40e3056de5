//! LocationRegistry - Room / source lookup table
//!
//! ## Responsibilities
//!
//! - Map display names and internal codes to `Source`
//! - Per-room camera control targets and bridge reset addresses
//! - Allow-list of RTSP servers
//!
//! The table is loaded once at startup and never mutated. Lookups are linear;
//! a deployment has a couple of dozen rooms at most.

mod types;

pub use types::*;

use crate::error::{Error, Result};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Read-only location registry
#[derive(Debug, Clone)]
pub struct LocationRegistry {
    servers: Vec<RtspServer>,
    sources: Vec<Source>,
    cameras: Vec<CameraTarget>,
}

impl LocationRegistry {
    /// Build from a parsed table, rejecting duplicate codes or display names
    pub fn new(table: LocationTable) -> Result<Self> {
        let mut codes = HashSet::new();
        let mut names = HashSet::new();
        for source in &table.sources {
            if !codes.insert(source.code.as_str()) {
                return Err(Error::Config(format!(
                    "Duplicate source code: {}",
                    source.code
                )));
            }
            if !names.insert(source.display_name.as_str()) {
                return Err(Error::Config(format!(
                    "Duplicate display name: {}",
                    source.display_name
                )));
            }
        }

        for camera in &table.cameras {
            if !codes.contains(camera.source_code.as_str()) {
                tracing::warn!(
                    source_code = %camera.source_code,
                    address = %camera.address,
                    "Camera refers to unknown source code"
                );
            }
        }

        Ok(Self {
            servers: table.servers,
            sources: table.sources,
            cameras: table.cameras,
        })
    }

    /// Parse a JSON location table
    pub fn from_json(json: &str) -> Result<Self> {
        let table: LocationTable = serde_json::from_str(json)?;
        Self::new(table)
    }

    /// Load a JSON location table from disk
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read location table {}: {}",
                path.display(),
                e
            ))
        })?;
        let registry = Self::from_json(&json)?;

        tracing::info!(
            path = %path.display(),
            sources = registry.sources.len(),
            cameras = registry.cameras.len(),
            servers = registry.servers.len(),
            "Location table loaded"
        );

        Ok(registry)
    }

    /// Resolve either a display name or an internal code
    ///
    /// Display names are matched first; internal codes are still accepted for
    /// older clients that send them directly.
    pub fn resolve(&self, name_or_code: &str) -> Result<&Source> {
        self.sources
            .iter()
            .find(|s| s.display_name == name_or_code)
            .or_else(|| self.sources.iter().find(|s| s.code == name_or_code))
            .ok_or_else(|| Error::NotFound(format!("Unknown location: {}", name_or_code)))
    }

    /// Bridge device address used for reboot
    pub fn reset_address<'a>(&self, source: &'a Source) -> Result<&'a str> {
        source.reset_address.as_deref().ok_or_else(|| {
            Error::NotFound(format!("No reset device for {}", source.display_name))
        })
    }

    /// Controllable camera of a room, if any
    pub fn camera(&self, source: &Source) -> Option<&CameraTarget> {
        self.cameras.iter().find(|c| c.source_code == source.code)
    }

    /// Reject server addresses outside a non-empty allow-list
    pub fn check_server(&self, address: &str) -> Result<()> {
        if self.servers.is_empty() || self.servers.iter().any(|s| s.address == address) {
            Ok(())
        } else {
            Err(Error::Validation(format!(
                "Unknown RTSP server address: {}",
                address
            )))
        }
    }

    pub fn servers(&self) -> &[RtspServer] {
        &self.servers
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn cameras(&self) -> &[CameraTarget] {
        &self.cameras
    }

    /// Display names in table order
    pub fn display_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.display_name.as_str()).collect()
    }

    /// code -> display name
    pub fn display_mapping(&self) -> BTreeMap<&str, &str> {
        self.sources
            .iter()
            .map(|s| (s.code.as_str(), s.display_name.as_str()))
            .collect()
    }

    /// code -> bridge reset address
    pub fn reset_addresses(&self) -> BTreeMap<&str, &str> {
        self.sources
            .iter()
            .filter_map(|s| s.reset_address.as_deref().map(|addr| (s.code.as_str(), addr)))
            .collect()
    }
}
