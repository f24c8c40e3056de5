//! RTSP Control Server Library
//!
//! Media-process supervision and device control for conference room cameras.
//!
//! ## Architecture (6 Components)
//!
//! 1. BitratePolicy - Encoder bitrate clamping
//! 2. LocationRegistry - Display name / code / address lookup
//! 3. DeviceController - Camera power (HTTP Digest, VISCA/UDP) and bridge reboot
//! 4. ProcessSupervisor - View / record / relay subprocess lifecycle
//! 5. RelaySupervisor - Crash-loop restart of the relay pipeline
//! 6. ControlApi - Operator operations (served by WebAPI)
//!
//! ## Design Principles
//!
//! - Processes are owned by exactly one registry; nothing else signals them
//! - Fallback chains are data (ordered tiers), not nested error handling
//! - No ambient global state: components are built once and shared via `AppState`

pub mod bitrate_policy;
pub mod control_api;
pub mod device_controller;
pub mod error;
pub mod location_registry;
pub mod models;
pub mod process_supervisor;
pub mod relay_supervisor;
pub mod state;
pub mod web_api;

pub use error::{Error, Result};
pub use state::AppState;
