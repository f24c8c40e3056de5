//! BitratePolicy - Encoder bitrate clamping
//!
//! ## Responsibilities
//!
//! - Clamp operator-requested bitrates into the safe encoder range
//! - Derive `maxrate` / `bufsize` for ffmpeg encode commands
//!
//! Clamping is logged at warn level so operators can see it in the server log.

use serde::Serialize;

/// Lowest accepted bitrate (kbps)
pub const MIN_BITRATE_KBPS: u32 = 1000;

/// Highest accepted bitrate (kbps)
pub const MAX_BITRATE_KBPS: u32 = 10000;

/// Clamp a requested bitrate (kbps) into `[MIN_BITRATE_KBPS, MAX_BITRATE_KBPS]`
pub fn clamp_bitrate(requested: u32) -> u32 {
    if requested < MIN_BITRATE_KBPS {
        tracing::warn!(
            requested_kbps = requested,
            effective_kbps = MIN_BITRATE_KBPS,
            "Bitrate too low, raised to minimum"
        );
        MIN_BITRATE_KBPS
    } else if requested > MAX_BITRATE_KBPS {
        tracing::warn!(
            requested_kbps = requested,
            effective_kbps = MAX_BITRATE_KBPS,
            "Bitrate too high, lowered to maximum"
        );
        MAX_BITRATE_KBPS
    } else {
        requested
    }
}

/// Encoder rate-control parameters derived from an effective bitrate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EncoderRates {
    pub bitrate_kbps: u32,
    pub maxrate_kbps: u32,
    pub bufsize_kbps: u32,
}

impl EncoderRates {
    /// Clamp `requested` and derive maxrate (1.5x) and bufsize (3x)
    pub fn from_requested(requested: u32) -> Self {
        let effective = clamp_bitrate(requested);
        Self {
            bitrate_kbps: effective,
            maxrate_kbps: effective * 3 / 2,
            bufsize_kbps: effective * 3,
        }
    }

    /// `-b:v` argument value
    pub fn bitrate_arg(&self) -> String {
        format!("{}k", self.bitrate_kbps)
    }

    /// `-maxrate` argument value
    pub fn maxrate_arg(&self) -> String {
        format!("{}k", self.maxrate_kbps)
    }

    /// `-bufsize` argument value
    pub fn bufsize_arg(&self) -> String {
        format!("{}k", self.bufsize_kbps)
    }
}
