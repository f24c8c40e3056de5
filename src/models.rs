//! Shared response envelope

use serde::{Deserialize, Serialize};

/// Standard API response wrapper
///
/// Failures never use this type; they render through `Error::into_response`
/// as `{ok: false, error_code, message}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self { ok: true, data }
    }
}
