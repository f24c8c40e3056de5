//! WebAPI - REST API Endpoints
//!
//! ## Responsibilities
//!
//! - HTTP routes over `ControlApi`
//! - Request decoding and response envelopes
//!
//! Handlers carry no logic of their own; errors render through
//! `Error::into_response`.

mod routes;

pub use routes::create_router;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::models::ApiResponse;
use crate::state::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(state.control.health().await))
}
