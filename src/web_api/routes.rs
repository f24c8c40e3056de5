//! API Routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};

use crate::control_api::{
    ControlCameraRequest, ResetDeviceRequest, StartRecordingRequest, StartRelayRequest,
    StartViewRequest,
};
use crate::error::Result;
use crate::models::ApiResponse;
use crate::state::AppState;

/// Create API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(super::health_check))
        // Registry
        .route("/api/locations", get(list_locations))
        // View
        .route("/api/view", post(start_view))
        .route("/api/view/:pid", delete(stop_view))
        .route("/api/view", delete(stop_all_views))
        // Recording
        .route("/api/recording", post(start_recording))
        .route("/api/recording", delete(stop_recording))
        .route("/api/recording/status", get(recording_status))
        // Relay
        .route("/api/relay", post(start_relay))
        .route("/api/relay", delete(stop_relay))
        .route("/api/relay/status", get(relay_status))
        // Devices
        .route("/api/camera/power", post(control_camera))
        .route("/api/device/reset", post(reset_device))
        // Processes
        .route("/api/processes", get(list_processes))
        .route("/api/processes/:pid", delete(stop_process))
        .with_state(state)
}

// ========================================
// Registry
// ========================================

async fn list_locations(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(state.control.locations()))
}

// ========================================
// View
// ========================================

async fn start_view(
    State(state): State<AppState>,
    Json(req): Json<StartViewRequest>,
) -> Result<impl IntoResponse> {
    let started = state
        .control
        .start_view(&req.location, req.server_address.as_deref(), req.bitrate)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(started))))
}

async fn stop_view(
    State(state): State<AppState>,
    Path(pid): Path<u32>,
) -> Result<impl IntoResponse> {
    let stopped = state.control.stop_view(pid).await?;
    Ok(Json(ApiResponse::success(stopped)))
}

async fn stop_all_views(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(state.control.stop_all_views().await))
}

// ========================================
// Recording
// ========================================

async fn start_recording(
    State(state): State<AppState>,
    Json(req): Json<StartRecordingRequest>,
) -> Result<impl IntoResponse> {
    let started = state
        .control
        .start_recording(&req.location, req.server_address.as_deref(), req.bitrate)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(started))))
}

async fn stop_recording(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(state.control.stop_recording().await))
}

async fn recording_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(state.control.recording_status().await))
}

// ========================================
// Relay
// ========================================

async fn start_relay(
    State(state): State<AppState>,
    Json(req): Json<StartRelayRequest>,
) -> Result<impl IntoResponse> {
    let started = state
        .control
        .start_relay(
            &req.location,
            req.server_address.as_deref(),
            &req.destination_key,
            req.bitrate,
        )
        .await?;
    let status = if started.accepted {
        StatusCode::ACCEPTED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(ApiResponse::success(started))))
}

async fn stop_relay(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(state.control.stop_relay().await))
}

async fn relay_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(state.control.relay_status().await))
}

// ========================================
// Devices
// ========================================

async fn control_camera(
    State(state): State<AppState>,
    Json(req): Json<ControlCameraRequest>,
) -> Result<impl IntoResponse> {
    let result = state
        .control
        .control_camera(&req.location, req.power_on)
        .await?;
    Ok(Json(ApiResponse::success(result)))
}

async fn reset_device(
    State(state): State<AppState>,
    Json(req): Json<ResetDeviceRequest>,
) -> Result<impl IntoResponse> {
    let result = state.control.reset_device(&req.location).await?;
    Ok(Json(ApiResponse::success(result)))
}

// ========================================
// Processes
// ========================================

async fn list_processes(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(state.control.list_processes().await))
}

async fn stop_process(
    State(state): State<AppState>,
    Path(pid): Path<u32>,
) -> Result<impl IntoResponse> {
    let stopped = state.control.stop_process(pid).await?;
    Ok(Json(ApiResponse::success(stopped)))
}
