//! WeChat lifecycle handlers

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::state::AppState;
use crate::error::Result;
use crate::models::{ApiResponse, InitializeResponse, StatusResponse};

/// Load the automation library now instead of on first use
pub async fn initialize(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<InitializeResponse>>> {
    let adapter = &state.adapter;
    adapter.ensure_initialized().await?;

    let lib = adapter
        .resolved_backend()
        .unwrap_or_else(|| adapter.requested_backend());
    let window_name = adapter.get_display_name().await;
    tracing::info!("WeChat initialized via API ({}, {})", lib, window_name);

    Ok(Json(ApiResponse::ok(
        "WeChat initialized",
        InitializeResponse {
            lib: lib.lib_name().to_string(),
            window_name,
        },
    )))
}

/// Report initialization and connection state. Never initializes.
pub async fn status(State(state): State<Arc<AppState>>) -> Json<ApiResponse<StatusResponse>> {
    let adapter = &state.adapter;
    let initialized = adapter.is_initialized();

    let (connected, window_name) = if initialized {
        (
            adapter.check_connection().await,
            adapter.get_display_name().await,
        )
    } else {
        (false, adapter.cached_display_name())
    };

    Json(ApiResponse::ok(
        "ok",
        StatusResponse {
            initialized,
            connected,
            requested_lib: adapter.requested_backend().lib_name().to_string(),
            resolved_lib: adapter.resolved_backend().map(|k| k.lib_name().to_string()),
            window_name,
            listen_targets: adapter.listen_registry().len(),
        },
    ))
}
