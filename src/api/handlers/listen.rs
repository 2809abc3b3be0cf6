//! Listen target handlers

use axum::{
    extract::{Query, State},
    Json,
};
use serde_json::Value;
use std::sync::Arc;

use crate::api::state::AppState;
use crate::error::{AppError, Result};
use crate::models::{AddListenRequest, ApiResponse, ListenMessagesQuery, RemoveListenRequest};

pub async fn add_listen_chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AddListenRequest>,
) -> Result<Json<ApiResponse<Value>>> {
    let who = request.who.trim();
    if who.is_empty() {
        return Err(AppError::ValidationError("who".to_string()));
    }

    let options = request.flags.to_options(request.exact);
    let result = state.adapter.register_listen(who, &options).await?;
    Ok(Json(ApiResponse::ok(format!("Listening to {}", who), result)))
}

pub async fn get_listen_messages(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListenMessagesQuery>,
) -> Json<ApiResponse<Value>> {
    let who = query
        .who
        .as_deref()
        .map(str::trim)
        .filter(|w| !w.is_empty());
    let messages = state.adapter.fetch_listen_messages(who).await;
    Json(ApiResponse::ok("ok", messages))
}

pub async fn remove_listen_chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RemoveListenRequest>,
) -> Result<Json<ApiResponse<bool>>> {
    let who = request.who.trim();
    if who.is_empty() {
        return Err(AppError::ValidationError("who".to_string()));
    }

    state.adapter.ensure_initialized().await?;
    let removed = state.adapter.deregister_listen(who).await;
    let message = if removed {
        format!("Stopped listening to {}", who)
    } else {
        format!("Could not remove listen target {}", who)
    };
    Ok(Json(ApiResponse::ok(message, removed)))
}
