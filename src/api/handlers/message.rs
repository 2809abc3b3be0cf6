//! Message sending and polling handlers

use axum::{
    extract::{Query, State},
    Json,
};
use serde_json::Value;
use std::sync::Arc;

use crate::api::state::AppState;
use crate::error::{AppError, Result};
use crate::models::{ApiResponse, MediaFlags, SendFileRequest, SendMessageRequest};

fn validate_send(request: &SendMessageRequest) -> Result<()> {
    if request.receiver.trim().is_empty() {
        return Err(AppError::ValidationError("receiver".to_string()));
    }
    if request.message.is_empty() {
        return Err(AppError::ValidationError("message".to_string()));
    }
    Ok(())
}

pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<ApiResponse<Value>>> {
    validate_send(&request)?;

    let result = state
        .adapter
        .send_message(
            request.receiver.trim(),
            &request.message,
            request.clear,
            Some(request.at_list),
        )
        .await?;
    Ok(Json(ApiResponse::ok("Message sent", result)))
}

pub async fn send_typing_text(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<ApiResponse<Value>>> {
    validate_send(&request)?;

    let result = state
        .adapter
        .send_typed_text(
            request.receiver.trim(),
            &request.message,
            request.clear,
            Some(request.at_list),
        )
        .await?;
    Ok(Json(ApiResponse::ok("Message sent", result)))
}

pub async fn send_file(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SendFileRequest>,
) -> Result<Json<ApiResponse<Value>>> {
    if request.receiver.trim().is_empty() {
        return Err(AppError::ValidationError("receiver".to_string()));
    }
    if request.file_paths.is_empty() {
        return Err(AppError::ValidationError("file_paths".to_string()));
    }

    let result = state
        .adapter
        .send_files(request.receiver.trim(), request.file_paths)
        .await?;
    Ok(Json(ApiResponse::ok("File sent", result)))
}

/// Next unread batch; an empty list when nothing new could be read
pub async fn get_next_new_message(
    State(state): State<Arc<AppState>>,
    Query(flags): Query<MediaFlags>,
) -> Json<ApiResponse<Value>> {
    let messages = state
        .adapter
        .poll_next_new_message(&flags.to_options(false))
        .await;
    Json(ApiResponse::ok("ok", messages))
}
