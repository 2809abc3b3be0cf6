use axum::{extract::State, Json};
use serde_json::Value;
use std::sync::Arc;

use crate::api::state::AppState;
use crate::error::{AppError, Result};
use crate::models::{ApiResponse, OpenChatRequest};

pub async fn open_chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<OpenChatRequest>,
) -> Result<Json<ApiResponse<Value>>> {
    let who = request.who.trim();
    if who.is_empty() {
        return Err(AppError::ValidationError("who".to_string()));
    }

    let result = state.adapter.open_chat(who, request.exact).await?;
    Ok(Json(ApiResponse::ok(format!("Opened chat {}", who), result)))
}
