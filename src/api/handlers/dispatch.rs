use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;
use std::sync::Arc;

use crate::adapter::OperationResult;
use crate::api::state::AppState;
use crate::error::Result;
use crate::models::{ApiResponse, DispatchRequest};

/// Run any adapter operation or library method by name
pub async fn dispatch_operation(
    State(state): State<Arc<AppState>>,
    Path(operation): Path<String>,
    Json(request): Json<DispatchRequest>,
) -> Result<Json<ApiResponse<Value>>> {
    match state.adapter.dispatch(&operation, request.into()).await {
        OperationResult::Success(value) => Ok(Json(ApiResponse::ok("ok", value))),
        OperationResult::Empty { reason, neutral } => {
            tracing::debug!("{} returned the neutral value: {}", operation, reason);
            Ok(Json(ApiResponse::ok(reason, neutral.value())))
        }
        OperationResult::Fatal(e) => Err(e.into()),
    }
}
