use axum::{extract::State, Json};
use serde_json::Value;
use std::sync::Arc;

use crate::adapter::GroupSummary;
use crate::api::state::AppState;
use crate::error::Result;
use crate::models::ApiResponse;

pub async fn get_friends(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<Value>>>> {
    let friends = state.adapter.get_friend_list().await?;
    Ok(Json(ApiResponse::ok("ok", friends)))
}

pub async fn get_groups(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<GroupSummary>>>> {
    let groups = state.adapter.get_group_list().await?;
    Ok(Json(ApiResponse::ok("ok", groups)))
}
