//! Moments handlers, `wxautox` only

use axum::{
    extract::{Query, State},
    Json,
};
use serde_json::Value;
use std::sync::Arc;

use crate::adapter::MomentPost;
use crate::api::state::AppState;
use crate::error::{AppError, Result};
use crate::models::{ApiResponse, GetMomentsQuery, LikeMomentRequest, SaveMomentImagesRequest};

pub async fn open_moments(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse<Value>>> {
    let window = state.adapter.open_moments().await?;
    Ok(Json(ApiResponse::ok("Moments opened", window)))
}

pub async fn get_moments(
    State(state): State<Arc<AppState>>,
    Query(query): Query<GetMomentsQuery>,
) -> Result<Json<ApiResponse<Vec<MomentPost>>>> {
    let posts = state.adapter.get_moments(query.n, query.timeout).await?;
    Ok(Json(ApiResponse::ok(
        format!("Fetched {} posts", posts.len()),
        posts,
    )))
}

pub async fn save_images(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SaveMomentImagesRequest>,
) -> Result<Json<ApiResponse<Value>>> {
    let (Some(index), Some(path)) = (request.moment_index, request.save_path) else {
        return Err(AppError::ValidationError(
            "moment_index and save_path".to_string(),
        ));
    };

    let saved = state.adapter.save_moment_images(index, &path).await?;
    Ok(Json(ApiResponse::ok("Images saved", saved)))
}

pub async fn like_moment(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LikeMomentRequest>,
) -> Result<Json<ApiResponse<Value>>> {
    let Some(index) = request.moment_index else {
        return Err(AppError::ValidationError("moment_index".to_string()));
    };

    let liked = state.adapter.like_moment(index).await?;
    Ok(Json(ApiResponse::ok("Liked", liked)))
}
