use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use thiserror::Error;

use crate::adapter::AdapterError;
use crate::models::ApiResponse;

/// Response codes carried in the envelope next to the HTTP status
pub mod codes {
    pub const OK: i32 = 0;
    pub const UNAUTHORIZED: i32 = 1001;
    pub const INVALID_PARAMS: i32 = 1002;
    pub const NOT_INITIALIZED: i32 = 2001;
    pub const OPERATION_FAILED: i32 = 3001;
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid API key")]
    Unauthorized,

    #[error("Missing or invalid parameter: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, i32) {
        match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, codes::UNAUTHORIZED),
            AppError::ValidationError(_) => (StatusCode::BAD_REQUEST, codes::INVALID_PARAMS),
            AppError::Adapter(e) => match e {
                AdapterError::NotInitialized | AdapterError::FatalInit(_) => {
                    (StatusCode::BAD_REQUEST, codes::NOT_INITIALIZED)
                }
                AdapterError::Unsupported(_) => (StatusCode::BAD_REQUEST, codes::OPERATION_FAILED),
                AdapterError::InvalidArgument(_) => {
                    (StatusCode::BAD_REQUEST, codes::INVALID_PARAMS)
                }
                AdapterError::WriteFailure(_) | AdapterError::Backend(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, codes::OPERATION_FAILED)
                }
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!("{}", self);
        }

        let body = Json(ApiResponse::<Value> {
            code,
            message: self.to_string(),
            data: None,
        });

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
