use serde::Serialize;

use crate::error::codes;

/// `{code, message, data}` envelope used by every API response
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            code: codes::OK,
            message: message.into(),
            data: Some(data),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct InitializeResponse {
    pub lib: String,
    pub window_name: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub initialized: bool,
    pub connected: bool,
    pub requested_lib: String,
    pub resolved_lib: Option<String>,
    pub window_name: String,
    pub listen_targets: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_serialization() {
        let response = ApiResponse::ok("done", vec!["Alice"]);
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(json, r#"{"code":0,"message":"done","data":["Alice"]}"#);
    }
}
