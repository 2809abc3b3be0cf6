use serde_json::{Map, Value};
use thiserror::Error;

use crate::backend::BackendError;

#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("WeChat initialization failed: {0}")]
    FatalInit(String),

    #[error("WeChat instance not initialized")]
    NotInitialized,

    #[error("Not supported by the current library: {0}")]
    Unsupported(String),

    #[error("Send failed: {0}")]
    WriteFailure(#[source] BackendError),

    #[error("WeChat call failed: {0}")]
    Backend(#[from] BackendError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Empty value returned by read-style operations instead of an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Neutral {
    List,
    Mapping,
}

impl Neutral {
    /// Target-scoped reads are lists, global reads are mappings
    pub fn for_target(target: Option<&str>) -> Self {
        if target.is_some() {
            Self::List
        } else {
            Self::Mapping
        }
    }

    pub fn value(&self) -> Value {
        match self {
            Self::List => Value::Array(Vec::new()),
            Self::Mapping => Value::Object(Map::new()),
        }
    }
}

/// Outcome of [`WeChatAdapter::dispatch`](super::WeChatAdapter::dispatch)
#[derive(Debug)]
pub enum OperationResult {
    Success(Value),
    /// A recoverable failure collapsed into the declared neutral value
    Empty { reason: String, neutral: Neutral },
    Fatal(AdapterError),
}

impl OperationResult {
    pub fn empty(neutral: Neutral, reason: impl Into<String>) -> Self {
        Self::Empty {
            reason: reason.into(),
            neutral,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty { .. })
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }

    /// Payload for callers: the success value or the neutral value
    pub fn into_value(self) -> Result<Value, AdapterError> {
        match self {
            Self::Success(v) => Ok(v),
            Self::Empty { neutral, .. } => Ok(neutral.value()),
            Self::Fatal(e) => Err(e),
        }
    }
}

impl From<Result<Value, AdapterError>> for OperationResult {
    fn from(result: Result<Value, AdapterError>) -> Self {
        match result {
            Ok(v) => Self::Success(v),
            Err(e) => Self::Fatal(e),
        }
    }
}
