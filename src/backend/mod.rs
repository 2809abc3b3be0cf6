//! Automation backend seam
//!
//! The two WeChat automation libraries (`wxauto` and `wxautox`) are
//! dynamically typed and live outside this process. Everything the adapter
//! needs from them is expressed through [`AutomationBackend`]: capability
//! checks, attribute reads and keyword-argument method calls.
//!
//! ## Architecture
//!
//! - `AutomationBackend` - one constructed library instance
//! - `BackendFactory` - capability probing + instance construction
//! - `BridgeFactory` / `BridgeBackend` - HTTP implementation talking to the
//!   automation bridge process that hosts the real library

pub mod bridge;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

pub use bridge::{BridgeBackend, BridgeFactory};

/// Which automation library backs the adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    /// `wxauto`: the free library, the floor of the fallback order
    #[serde(rename = "wxauto")]
    Standard,
    /// `wxautox`: the Plus library with extra parameters and features
    #[serde(rename = "wxautox")]
    Extended,
}

impl BackendKind {
    pub fn lib_name(&self) -> &'static str {
        match self {
            Self::Standard => "wxauto",
            Self::Extended => "wxautox",
        }
    }

    pub fn is_extended(&self) -> bool {
        matches!(self, Self::Extended)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.lib_name())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "wxauto" | "standard" => Ok(Self::Standard),
            "wxautox" | "extended" | "plus" => Ok(Self::Extended),
            other => Err(format!("unknown WeChat library: {}", other)),
        }
    }
}

/// Errors raised by a backend instance or the bridge carrying it
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("{method} failed: {message}")]
    Call { method: String, message: String },

    #[error("method not available: {0}")]
    MissingMethod(String),

    #[error("output encoding error: {0}")]
    Encoding(String),

    #[error("bridge transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("bridge protocol error: {0}")]
    Protocol(String),
}

impl BackendError {
    pub fn call(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Call {
            method: method.into(),
            message: message.into(),
        }
    }
}

/// Positional and keyword arguments of one backend call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallArgs {
    #[serde(default)]
    pub positional: Vec<Value>,
    #[serde(default)]
    pub keyword: Map<String, Value>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Set a keyword argument
    pub fn kwarg(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.keyword.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.keyword.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.keyword.remove(key)
    }

    /// Look up an argument that may be passed either as the first positional
    /// argument or by keyword (e.g. `who`)
    pub fn first_or(&self, key: &str) -> Option<&Value> {
        self.positional.first().or_else(|| self.keyword.get(key))
    }

    /// String form of [`CallArgs::first_or`], ignoring null and empty values
    pub fn first_str_or(&self, key: &str) -> Option<String> {
        self.first_or(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    /// Copy only the listed keyword arguments, keeping positionals
    pub fn retain_keys(&self, keys: &[&str]) -> Self {
        let keyword = self
            .keyword
            .iter()
            .filter(|(k, _)| keys.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Self {
            positional: self.positional.clone(),
            keyword,
        }
    }
}

/// Options applied when constructing a backend instance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConstructOptions {
    /// Force the library's console output to UTF-8
    pub utf8_output: bool,
}

/// Result of a non-raising capability probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeReport {
    pub available: bool,
    pub details: String,
}

impl ProbeReport {
    pub fn available(details: impl Into<String>) -> Self {
        Self {
            available: true,
            details: details.into(),
        }
    }

    pub fn unavailable(details: impl Into<String>) -> Self {
        Self {
            available: false,
            details: details.into(),
        }
    }
}

/// One constructed automation library instance
#[async_trait]
pub trait AutomationBackend: Send + Sync {
    /// The library this instance belongs to
    fn kind(&self) -> BackendKind;

    /// Whether the instance exposes a method with this name
    async fn supports(&self, method: &str) -> bool;

    /// Read an attribute; `Ok(None)` when the attribute does not exist
    async fn get_attr(&self, name: &str) -> Result<Option<Value>, BackendError>;

    /// Invoke a method by name
    async fn call(&self, method: &str, args: CallArgs) -> Result<Value, BackendError>;

    /// Point downloaded media (images, files, voice) at a directory
    async fn set_save_path(&self, path: &Path) -> Result<(), BackendError>;
}

/// Capability probe + construction of backend instances
#[async_trait]
pub trait BackendFactory: Send + Sync {
    /// Check whether a library can be loaded. Must not fail.
    async fn probe(&self, kind: BackendKind) -> ProbeReport;

    /// Construct a fresh instance of the library
    async fn construct(
        &self,
        kind: BackendKind,
        options: ConstructOptions,
    ) -> Result<Arc<dyn AutomationBackend>, BackendError>;
}
