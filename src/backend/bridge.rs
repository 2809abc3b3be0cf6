//! HTTP client for the automation bridge.
//!
//! The bridge is a small helper process that hosts `wxauto` / `wxautox` and
//! exposes instance construction, attribute reads and method calls as JSON
//! endpoints. One `BridgeBackend` maps to one library instance on the bridge.

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use super::{
    AutomationBackend, BackendError, BackendFactory, BackendKind, CallArgs, ConstructOptions,
    ProbeReport,
};

/// Default address of the automation bridge
pub const DEFAULT_BRIDGE_URL: &str = "http://127.0.0.1:5100";

const CONNECT_TIMEOUT_SECS: u64 = 5;

/// Generous upper bound; the library's own UI timeouts normally fire first
const REQUEST_TIMEOUT_SECS: u64 = 120;

const PROBE_TIMEOUT_SECS: u64 = 10;

/// Response envelope from the bridge HTTP API
#[derive(Debug, Deserialize)]
struct BridgeResponse<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
    /// Error class reported by the bridge (`"encoding"` for console codec errors)
    error_kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InstanceInfo {
    instance_id: String,
    #[serde(default)]
    methods: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct AttrValue {
    exists: bool,
    #[serde(default)]
    value: Value,
}

#[derive(Debug, Serialize)]
struct CallRequest<'a> {
    instance_id: &'a str,
    method: &'a str,
    args: &'a [Value],
    kwargs: &'a serde_json::Map<String, Value>,
}

fn build_client() -> Client {
    Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to build HTTP client with timeouts, using default");
            Client::default()
        })
}

/// Unwrap a bridge envelope into its payload, mapping failures to `BackendError`
async fn read_envelope<T: DeserializeOwned>(
    method: &str,
    response: reqwest::Response,
) -> Result<Option<T>, BackendError> {
    let status = response.status();
    let body = response.text().await?;

    let envelope: BridgeResponse<T> = serde_json::from_str(&body).map_err(|e| {
        BackendError::Protocol(format!(
            "unexpected response from bridge ({}) for {}: {}",
            status, method, e
        ))
    })?;

    if envelope.success {
        return Ok(envelope.data);
    }

    let message = envelope
        .error
        .unwrap_or_else(|| format!("bridge returned status {}", status));

    match envelope.error_kind.as_deref() {
        Some("encoding") => Err(BackendError::Encoding(message)),
        Some("missing_method") => Err(BackendError::MissingMethod(method.to_string())),
        _ => Err(BackendError::call(method, message)),
    }
}

/// Constructs and probes library instances hosted by the bridge
pub struct BridgeFactory {
    client: Client,
    base_url: String,
    packaged: bool,
}

impl BridgeFactory {
    /// `packaged` selects the direct-import probe used by frozen deployments;
    /// otherwise the bridge's library detector is consulted.
    pub fn new(base_url: impl Into<String>, packaged: bool) -> Self {
        Self {
            client: build_client(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            packaged,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn probe_mode(&self) -> &'static str {
        if self.packaged {
            "direct"
        } else {
            "detector"
        }
    }
}

#[async_trait]
impl BackendFactory for BridgeFactory {
    async fn probe(&self, kind: BackendKind) -> ProbeReport {
        let url = format!("{}/probe", self.base_url);
        let mode = self.probe_mode();

        let response = match self
            .client
            .get(&url)
            .query(&[("lib", kind.lib_name()), ("mode", mode)])
            .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                return ProbeReport::unavailable(format!("bridge unreachable at {}: {}", url, e))
            }
        };

        match read_envelope::<ProbeReport>("probe", response).await {
            Ok(Some(report)) => report,
            Ok(None) => ProbeReport::unavailable(format!("{} probe returned no data", kind)),
            Err(e) => ProbeReport::unavailable(format!("{} probe ({}) failed: {}", kind, mode, e)),
        }
    }

    async fn construct(
        &self,
        kind: BackendKind,
        options: ConstructOptions,
    ) -> Result<Arc<dyn AutomationBackend>, BackendError> {
        let url = format!("{}/instances", self.base_url);
        let body = json!({
            "lib": kind.lib_name(),
            "utf8_output": options.utf8_output,
        });

        let response = self.client.post(&url).json(&body).send().await?;
        let info: InstanceInfo = read_envelope("WeChat", response)
            .await?
            .ok_or_else(|| BackendError::Protocol("bridge returned no instance".to_string()))?;

        tracing::debug!(
            lib = %kind,
            instance_id = %info.instance_id,
            methods = info.methods.len(),
            "bridge instance constructed"
        );

        Ok(Arc::new(BridgeBackend {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            kind,
            instance_id: info.instance_id,
            methods: info.methods.into_iter().collect(),
        }))
    }
}

/// One library instance living in the bridge process
pub struct BridgeBackend {
    client: Client,
    base_url: String,
    kind: BackendKind,
    instance_id: String,
    methods: HashSet<String>,
}

impl BridgeBackend {
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }
}

#[async_trait]
impl AutomationBackend for BridgeBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn supports(&self, method: &str) -> bool {
        // Dotted paths address sub-objects (e.g. `Moments.Like`); the bridge
        // only reports top-level methods
        let root = method.split('.').next().unwrap_or(method);
        self.methods.contains(root)
    }

    async fn get_attr(&self, name: &str) -> Result<Option<Value>, BackendError> {
        let url = format!("{}/attr", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("instance_id", self.instance_id.as_str()), ("name", name)])
            .send()
            .await?;

        let attr: Option<AttrValue> = read_envelope(name, response).await?;
        Ok(attr.filter(|a| a.exists).map(|a| a.value))
    }

    async fn call(&self, method: &str, args: CallArgs) -> Result<Value, BackendError> {
        let url = format!("{}/call", self.base_url);
        let request = CallRequest {
            instance_id: &self.instance_id,
            method,
            args: &args.positional,
            kwargs: &args.keyword,
        };

        let response = self.client.post(&url).json(&request).send().await?;
        let data: Option<Value> = read_envelope(method, response).await?;
        Ok(data.unwrap_or(Value::Null))
    }

    async fn set_save_path(&self, path: &Path) -> Result<(), BackendError> {
        let url = format!("{}/save-path", self.base_url);
        let body = json!({
            "instance_id": self.instance_id,
            "path": path.to_string_lossy(),
        });

        let response = self.client.post(&url).json(&body).send().await?;
        read_envelope::<Value>("save_path", response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_deserialization() {
        let body = r#"{"success":false,"data":null,"error":"'gbk' codec can't encode","error_kind":"encoding"}"#;
        let envelope: BridgeResponse<Value> = serde_json::from_str(body).unwrap();
        assert!(!envelope.success);
        assert_eq!(envelope.error_kind.as_deref(), Some("encoding"));
    }

    #[test]
    fn test_probe_mode_follows_deployment() {
        assert_eq!(BridgeFactory::new(DEFAULT_BRIDGE_URL, true).probe_mode(), "direct");
        assert_eq!(BridgeFactory::new(DEFAULT_BRIDGE_URL, false).probe_mode(), "detector");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let factory = BridgeFactory::new("http://127.0.0.1:5100/", false);
        assert_eq!(factory.base_url(), "http://127.0.0.1:5100");
    }

    #[test]
    fn test_call_request_serialization() {
        let args = CallArgs::new().arg("Alice").kwarg("clear", "1");
        let request = CallRequest {
            instance_id: "abc",
            method: "SendMsg",
            args: &args.positional,
            kwargs: &args.keyword,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"method\":\"SendMsg\""));
        assert!(json.contains("\"kwargs\":{\"clear\":\"1\"}"));
    }
}
