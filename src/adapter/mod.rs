//! WeChat adapter
//!
//! Normalizes the behavioural differences between `wxauto` and `wxautox`
//! behind one interface, initializes the library lazily, and recovers from
//! broken listen state.
//!
//! ## Architecture
//!
//! - `selector` - picks the library, falling back from `wxautox` to `wxauto`
//! - `handlers` - operation name -> shim table, with passthrough for the rest
//! - `session` - display name cache and connection checks (never fail)
//! - `recovery` - re-registers listen targets after transient UI errors
//! - `signatures` - error message classification table
//!
//! ## Example
//!
//! ```rust,ignore
//! use wechat_sidecar::adapter::{AdapterSettings, WeChatAdapter};
//! use wechat_sidecar::backend::{BackendKind, BridgeFactory};
//!
//! let factory = Arc::new(BridgeFactory::new("http://127.0.0.1:5100", false));
//! let adapter = WeChatAdapter::new(factory, AdapterSettings::new(BackendKind::Extended));
//!
//! adapter.send_message("文件传输助手", "hello", true, None).await?;
//! let messages = adapter.fetch_listen_messages(Some("Alice")).await;
//! ```

pub mod handlers;
pub mod moments;
pub mod recovery;
pub mod registry;
pub mod result;
pub mod selector;
pub mod session;
pub mod signatures;

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::Instrument;

use crate::backend::{
    AutomationBackend, BackendError, BackendFactory, BackendKind, CallArgs, ConstructOptions,
};
use crate::config::Config;

pub use handlers::Handler;
pub use moments::MomentPost;
pub use registry::{ListenOptions, ListenRegistration, ListenRegistry};
pub use result::{AdapterError, Neutral, OperationResult};

/// Chat opened after initialization and when polling finds no sessions
pub const DEFAULT_SELF_CHAT: &str = "文件传输助手";

/// Adapter settings taken from the service configuration
#[derive(Debug, Clone)]
pub struct AdapterSettings {
    pub requested: BackendKind,
    pub lazy_init: bool,
    pub self_chat: String,
    /// Where downloaded media goes; `None` leaves the library default
    pub temp_dir: Option<PathBuf>,
    pub recovery_settle: Duration,
    pub warmup_settle: Duration,
    /// Options used to re-register a target the registry has no record of
    pub listen_defaults: ListenOptions,
}

impl AdapterSettings {
    pub fn new(requested: BackendKind) -> Self {
        Self {
            requested,
            lazy_init: true,
            self_chat: DEFAULT_SELF_CHAT.to_string(),
            temp_dir: None,
            recovery_settle: Duration::from_millis(500),
            warmup_settle: Duration::from_secs(1),
            listen_defaults: ListenOptions::default(),
        }
    }
}

impl From<&Config> for AdapterSettings {
    fn from(config: &Config) -> Self {
        Self {
            requested: config.wechat_lib,
            lazy_init: config.lazy_init,
            self_chat: config.self_chat.clone(),
            temp_dir: Some(config.temp_dir.clone()),
            recovery_settle: config.recovery_settle,
            warmup_settle: config.warmup_settle,
            listen_defaults: config.listen_defaults.clone(),
        }
    }
}

/// The constructed library instance and which library it is
pub struct Session {
    pub kind: BackendKind,
    pub backend: Arc<dyn AutomationBackend>,
}

/// Group chat summary returned by [`WeChatAdapter::get_group_list`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub name: String,
    pub member_count: i64,
}

pub struct WeChatAdapter {
    factory: Arc<dyn BackendFactory>,
    settings: AdapterSettings,
    /// Fast-path flag, only set after `session` is populated
    initialized: AtomicBool,
    init_lock: Mutex<()>,
    session: OnceLock<Session>,
    display_name: RwLock<String>,
    listen: ListenRegistry,
    handlers: HashMap<&'static str, Handler>,
}

impl WeChatAdapter {
    pub fn new(factory: Arc<dyn BackendFactory>, settings: AdapterSettings) -> Self {
        tracing::info!(
            "Creating WeChat adapter, requested library: {}, lazy init: {}",
            settings.requested, settings.lazy_init
        );

        Self {
            factory,
            settings,
            initialized: AtomicBool::new(false),
            init_lock: Mutex::new(()),
            session: OnceLock::new(),
            display_name: RwLock::new(String::new()),
            listen: ListenRegistry::new(),
            handlers: handlers::table(),
        }
    }

    /// Create the adapter, initializing immediately unless lazy init is set
    pub async fn create(
        factory: Arc<dyn BackendFactory>,
        settings: AdapterSettings,
    ) -> Result<Self, AdapterError> {
        let adapter = Self::new(factory, settings);
        if adapter.settings.lazy_init {
            tracing::info!("Lazy init enabled, the library loads on first use");
        } else {
            adapter.ensure_initialized().await?;
        }
        Ok(adapter)
    }

    pub fn settings(&self) -> &AdapterSettings {
        &self.settings
    }

    pub fn requested_backend(&self) -> BackendKind {
        self.settings.requested
    }

    /// The library actually loaded, once initialized
    pub fn resolved_backend(&self) -> Option<BackendKind> {
        self.session.get().map(|s| s.kind)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn get_instance(&self) -> Option<Arc<dyn AutomationBackend>> {
        self.session.get().map(|s| Arc::clone(&s.backend))
    }

    pub fn listen_registry(&self) -> &ListenRegistry {
        &self.listen
    }

    pub(crate) fn session(&self) -> Option<&Session> {
        self.session.get()
    }

    fn require_session(&self) -> Result<&Session, AdapterError> {
        self.session.get().ok_or(AdapterError::NotInitialized)
    }

    /// Select and construct the library exactly once.
    ///
    /// Concurrent callers wait for the first one to finish; a failed attempt
    /// leaves the adapter uninitialized so a later call can try again.
    pub async fn ensure_initialized(&self) -> Result<(), AdapterError> {
        if self.initialized.load(Ordering::Acquire) {
            return Ok(());
        }

        let _guard = self.init_lock.lock().await;
        if self.initialized.load(Ordering::Acquire) {
            return Ok(());
        }

        let kind = selector::select_backend(self.factory.as_ref(), self.settings.requested).await?;
        let backend = self.construct(kind).await?;

        if self
            .session
            .set(Session {
                kind,
                backend: Arc::clone(&backend),
            })
            .is_err()
        {
            // Only reachable if the flag and the cell disagree
            tracing::warn!("WeChat session was already set, keeping the existing instance");
        }

        self.warm_up(backend.as_ref()).await;
        self.initialized.store(true, Ordering::Release);
        tracing::info!("WeChat adapter initialized using {}", kind);
        Ok(())
    }

    /// Construct the instance, retrying once with UTF-8 console output
    async fn construct(
        &self,
        kind: BackendKind,
    ) -> Result<Arc<dyn AutomationBackend>, AdapterError> {
        match self.factory.construct(kind, ConstructOptions::default()).await {
            Ok(backend) => {
                tracing::info!("Created {} WeChat instance", kind);
                Ok(backend)
            }
            Err(first) => {
                match &first {
                    BackendError::Encoding(detail) => {
                        tracing::warn!("Console encoding error while creating WeChat instance: {}", detail);
                    }
                    other => {
                        tracing::warn!("Creating {} WeChat instance failed: {}", kind, other);
                    }
                }
                tracing::info!("Retrying WeChat instance creation with UTF-8 output");

                let options = ConstructOptions { utf8_output: true };
                match self.factory.construct(kind, options).await {
                    Ok(backend) => {
                        tracing::info!("Created {} WeChat instance with UTF-8 output", kind);
                        Ok(backend)
                    }
                    Err(second) => {
                        tracing::error!("WeChat initialization failed: {}", second);
                        Err(AdapterError::FatalInit(format!(
                            "{} instance could not be created: {} (first attempt: {})",
                            kind, second, first
                        )))
                    }
                }
            }
        }
    }

    /// Cache the logged-in display name and open the self chat.
    /// Nothing here may fail initialization.
    async fn warm_up(&self, backend: &dyn AutomationBackend) {
        match session::initial_display_name(backend).await {
            Some(name) => {
                tracing::info!("WeChat logged in as {} ({})", name, backend.kind());
                self.remember_display_name(&name);
            }
            None => tracing::info!("WeChat initialized but the window name is unknown ({})", backend.kind()),
        }

        let target = &self.settings.self_chat;
        tracing::debug!("Opening {} chat window", target);
        match backend.call("ChatWith", CallArgs::new().arg(target.as_str())).await {
            Ok(_) => {
                tokio::time::sleep(self.settings.warmup_settle).await;
                tracing::info!("{} chat window opened", target);
            }
            Err(e) => tracing::error!("Failed to open {} chat window: {}", target, e),
        }
    }

    /// Run an operation by name: a registered shim if there is one,
    /// otherwise a plain call on the library instance.
    pub async fn dispatch(&self, operation: &str, args: CallArgs) -> OperationResult {
        if let Err(e) = self.ensure_initialized().await {
            return OperationResult::Fatal(e);
        }
        let session = match self.require_session() {
            Ok(s) => s,
            Err(e) => return OperationResult::Fatal(e),
        };

        let span = tracing::info_span!("dispatch", operation, backend = %session.kind);
        async move {
            match self.handlers.get(operation) {
                Some(&handler) => {
                    tracing::debug!("Using {:?} shim", handler);
                    self.run_handler(handler, session, args).await
                }
                None => {
                    tracing::debug!("Passing through to library");
                    match session.backend.call(operation, args).await {
                        Ok(v) => OperationResult::Success(v),
                        Err(e) => OperationResult::Fatal(AdapterError::Backend(e)),
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    /// All friends, as reported by the library
    pub async fn get_friend_list(&self) -> Result<Vec<Value>, AdapterError> {
        self.ensure_initialized().await?;
        let session = self.require_session()?;

        let value = session
            .backend
            .call("GetAllFriends", CallArgs::new())
            .await
            .map_err(|e| {
                tracing::error!("Failed to get friend list: {}", e);
                AdapterError::Backend(e)
            })?;

        match value {
            Value::Array(friends) => Ok(friends),
            Value::Null => Ok(Vec::new()),
            other => Err(AdapterError::Backend(BackendError::Protocol(format!(
                "GetAllFriends returned {}",
                json_type(&other)
            )))),
        }
    }

    /// All group chats with their member counts
    pub async fn get_group_list(&self) -> Result<Vec<GroupSummary>, AdapterError> {
        self.ensure_initialized().await?;
        let session = self.require_session()?;

        let value = session
            .backend
            .call("GetAllGroups", CallArgs::new())
            .await
            .map_err(|e| {
                tracing::error!("Failed to get group list: {}", e);
                AdapterError::Backend(e)
            })?;

        let groups = match value {
            Value::Array(groups) => groups,
            Value::Null => Vec::new(),
            other => {
                return Err(AdapterError::Backend(BackendError::Protocol(format!(
                    "GetAllGroups returned {}",
                    json_type(&other)
                ))))
            }
        };

        let summaries = groups
            .iter()
            .map(|group| {
                let name = group.get("name").and_then(Value::as_str);
                let count = group.get("member_count").and_then(Value::as_i64);
                match (name, count) {
                    (Some(name), Some(member_count)) => Ok(GroupSummary {
                        name: name.to_string(),
                        member_count,
                    }),
                    _ => Err(AdapterError::Backend(BackendError::Protocol(format!(
                        "malformed group entry: {}",
                        group
                    )))),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!("Found {} group chats", summaries.len());
        Ok(summaries)
    }
}

pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}
