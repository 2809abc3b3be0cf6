//! Scripted in-memory automation library for driving the adapter in tests.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use wechat_sidecar::adapter::{AdapterSettings, WeChatAdapter};
use wechat_sidecar::backend::{
    AutomationBackend, BackendError, BackendFactory, BackendKind, CallArgs, ConstructOptions,
    ProbeReport,
};

/// Methods every scripted instance exposes unless removed
pub const COMMON_METHODS: &[&str] = &[
    "ChatWith",
    "SendMsg",
    "SendFiles",
    "GetNextNewMessage",
    "GetSessionList",
    "AddListenChat",
    "GetListenMessage",
    "RemoveListenChat",
    "GetAllFriends",
    "GetAllGroups",
];

/// Name under which `set_save_path` shows up in the call log
pub const SET_SAVE_PATH: &str = "<set_save_path>";

/// Scripted outcome of one call
#[derive(Debug, Clone)]
pub enum Outcome {
    Ok(Value),
    Fail(String),
    Missing,
}

impl Outcome {
    fn into_result(self, method: &str) -> Result<Value, BackendError> {
        match self {
            Outcome::Ok(v) => Ok(v),
            Outcome::Fail(message) => Err(BackendError::call(method, message)),
            Outcome::Missing => Err(BackendError::MissingMethod(method.to_string())),
        }
    }
}

pub struct ScriptedBackend {
    kind: BackendKind,
    methods: Mutex<HashSet<String>>,
    attrs: Mutex<HashMap<String, Value>>,
    attr_failures: Mutex<HashMap<String, String>>,
    queued: Mutex<HashMap<String, VecDeque<Outcome>>>,
    defaults: Mutex<HashMap<String, Outcome>>,
    calls: Mutex<Vec<(String, CallArgs)>>,
    save_paths: Mutex<Vec<PathBuf>>,
}

impl ScriptedBackend {
    pub fn new(kind: BackendKind) -> Self {
        Self {
            kind,
            methods: Mutex::new(COMMON_METHODS.iter().map(|m| m.to_string()).collect()),
            attrs: Mutex::new(HashMap::new()),
            attr_failures: Mutex::new(HashMap::new()),
            queued: Mutex::new(HashMap::new()),
            defaults: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            save_paths: Mutex::new(Vec::new()),
        }
    }

    pub fn add_method(&self, method: &str) {
        self.methods.lock().unwrap().insert(method.to_string());
    }

    pub fn remove_method(&self, method: &str) {
        self.methods.lock().unwrap().remove(method);
    }

    pub fn set_attr(&self, name: &str, value: Value) {
        self.attrs.lock().unwrap().insert(name.to_string(), value);
    }

    /// Make every read of attribute `name` fail with `message`
    pub fn fail_attr(&self, name: &str, message: &str) {
        self.attr_failures
            .lock()
            .unwrap()
            .insert(name.to_string(), message.to_string());
    }

    pub fn clear_attrs(&self) {
        self.attrs.lock().unwrap().clear();
    }

    /// Outcome for the next call of `method` only
    pub fn queue(&self, method: &str, outcome: Outcome) {
        self.queued
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default()
            .push_back(outcome);
    }

    /// Outcome for every call of `method` once the queue is drained
    pub fn always(&self, method: &str, outcome: Outcome) {
        self.defaults
            .lock()
            .unwrap()
            .insert(method.to_string(), outcome);
    }

    pub fn calls(&self) -> Vec<(String, CallArgs)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, method: &str) -> Vec<CallArgs> {
        self.calls()
            .into_iter()
            .filter(|(m, _)| m == method)
            .map(|(_, args)| args)
            .collect()
    }

    pub fn method_sequence(&self) -> Vec<String> {
        self.calls().into_iter().map(|(m, _)| m).collect()
    }

    pub fn save_paths(&self) -> Vec<PathBuf> {
        self.save_paths.lock().unwrap().clone()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }
}

#[async_trait]
impl AutomationBackend for ScriptedBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn supports(&self, method: &str) -> bool {
        self.methods.lock().unwrap().contains(method)
    }

    async fn get_attr(&self, name: &str) -> Result<Option<Value>, BackendError> {
        if let Some(message) = self.attr_failures.lock().unwrap().get(name) {
            return Err(BackendError::call(name, message.clone()));
        }
        Ok(self.attrs.lock().unwrap().get(name).cloned())
    }

    async fn call(&self, method: &str, args: CallArgs) -> Result<Value, BackendError> {
        self.calls
            .lock()
            .unwrap()
            .push((method.to_string(), args));

        let root = method.split('.').next().unwrap_or(method);
        if !self.methods.lock().unwrap().contains(root) {
            return Err(BackendError::MissingMethod(method.to_string()));
        }

        let queued = self
            .queued
            .lock()
            .unwrap()
            .get_mut(method)
            .and_then(VecDeque::pop_front);
        let outcome = queued
            .or_else(|| self.defaults.lock().unwrap().get(method).cloned())
            .unwrap_or(Outcome::Ok(Value::Null));
        outcome.into_result(method)
    }

    async fn set_save_path(&self, path: &Path) -> Result<(), BackendError> {
        self.calls.lock().unwrap().push((
            SET_SAVE_PATH.to_string(),
            CallArgs::new().arg(path.to_string_lossy().into_owned()),
        ));
        self.save_paths.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}

pub struct ScriptedFactory {
    available: HashMap<BackendKind, bool>,
    backends: HashMap<BackendKind, Arc<ScriptedBackend>>,
    construct_delay: Duration,
    encoding_failures: AtomicUsize,
    constructs: AtomicUsize,
    probes: AtomicUsize,
    options_seen: Mutex<Vec<ConstructOptions>>,
}

impl ScriptedFactory {
    pub fn new(standard: bool, extended: bool) -> Self {
        Self {
            available: HashMap::from([
                (BackendKind::Standard, standard),
                (BackendKind::Extended, extended),
            ]),
            backends: HashMap::from([
                (
                    BackendKind::Standard,
                    Arc::new(ScriptedBackend::new(BackendKind::Standard)),
                ),
                (
                    BackendKind::Extended,
                    Arc::new(ScriptedBackend::new(BackendKind::Extended)),
                ),
            ]),
            construct_delay: Duration::ZERO,
            encoding_failures: AtomicUsize::new(0),
            constructs: AtomicUsize::new(0),
            probes: AtomicUsize::new(0),
            options_seen: Mutex::new(Vec::new()),
        }
    }

    pub fn with_construct_delay(mut self, delay: Duration) -> Self {
        self.construct_delay = delay;
        self
    }

    /// Fail the next `n` constructions unless UTF-8 output is requested
    pub fn with_encoding_failures(self, n: usize) -> Self {
        self.encoding_failures.store(n, Ordering::SeqCst);
        self
    }

    pub fn backend(&self, kind: BackendKind) -> Arc<ScriptedBackend> {
        Arc::clone(&self.backends[&kind])
    }

    pub fn construct_count(&self) -> usize {
        self.constructs.load(Ordering::SeqCst)
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn options_seen(&self) -> Vec<ConstructOptions> {
        self.options_seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl BackendFactory for ScriptedFactory {
    async fn probe(&self, kind: BackendKind) -> ProbeReport {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if self.available[&kind] {
            ProbeReport::available(format!("{} installed", kind))
        } else {
            ProbeReport::unavailable(format!("No module named '{}'", kind))
        }
    }

    async fn construct(
        &self,
        kind: BackendKind,
        options: ConstructOptions,
    ) -> Result<Arc<dyn AutomationBackend>, BackendError> {
        self.constructs.fetch_add(1, Ordering::SeqCst);
        self.options_seen.lock().unwrap().push(options);
        if !self.construct_delay.is_zero() {
            tokio::time::sleep(self.construct_delay).await;
        }

        if !options.utf8_output && self.encoding_failures.load(Ordering::SeqCst) > 0 {
            self.encoding_failures.fetch_sub(1, Ordering::SeqCst);
            return Err(BackendError::Encoding(
                "'gbk' codec can't encode character".to_string(),
            ));
        }

        let backend: Arc<dyn AutomationBackend> = self.backend(kind);
        Ok(backend)
    }
}

/// Settings with zero settle delays and no media directory
pub fn fast_settings(requested: BackendKind) -> AdapterSettings {
    let mut settings = AdapterSettings::new(requested);
    settings.recovery_settle = Duration::ZERO;
    settings.warmup_settle = Duration::ZERO;
    settings
}

pub fn adapter(factory: &Arc<ScriptedFactory>, requested: BackendKind) -> WeChatAdapter {
    let factory: Arc<dyn BackendFactory> = factory.clone();
    WeChatAdapter::new(factory, fast_settings(requested))
}
