//! Display name cache and connection checks.
//!
//! These are polled by the status endpoint on a fixed cadence while the
//! WeChat UI may be mid-redraw, so nothing in here returns an error.

use serde_json::Value;

use super::signatures;
use super::{Session, WeChatAdapter};
use crate::backend::{AutomationBackend, BackendError, CallArgs};

/// Returned when an instance exists but no probe produced a name
pub const DEFAULT_DISPLAY_NAME: &str = "微信";

/// Where a display name can be read from
#[derive(Debug, Clone, Copy)]
pub enum NameSource {
    /// Attribute holding the name
    Attribute(&'static str),
    /// Getter method returning the name
    Getter(&'static str),
    /// Method returning a mapping; the first non-empty listed field wins
    InfoLookup(&'static str, &'static [&'static str]),
}

#[derive(Debug, Clone, Copy)]
pub struct NameProbe {
    pub source: NameSource,
    pub extended_only: bool,
}

const fn probe(source: NameSource) -> NameProbe {
    NameProbe {
        source,
        extended_only: false,
    }
}

/// Display name probes, tried in order until one yields a non-empty name
pub const DISPLAY_NAME_PROBES: &[NameProbe] = &[
    probe(NameSource::Attribute("window_name")),
    probe(NameSource::Getter("GetWindowName")),
    probe(NameSource::Attribute("nickname")),
    probe(NameSource::InfoLookup("ChatInfo", &["nickname", "name", "title"])),
    NameProbe {
        source: NameSource::InfoLookup("GetMyInfo", &["nickname", "name"]),
        extended_only: true,
    },
];

/// Probes safe to run while the control tree is unstable (attributes only)
const SAFE_PROBES: &[NameProbe] = &[
    probe(NameSource::Attribute("window_name")),
    probe(NameSource::Attribute("nickname")),
];

fn non_empty_str(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl NameProbe {
    pub fn applies_to(&self, backend: &dyn AutomationBackend) -> bool {
        !self.extended_only || backend.kind().is_extended()
    }

    /// Run the probe. `Ok(None)` means the capability is missing or empty.
    pub async fn extract(
        &self,
        backend: &dyn AutomationBackend,
    ) -> Result<Option<String>, BackendError> {
        match self.source {
            NameSource::Attribute(name) => {
                Ok(backend.get_attr(name).await?.as_ref().and_then(non_empty_str))
            }
            NameSource::Getter(method) => {
                if !backend.supports(method).await {
                    return Ok(None);
                }
                let value = backend.call(method, CallArgs::new()).await?;
                Ok(non_empty_str(&value))
            }
            NameSource::InfoLookup(method, fields) => {
                if !backend.supports(method).await {
                    return Ok(None);
                }
                let info = backend.call(method, CallArgs::new()).await?;
                Ok(fields
                    .iter()
                    .filter_map(|field| info.get(*field))
                    .find_map(non_empty_str))
            }
        }
    }

    fn label(&self) -> &'static str {
        match self.source {
            NameSource::Attribute(name) => name,
            NameSource::Getter(name) => name,
            NameSource::InfoLookup(name, _) => name,
        }
    }
}

/// Name read right after construction: attribute first, then the getter
pub(super) async fn initial_display_name(backend: &dyn AutomationBackend) -> Option<String> {
    for probe in &DISPLAY_NAME_PROBES[..2] {
        match probe.extract(backend).await {
            Ok(Some(name)) => return Some(name),
            Ok(None) => {}
            Err(e) => tracing::debug!("Reading display name via {} failed: {}", probe.label(), e),
        }
    }
    None
}

impl WeChatAdapter {
    /// Last non-empty display name seen, or an empty string
    pub fn cached_display_name(&self) -> String {
        match self.display_name.read() {
            Ok(name) => name.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Store a display name; empty names never replace a cached one
    pub(super) fn remember_display_name(&self, name: &str) {
        if name.is_empty() {
            return;
        }
        let mut cached = match self.display_name.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if *cached != name {
            *cached = name.to_string();
        }
    }

    fn cached_or_default(&self) -> String {
        let cached = self.cached_display_name();
        if cached.is_empty() {
            DEFAULT_DISPLAY_NAME.to_string()
        } else {
            cached
        }
    }

    /// Best available display name of the logged-in account. Never fails.
    pub async fn get_display_name(&self) -> String {
        let Some(session) = self.session() else {
            return self.cached_display_name();
        };
        let backend = session.backend.as_ref();

        for probe in DISPLAY_NAME_PROBES.iter().filter(|p| p.applies_to(backend)) {
            match probe.extract(backend).await {
                Ok(Some(name)) => {
                    tracing::debug!("Display name from {}: {}", probe.label(), name);
                    self.remember_display_name(&name);
                    return name;
                }
                Ok(None) => {}
                Err(e) => tracing::debug!("Display name probe {} failed: {}", probe.label(), e),
            }
        }

        tracing::debug!("No display name probe succeeded, using cache");
        self.cached_or_default()
    }

    /// Display name without touching the control tree: cache, then attributes.
    /// Fails only on control access errors.
    async fn safe_display_name(&self, session: &Session) -> Result<String, BackendError> {
        let cached = self.cached_display_name();
        if !cached.is_empty() {
            return Ok(cached);
        }

        for probe in SAFE_PROBES {
            match probe.extract(session.backend.as_ref()).await {
                Ok(Some(name)) => {
                    self.remember_display_name(&name);
                    return Ok(name);
                }
                Ok(None) => {}
                Err(e) if signatures::is_control_access(&e.to_string()) => return Err(e),
                Err(e) => tracing::debug!("Safe display name probe {} failed: {}", probe.label(), e),
            }
        }

        Ok(self.cached_or_default())
    }

    /// Whether WeChat looks logged in and reachable. Never fails.
    ///
    /// A failing session list still counts as connected: a freshly logged-in
    /// account may have no sessions yet. This is lenient and can report a
    /// crashed library as healthy.
    pub async fn check_connection(&self) -> bool {
        let Some(session) = self.session() else {
            tracing::debug!("WeChat instance not initialized");
            return false;
        };

        let name = match self.safe_display_name(session).await {
            Ok(name) => name,
            Err(e) => {
                tracing::debug!("Control access error while reading window name: {}", e);
                return false;
            }
        };

        if name.is_empty() {
            tracing::debug!("No WeChat window name, probably not logged in");
            return false;
        }

        if !session.backend.supports("GetSessionList").await {
            tracing::debug!("Connection ok ({}), session list not available", name);
            return true;
        }

        match session
            .backend
            .call("GetSessionList", CallArgs::new())
            .await
        {
            Ok(sessions) => {
                let count = match &sessions {
                    Value::Array(a) => a.len(),
                    Value::Object(o) => o.len(),
                    _ => 0,
                };
                tracing::debug!("Connection ok ({}), {} sessions", name, count);
            }
            Err(e) => {
                let message = e.to_string();
                if signatures::is_control_access(&message) {
                    tracing::debug!("Control access error on session list, skipping: {}", message);
                } else {
                    tracing::debug!("Session list failed: {}", message);
                }
            }
        }
        true
    }
}
