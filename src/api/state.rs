use std::sync::Arc;

use crate::adapter::WeChatAdapter;
use crate::config::Config;

/// Shared state handed to every handler
pub struct AppState {
    pub adapter: Arc<WeChatAdapter>,
    pub config: Config,
}

impl AppState {
    pub fn new(adapter: Arc<WeChatAdapter>, config: Config) -> Self {
        Self { adapter, config }
    }

    /// Whether a presented `X-API-Key` is accepted
    pub fn accepts_key(&self, key: Option<&str>) -> bool {
        if !self.config.auth_enabled() {
            return true;
        }
        match key {
            Some(key) => self.config.api_keys.iter().any(|k| k == key),
            None => false,
        }
    }
}
