use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::adapter::{ListenOptions, DEFAULT_SELF_CHAT};
use crate::backend::bridge::DEFAULT_BRIDGE_URL;
use crate::backend::BackendKind;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub host: String,
    /// Requested automation library
    pub wechat_lib: BackendKind,
    pub lazy_init: bool,
    /// Accepted `X-API-Key` values; empty disables the check
    pub api_keys: Vec<String>,
    pub bridge_url: String,
    /// Packaged (frozen) deployment: probe libraries by direct import
    pub packaged: bool,
    pub temp_dir: PathBuf,
    pub self_chat: String,
    pub recovery_settle: Duration,
    pub warmup_settle: Duration,
    pub listen_defaults: ListenOptions,
}

fn parse_env<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => match raw.trim().parse() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!("Invalid value for {}: {:?}, using default", key, raw);
                default
            }
        },
        _ => default,
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => parse_bool(&raw).unwrap_or_else(|| {
            tracing::warn!("Invalid boolean for {}: {:?}, using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}

fn parse_api_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

/// Default media directory under the user's data dir
fn default_temp_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(env::temp_dir)
        .join("wechat-sidecar")
        .join("temp")
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let wechat_lib = match env::var("WECHAT_LIB") {
            Ok(raw) => raw.parse().unwrap_or_else(|e| {
                tracing::warn!("{}, using {}", e, defaults.wechat_lib);
                defaults.wechat_lib
            }),
            Err(_) => defaults.wechat_lib,
        };

        Self {
            port: parse_env("PORT", defaults.port),
            host: env::var("HOST").unwrap_or(defaults.host),
            wechat_lib,
            lazy_init: env_bool("WECHAT_LAZY_INIT", defaults.lazy_init),
            api_keys: env::var("API_KEYS")
                .map(|raw| parse_api_keys(&raw))
                .unwrap_or_default(),
            bridge_url: env::var("WECHAT_BRIDGE_URL").unwrap_or(defaults.bridge_url),
            packaged: env_bool("WECHAT_PACKAGED", defaults.packaged),
            temp_dir: env::var("WECHAT_TEMP_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.temp_dir),
            self_chat: env::var("WECHAT_SELF_CHAT").unwrap_or(defaults.self_chat),
            recovery_settle: Duration::from_millis(parse_env("WECHAT_RECOVERY_SETTLE_MS", 500)),
            warmup_settle: Duration::from_millis(parse_env("WECHAT_WARMUP_SETTLE_MS", 1000)),
            listen_defaults: ListenOptions {
                save_images: env_bool("WECHAT_LISTEN_SAVE_PIC", false),
                save_video: env_bool("WECHAT_LISTEN_SAVE_VIDEO", false),
                save_files: env_bool("WECHAT_LISTEN_SAVE_FILE", false),
                save_voice: env_bool("WECHAT_LISTEN_SAVE_VOICE", false),
                parse_urls: env_bool("WECHAT_LISTEN_PARSE_URL", false),
                exact_match: false,
            },
        }
    }

    pub fn auth_enabled(&self) -> bool {
        !self.api_keys.is_empty()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5000,
            host: "0.0.0.0".to_string(),
            wechat_lib: BackendKind::Standard,
            lazy_init: true,
            api_keys: Vec::new(),
            bridge_url: DEFAULT_BRIDGE_URL.to_string(),
            packaged: false,
            temp_dir: default_temp_dir(),
            self_chat: DEFAULT_SELF_CHAT.to_string(),
            recovery_settle: Duration::from_millis(500),
            warmup_settle: Duration::from_secs(1),
            listen_defaults: ListenOptions::default(),
        }
    }
}
