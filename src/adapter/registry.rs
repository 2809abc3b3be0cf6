use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::backend::CallArgs;

/// Options a listen target was registered with
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenOptions {
    #[serde(default)]
    pub save_images: bool,
    #[serde(default)]
    pub save_video: bool,
    #[serde(default)]
    pub save_files: bool,
    #[serde(default)]
    pub save_voice: bool,
    #[serde(default)]
    pub parse_urls: bool,
    #[serde(default)]
    pub exact_match: bool,
}

impl ListenOptions {
    /// Read options from backend keyword arguments (`savepic`, `savevideo`, ...)
    pub fn from_args(args: &CallArgs) -> Self {
        let flag = |key: &str| args.get(key).map(truthy).unwrap_or(false);
        Self {
            save_images: flag("savepic"),
            save_video: flag("savevideo"),
            save_files: flag("savefile"),
            save_voice: flag("savevoice"),
            parse_urls: flag("parseurl"),
            exact_match: flag("exact"),
        }
    }

    /// Render as `AddListenChat` keyword arguments for `target`
    pub fn to_args(&self, target: &str) -> CallArgs {
        CallArgs::new()
            .kwarg("who", target)
            .kwarg("savepic", self.save_images)
            .kwarg("savevideo", self.save_video)
            .kwarg("savefile", self.save_files)
            .kwarg("savevoice", self.save_voice)
            .kwarg("parseurl", self.parse_urls)
            .kwarg("exact", self.exact_match)
    }
}

/// A chat registered for incremental message polling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenRegistration {
    pub target_id: String,
    #[serde(flatten)]
    pub options: ListenOptions,
}

/// Loose truthiness for flags arriving as JSON booleans, numbers or strings
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => matches!(s.trim().to_lowercase().as_str(), "1" | "true" | "yes"),
        _ => false,
    }
}

/// Listen targets known to the adapter, keyed by target id
///
/// Entries are never updated in place: re-registration removes the old entry
/// and inserts a fresh one.
#[derive(Debug, Default)]
pub struct ListenRegistry {
    entries: DashMap<String, ListenRegistration>,
}

impl ListenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, registration: ListenRegistration) {
        self.entries.remove(&registration.target_id);
        self.entries
            .insert(registration.target_id.clone(), registration);
    }

    pub fn remove(&self, target_id: &str) -> Option<ListenRegistration> {
        self.entries.remove(target_id).map(|(_, r)| r)
    }

    pub fn get(&self, target_id: &str) -> Option<ListenRegistration> {
        self.entries.get(target_id).map(|r| r.clone())
    }

    pub fn contains(&self, target_id: &str) -> bool {
        self.entries.contains_key(target_id)
    }

    /// Copy of the current registrations, sorted by target id
    pub fn snapshot(&self) -> Vec<ListenRegistration> {
        let mut all: Vec<_> = self.entries.iter().map(|r| r.value().clone()).collect();
        all.sort_by(|a, b| a.target_id.cmp(&b.target_id));
        all
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_options_from_args() {
        let args = CallArgs::new()
            .kwarg("who", "Alice")
            .kwarg("savepic", true)
            .kwarg("savevoice", "1")
            .kwarg("parseurl", 0);
        let options = ListenOptions::from_args(&args);
        assert!(options.save_images);
        assert!(options.save_voice);
        assert!(!options.parse_urls);
        assert!(!options.save_video);
    }

    #[test]
    fn test_to_args_names() {
        let options = ListenOptions {
            save_files: true,
            ..Default::default()
        };
        let args = options.to_args("Alice");
        assert_eq!(args.get("who"), Some(&json!("Alice")));
        assert_eq!(args.get("savefile"), Some(&json!(true)));
        assert_eq!(args.get("exact"), Some(&json!(false)));
    }

    #[test]
    fn test_registry_replaces_entry() {
        let registry = ListenRegistry::new();
        registry.insert(ListenRegistration {
            target_id: "Alice".to_string(),
            options: ListenOptions::default(),
        });
        registry.insert(ListenRegistration {
            target_id: "Alice".to_string(),
            options: ListenOptions {
                save_images: true,
                ..Default::default()
            },
        });

        assert_eq!(registry.len(), 1);
        assert!(registry.get("Alice").unwrap().options.save_images);
        assert!(registry.remove("Alice").is_some());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_snapshot_is_detached() {
        let registry = ListenRegistry::new();
        for name in ["Bob", "Alice"] {
            registry.insert(ListenRegistration {
                target_id: name.to_string(),
                options: ListenOptions::default(),
            });
        }

        let snapshot = registry.snapshot();
        registry.remove("Alice");

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].target_id, "Alice");
        assert_eq!(registry.len(), 1);
    }
}
