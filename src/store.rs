//! Key-value object persistence. Components that need remembered state get
//! an explicit store handle with typed access and default-value fallback,
//! never implicit process-wide settings.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

pub trait ObjectStore: Send + Sync {
    fn get_value(&self, key: &str) -> Option<Value>;
    fn set_value(&self, key: &str, value: Value);
    fn remove(&self, key: &str);
}

/// Typed access over raw store values.
pub trait ObjectStoreExt: ObjectStore {
    fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get_value(key)
            .and_then(|value| serde_json::from_value(value).ok())
    }

    fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    fn set<T: Serialize>(&self, key: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(value) => self.set_value(key, value),
            Err(error) => warn!(key, "value did not serialize: {error}"),
        }
    }
}

impl<S: ObjectStore + ?Sized> ObjectStoreExt for S {}

/// Non-persistent store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ObjectStore for MemoryStore {
    fn get_value(&self, key: &str) -> Option<Value> {
        self.values.lock().ok()?.get(key).cloned()
    }

    fn set_value(&self, key: &str, value: Value) {
        if let Ok(mut values) = self.values.lock() {
            values.insert(key.to_string(), value);
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut values) = self.values.lock() {
            values.remove(key);
        }
    }
}

/// Store backed by a single JSON document, written through on every set.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: Mutex<HashMap<String, Value>>,
}

impl JsonFileStore {
    /// A missing or unreadable file opens as an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = fs::read(&path)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .unwrap_or_default();
        Self {
            path,
            values: Mutex::new(values),
        }
    }

    fn persist(&self, values: &HashMap<String, Value>) {
        if let Some(parent) = self.path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        match serde_json::to_vec_pretty(values) {
            Ok(bytes) => {
                if let Err(error) = fs::write(&self.path, bytes) {
                    warn!(path = %self.path.display(), "store write failed: {error}");
                }
            }
            Err(error) => warn!("store did not serialize: {error}"),
        }
    }
}

impl ObjectStore for JsonFileStore {
    fn get_value(&self, key: &str) -> Option<Value> {
        self.values.lock().ok()?.get(key).cloned()
    }

    fn set_value(&self, key: &str, value: Value) {
        if let Ok(mut values) = self.values.lock() {
            values.insert(key.to_string(), value);
            self.persist(&values);
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut values) = self.values.lock() {
            values.remove(key);
            self.persist(&values);
        }
    }
}
