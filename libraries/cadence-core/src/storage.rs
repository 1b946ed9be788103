//! Flat key-value persistence
//!
//! Values are JSON (`serde_json::Value`) so a store never needs to know the
//! shape of what it holds. The engine persists only a handful of scalars and
//! one ID list.

use crate::error::{CoreError, Result};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Save/load contract for persisted playback state
pub trait KeyValueStore: Send {
    /// Load the value stored under `key`
    ///
    /// Returns `Ok(None)` if nothing was ever saved there.
    fn load(&self, key: &str) -> Result<Option<Value>>;

    /// Save `value` under `key`, replacing any previous value
    fn save(&mut self, key: &str, value: Value) -> Result<()>;

    /// Remove the value under `key` (no-op if absent)
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// Ephemeral in-process store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, Value>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing is stored
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.get(key).cloned())
    }

    fn save(&mut self, key: &str, value: Value) -> Result<()> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }
}

/// Store backed by a single JSON object on disk
///
/// The whole object is rewritten on every save (via a sibling temp file and a
/// rename). A missing file is an empty store; an unreadable or corrupt file is
/// also treated as empty, with a warning, since persisted playback state is
/// only a convenience.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: BTreeMap<String, Value>,
}

impl JsonFileStore {
    /// Open (or lazily create) the store at `path`
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match Self::read_values(&path) {
            Ok(values) => values,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable state file");
                BTreeMap::new()
            }
        };

        Self { path, values }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_values(path: &Path) -> Result<BTreeMap<String, Value>> {
        if !path.exists() {
            debug!(path = %path.display(), "No state file yet");
            return Ok(BTreeMap::new());
        }

        let bytes = fs::read(path)?;
        match serde_json::from_slice::<Value>(&bytes)? {
            Value::Object(map) => Ok(map.into_iter().collect()),
            other => Err(CoreError::storage(format!(
                "expected a JSON object, found {}",
                json_kind(&other)
            ))),
        }
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&self.values)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn load(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.get(key).cloned())
    }

    fn save(&mut self, key: &str, value: Value) -> Result<()> {
        self.values.insert(key.to_string(), value);
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if self.values.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
