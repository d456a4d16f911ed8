use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

pub const CONFIG_SLOT: &str = "api_config";
pub const INVENTORY_SLOT: &str = "inventory";
pub const SAVED_DESIGNS_SLOT: &str = "saved_designs";
pub const TENANT_SLOT: &str = "tenant_name";
pub const LANGUAGE_SLOT: &str = "language";

/// Single-file JSON store with one value per named slot. Flushes merge only
/// the slots this handle touched into whatever is on disk, so two handles
/// over the same file do not clobber each other's slots.
#[derive(Debug, Clone)]
pub struct KvStore {
    path: PathBuf,
    payload: Option<Map<String, Value>>,
    dirty_keys: Vec<String>,
    removed_keys: Vec<String>,
}

impl KvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            payload: None,
            dirty_keys: Vec::new(),
            removed_keys: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get<T: DeserializeOwned>(&mut self, slot: &str) -> Option<T> {
        let payload = self.ensure_loaded();
        payload
            .get(slot)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    pub fn set<T: Serialize>(&mut self, slot: &str, value: &T) -> anyhow::Result<()> {
        let snapshot = serde_json::to_value(value)?;
        let payload = self.ensure_loaded();
        if payload.get(slot) == Some(&snapshot) {
            return Ok(());
        }
        payload.insert(slot.to_string(), snapshot);
        if !self.dirty_keys.contains(&slot.to_string()) {
            self.dirty_keys.push(slot.to_string());
        }
        self.flush()
    }

    pub fn remove(&mut self, slot: &str) -> anyhow::Result<()> {
        let payload = self.ensure_loaded();
        if payload.remove(slot).is_none() {
            return Ok(());
        }
        self.dirty_keys.retain(|key| key != slot);
        if !self.removed_keys.contains(&slot.to_string()) {
            self.removed_keys.push(slot.to_string());
        }
        self.flush()
    }

    fn flush(&mut self) -> anyhow::Result<()> {
        if self.payload.is_none() || (self.dirty_keys.is_empty() && self.removed_keys.is_empty()) {
            return Ok(());
        }

        let mut on_disk = read_json_object(&self.path).unwrap_or_default();
        if let Some(payload) = &self.payload {
            for key in &self.dirty_keys {
                if let Some(value) = payload.get(key) {
                    on_disk.insert(key.clone(), value.clone());
                }
            }
        }
        for key in &self.removed_keys {
            on_disk.remove(key);
        }
        write_json_object(&self.path, &on_disk)?;
        self.payload = Some(on_disk);
        self.dirty_keys.clear();
        self.removed_keys.clear();
        Ok(())
    }

    fn ensure_loaded(&mut self) -> &mut Map<String, Value> {
        self.payload = Some(read_json_object(&self.path).unwrap_or_default());
        self.payload.as_mut().expect("store payload initialized")
    }
}

fn read_json_object(path: &Path) -> Option<Map<String, Value>> {
    let raw = std::fs::read_to_string(path).ok()?;
    let parsed: Value = serde_json::from_str(&raw).ok()?;
    parsed.as_object().cloned()
}

fn write_json_object(path: &Path, payload: &Map<String, Value>) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(
        path,
        serde_json::to_string_pretty(&Value::Object(payload.clone()))?,
    )?;
    Ok(())
}
