//! In-process settings map, mutable at runtime.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use super::{SettingsError, SettingsStore};

#[derive(Default)]
pub struct StaticSettingsStore {
    values: RwLock<HashMap<String, String>>,
}

impl StaticSettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(values: HashMap<String, String>) -> Self {
        Self {
            values: RwLock::new(values),
        }
    }

    pub fn set(&self, key: &str, value: &str) {
        self.values
            .write()
            .insert(key.to_string(), value.to_string());
    }

    pub fn remove(&self, key: &str) {
        self.values.write().remove(key);
    }
}

#[async_trait]
impl SettingsStore for StaticSettingsStore {
    async fn get_many(&self, keys: &[&str]) -> Result<HashMap<String, String>, SettingsError> {
        let values = self.values.read();
        Ok(keys
            .iter()
            .filter_map(|key| values.get(*key).map(|v| (key.to_string(), v.clone())))
            .collect())
    }
}
