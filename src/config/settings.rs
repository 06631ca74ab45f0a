//! Settings store configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::constants::{DEFAULT_SETTINGS_TABLE, DEFAULT_SETTINGS_TIMEOUT_SECS, DEFAULT_SITE_NAME};

fn default_settings_timeout() -> u64 {
    DEFAULT_SETTINGS_TIMEOUT_SECS
}

fn default_table() -> String {
    DEFAULT_SETTINGS_TABLE.to_string()
}

fn default_site_name() -> String {
    DEFAULT_SITE_NAME.to_string()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SettingsBackendKind {
    /// PostgREST-style HTTP endpoint
    Rest,
    /// In-process map
    #[default]
    Static,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestSettingsConfig {
    /// Base URL, e.g. `https://project.supabase.co/rest/v1`
    pub url: String,
    /// Sent as `apikey` and bearer token when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_table")]
    pub table: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticSettingsConfig {
    #[serde(default)]
    pub values: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsConfig {
    #[serde(default)]
    pub backend: SettingsBackendKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rest: Option<RestSettingsConfig>,
    #[serde(default, rename = "static")]
    pub static_store: StaticSettingsConfig,
    #[serde(default = "default_settings_timeout")]
    pub timeout_seconds: u64,
    /// Watermark text used when `watermark_text` is not set
    #[serde(default = "default_site_name")]
    pub site_name: String,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            backend: SettingsBackendKind::default(),
            rest: None,
            static_store: StaticSettingsConfig::default(),
            timeout_seconds: default_settings_timeout(),
            site_name: default_site_name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rest_settings_default_table() {
        let yaml = r#"
backend: rest
rest:
  url: https://example.supabase.co/rest/v1
"#;
        let config: SettingsConfig = serde_yaml::from_str(yaml).unwrap();
        let rest = config.rest.unwrap();
        assert_eq!(rest.table, "site_settings");
        assert!(rest.api_key.is_none());
        assert_eq!(config.site_name, DEFAULT_SITE_NAME);
    }
}
