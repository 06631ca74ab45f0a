// Configuration module

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::cache::RenderCacheConfig;

pub mod render;
pub mod server;
pub mod settings;
pub mod storage;

pub use render::RenderConfig;
pub use server::ServerConfig;
pub use settings::{RestSettingsConfig, SettingsBackendKind, SettingsConfig, StaticSettingsConfig};
pub use storage::{
    FilesystemStorageConfig, NamespacesConfig, S3StorageConfig, StorageBackendKind, StorageConfig,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub settings: SettingsConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub cache: RenderCacheConfig,
}

impl Config {
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, String> {
        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").map_err(|e| e.to_string())?;

        // First, check that all referenced environment variables exist
        for caps in re.captures_iter(yaml) {
            let var_name = &caps[1];
            std::env::var(var_name).map_err(|_| {
                format!(
                    "Environment variable '{}' is referenced but not set",
                    var_name
                )
            })?;
        }

        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        });

        serde_yaml::from_str(&substituted).map_err(|e| e.to_string())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_yaml_with_env(&yaml)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be greater than 0".to_string());
        }
        if self.server.max_concurrent_requests == 0 {
            return Err("server.max_concurrent_requests must be greater than 0".to_string());
        }

        // Namespaces must be distinct, otherwise renders would overwrite originals
        let namespaces = &self.storage.namespaces;
        let mut seen = HashSet::new();
        for (role, name) in [
            ("primary", &namespaces.primary),
            ("legacy", &namespaces.legacy),
            ("cache", &namespaces.cache),
        ] {
            if name.trim().is_empty() {
                return Err(format!("storage.namespaces.{} cannot be empty", role));
            }
            if !seen.insert(name.as_str()) {
                return Err(format!(
                    "storage.namespaces.{} '{}' duplicates another namespace",
                    role, name
                ));
            }
        }

        if self.storage.timeout_seconds == 0 {
            return Err("storage.timeout_seconds must be greater than 0".to_string());
        }

        match self.storage.backend {
            StorageBackendKind::S3 => {
                let s3 = self.storage.s3.as_ref().ok_or_else(|| {
                    "storage.s3 is required when storage.backend is 's3'".to_string()
                })?;
                if s3.region.is_empty() {
                    return Err("storage.s3.region cannot be empty".to_string());
                }
                if s3.access_key.is_empty() || s3.secret_key.is_empty() {
                    return Err("storage.s3 credentials cannot be empty".to_string());
                }
                if let Some(endpoint) = &s3.endpoint {
                    if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                        return Err(format!(
                            "storage.s3.endpoint '{}' must start with http:// or https://",
                            endpoint
                        ));
                    }
                }
            }
            StorageBackendKind::Filesystem => {
                if self.storage.filesystem.is_none() {
                    return Err(
                        "storage.filesystem is required when storage.backend is 'filesystem'"
                            .to_string(),
                    );
                }
            }
            StorageBackendKind::Memory => {}
        }

        if self.settings.backend == SettingsBackendKind::Rest {
            let rest = self.settings.rest.as_ref().ok_or_else(|| {
                "settings.rest is required when settings.backend is 'rest'".to_string()
            })?;
            if !rest.url.starts_with("http://") && !rest.url.starts_with("https://") {
                return Err(format!(
                    "settings.rest.url '{}' must start with http:// or https://",
                    rest.url
                ));
            }
        }

        if !(1..=100).contains(&self.render.jpeg_quality) {
            return Err(format!(
                "render.jpeg_quality must be between 1 and 100, got {}",
                self.render.jpeg_quality
            ));
        }

        if let Some(memory) = &self.cache.memory {
            if memory.max_size_mb == 0 {
                return Err("cache.memory.max_size_mb must be greater than 0".to_string());
            }
            if memory.ttl_seconds == Some(0) {
                return Err("cache.memory.ttl_seconds must be greater than 0".to_string());
            }
        }

        Ok(())
    }
}
