//! Blob storage configuration.
//!
//! Selects the storage backend and names the three namespaces the proxy
//! reads from and writes to.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::{
    DEFAULT_CACHE_NAMESPACE, DEFAULT_LEGACY_NAMESPACE, DEFAULT_PRIMARY_NAMESPACE,
    DEFAULT_STORAGE_TIMEOUT_SECS,
};

fn default_storage_timeout() -> u64 {
    DEFAULT_STORAGE_TIMEOUT_SECS
}

/// Which blob store implementation backs the namespaces
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    S3,
    Filesystem,
    Memory,
}

/// Logical namespaces (buckets) used by the proxy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NamespacesConfig {
    /// Current originals
    #[serde(default = "default_primary")]
    pub primary: String,
    /// Originals from the previous storage layout
    #[serde(default = "default_legacy")]
    pub legacy: String,
    /// Rendered outputs
    #[serde(default = "default_cache")]
    pub cache: String,
}

fn default_primary() -> String {
    DEFAULT_PRIMARY_NAMESPACE.to_string()
}

fn default_legacy() -> String {
    DEFAULT_LEGACY_NAMESPACE.to_string()
}

fn default_cache() -> String {
    DEFAULT_CACHE_NAMESPACE.to_string()
}

impl Default for NamespacesConfig {
    fn default() -> Self {
        Self {
            primary: default_primary(),
            legacy: default_legacy(),
            cache: default_cache(),
        }
    }
}

/// S3-compatible object store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3StorageConfig {
    pub region: String,
    /// Custom endpoint (MinIO, Supabase storage S3 gateway, LocalStack)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    pub access_key: String,
    pub secret_key: String,
}

/// Local directory layout: `<root>/<namespace>/<key>`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesystemStorageConfig {
    pub root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackendKind,
    #[serde(default)]
    pub namespaces: NamespacesConfig,
    /// Timeout applied to every single storage call
    #[serde(default = "default_storage_timeout")]
    pub timeout_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3: Option<S3StorageConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filesystem: Option<FilesystemStorageConfig>,
}
