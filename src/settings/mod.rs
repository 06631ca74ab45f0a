//! Watermark settings.
//!
//! Settings are edited live by administrators, so the accessor reads the
//! store on every call and never caches values. A failing store yields the
//! defaults.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::num::IntErrorKind;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{SettingsBackendKind, SettingsConfig};
use crate::constants::{
    DEFAULT_WATERMARK_OPACITY_PERCENT, MAX_WATERMARK_OPACITY_PERCENT,
    MIN_WATERMARK_OPACITY_PERCENT,
};

pub mod rest;
pub mod static_store;

pub use rest::RestSettingsStore;
pub use static_store::StaticSettingsStore;

pub const KEY_ENABLED: &str = "watermark_enabled";
pub const KEY_MODE: &str = "watermark_mode";
pub const KEY_TEXT: &str = "watermark_text";
pub const KEY_OPACITY: &str = "watermark_opacity";
pub const KEY_LOGO: &str = "watermark_logo";
pub const KEY_SITE_LOGO: &str = "site_logo";
pub const KEY_COMPANY_LOGO: &str = "company_logo";

/// Every key the accessor reads, in one round trip.
pub const WATERMARK_KEYS: &[&str] = &[
    KEY_ENABLED,
    KEY_MODE,
    KEY_TEXT,
    KEY_OPACITY,
    KEY_LOGO,
    KEY_SITE_LOGO,
    KEY_COMPANY_LOGO,
];

/// Logo settings in precedence order
const LOGO_KEYS: &[&str] = &[KEY_LOGO, KEY_SITE_LOGO, KEY_COMPANY_LOGO];

/// Length of the hex fingerprint folded into cache keys
const FINGERPRINT_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("settings transport error: {0}")]
    Transport(String),

    #[error("settings store returned status {0}")]
    Status(u16),

    #[error("failed to decode settings response: {0}")]
    Decode(String),
}

/// Key/value store holding site settings.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Fetch the given keys. Keys without a value are simply absent.
    async fn get_many(&self, keys: &[&str]) -> Result<HashMap<String, String>, SettingsError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatermarkMode {
    /// Centered translucent text
    Text,
    /// Rotated logo tiled on a grid
    Logo,
}

impl WatermarkMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Logo => "logo",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" => Some(Self::Text),
            "logo" => Some(Self::Logo),
            _ => None,
        }
    }
}

/// Effective watermark settings for one render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatermarkConfig {
    pub enabled: bool,
    pub mode: WatermarkMode,
    pub text: String,
    pub logo: Option<String>,
    /// Always within [10, 100]
    pub opacity_percent: u8,
}

impl WatermarkConfig {
    /// Defaults used when the store has nothing (or is down).
    pub fn defaults(site_name: &str) -> Self {
        Self::from_values(&HashMap::new(), site_name)
    }

    /// Interpret raw settings values.
    pub fn from_values(values: &HashMap<String, String>, site_name: &str) -> Self {
        let non_empty = |key: &str| {
            values
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        // Anything other than the literal "false" keeps watermarking on
        let enabled = values
            .get(KEY_ENABLED)
            .map(|v| v.trim() != "false")
            .unwrap_or(true);

        let logo = LOGO_KEYS.iter().find_map(|key| non_empty(key));

        let mode = values
            .get(KEY_MODE)
            .and_then(|v| WatermarkMode::parse(v))
            .unwrap_or(if logo.is_some() {
                WatermarkMode::Logo
            } else {
                WatermarkMode::Text
            });

        let text = non_empty(KEY_TEXT).unwrap_or_else(|| site_name.to_string());

        let opacity_percent = values
            .get(KEY_OPACITY)
            .and_then(|v| parse_opacity(v))
            .unwrap_or(i64::from(DEFAULT_WATERMARK_OPACITY_PERCENT))
            .clamp(
                i64::from(MIN_WATERMARK_OPACITY_PERCENT),
                i64::from(MAX_WATERMARK_OPACITY_PERCENT),
            ) as u8;

        Self {
            enabled,
            mode,
            text,
            logo,
            opacity_percent,
        }
    }

    /// Short digest of everything that changes rendered pixels.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.mode.as_str().as_bytes());
        hasher.update([0]);
        hasher.update(self.text.as_bytes());
        hasher.update([0]);
        hasher.update(self.logo.as_deref().unwrap_or("").as_bytes());
        hasher.update([0]);
        hasher.update([self.opacity_percent]);
        let mut hex = hex::encode(hasher.finalize());
        hex.truncate(FINGERPRINT_LEN);
        hex
    }
}

/// Integer prefix of the value, like "55" from "55.7" or "40%".
/// Out-of-range digit strings saturate so the clamp still applies.
fn parse_opacity(value: &str) -> Option<i64> {
    let value = value.trim();
    let end = value
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
        .map(|(i, _)| i)
        .unwrap_or(value.len());
    match value[..end].parse::<i64>() {
        Ok(n) => Some(n),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => Some(i64::MAX),
            IntErrorKind::NegOverflow => Some(i64::MIN),
            _ => None,
        },
    }
}

/// Reads the current watermark configuration from a settings store.
pub struct SettingsAccessor {
    store: Arc<dyn SettingsStore>,
    site_name: String,
}

impl SettingsAccessor {
    pub fn new(store: Arc<dyn SettingsStore>, site_name: impl Into<String>) -> Self {
        Self {
            store,
            site_name: site_name.into(),
        }
    }

    pub async fn current_watermark_config(&self) -> WatermarkConfig {
        match self.store.get_many(WATERMARK_KEYS).await {
            Ok(values) => WatermarkConfig::from_values(&values, &self.site_name),
            Err(e) => {
                tracing::warn!(error = %e, "Settings store unavailable, using watermark defaults");
                WatermarkConfig::defaults(&self.site_name)
            }
        }
    }
}

/// Build the configured settings store.
pub fn build_settings_store(config: &SettingsConfig) -> Result<Arc<dyn SettingsStore>, String> {
    match config.backend {
        SettingsBackendKind::Rest => {
            let rest = config
                .rest
                .as_ref()
                .ok_or_else(|| "settings.rest section is missing".to_string())?;
            let store = RestSettingsStore::new(rest, Duration::from_secs(config.timeout_seconds))?;
            Ok(Arc::new(store))
        }
        SettingsBackendKind::Static => Ok(Arc::new(StaticSettingsStore::from_map(
            config.static_store.values.clone(),
        ))),
    }
}
