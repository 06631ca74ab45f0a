//! PostgREST-style settings table over HTTP.
//!
//! `GET {url}/{table}?select=key,value&key=in.(k1,k2)` answers with
//! `[{"key": ..., "value": ...}]`.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use super::{SettingsError, SettingsStore};
use crate::config::RestSettingsConfig;

#[derive(Debug, Deserialize)]
struct SettingRow {
    key: String,
    #[serde(default)]
    value: Option<serde_json::Value>,
}

pub struct RestSettingsStore {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl RestSettingsStore {
    pub fn new(config: &RestSettingsConfig, timeout: Duration) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| format!("failed to build settings HTTP client: {}", e))?;

        Ok(Self {
            client,
            endpoint: format!("{}/{}", config.url.trim_end_matches('/'), config.table),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl SettingsStore for RestSettingsStore {
    async fn get_many(&self, keys: &[&str]) -> Result<HashMap<String, String>, SettingsError> {
        let filter = format!("in.({})", keys.join(","));
        let mut request = self
            .client
            .get(&self.endpoint)
            .query(&[("select", "key,value"), ("key", filter.as_str())]);

        if let Some(api_key) = &self.api_key {
            request = request.header("apikey", api_key).bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SettingsError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SettingsError::Status(status.as_u16()));
        }

        let rows: Vec<SettingRow> = response
            .json()
            .await
            .map_err(|e| SettingsError::Decode(e.to_string()))?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let value = match row.value? {
                    serde_json::Value::Null => return None,
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                Some((row.key, value))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::Mutex;

    /// One-shot HTTP server; returns the base URL and the captured request head.
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, Arc<Mutex<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let captured = Arc::new(Mutex::new(String::new()));
        let sink = captured.clone();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = vec![0u8; 4096];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                *sink.lock().await = String::from_utf8_lossy(&buf[..n]).to_string();
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_line,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        (format!("http://{}", addr), captured)
    }

    fn config(url: &str) -> RestSettingsConfig {
        RestSettingsConfig {
            url: url.to_string(),
            api_key: Some("anon-key".to_string()),
            table: "site_settings".to_string(),
        }
    }

    #[tokio::test]
    async fn test_reads_rows() {
        let (url, captured) = serve_once(
            "200 OK",
            r#"[{"key":"watermark_text","value":"PARTS"},{"key":"watermark_opacity","value":55},{"key":"site_logo","value":null}]"#,
        )
        .await;
        let store = RestSettingsStore::new(&config(&url), Duration::from_secs(2)).unwrap();

        let values = store
            .get_many(&["watermark_text", "watermark_opacity", "site_logo"])
            .await
            .unwrap();

        assert_eq!(values["watermark_text"], "PARTS");
        assert_eq!(values["watermark_opacity"], "55");
        assert!(!values.contains_key("site_logo"));

        let head = captured.lock().await.clone();
        assert!(head.starts_with("GET /site_settings?select=key%2Cvalue&key=in."));
        assert!(head.to_lowercase().contains("apikey: anon-key"));
        assert!(head.contains("Bearer anon-key"));
    }

    #[tokio::test]
    async fn test_error_status() {
        let (url, _) = serve_once("500 Internal Server Error", "{}").await;
        let store = RestSettingsStore::new(&config(&url), Duration::from_secs(2)).unwrap();
        assert_eq!(
            store.get_many(&["watermark_text"]).await.unwrap_err(),
            SettingsError::Status(500)
        );
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let (url, _) = serve_once("200 OK", "not json").await;
        let store = RestSettingsStore::new(&config(&url), Duration::from_secs(2)).unwrap();
        assert!(matches!(
            store.get_many(&["watermark_text"]).await,
            Err(SettingsError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable() {
        let store =
            RestSettingsStore::new(&config("http://127.0.0.1:1"), Duration::from_secs(1)).unwrap();
        assert!(matches!(
            store.get_many(&["watermark_text"]).await,
            Err(SettingsError::Transport(_))
        ));
    }
}
