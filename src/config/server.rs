//! Server configuration types.
//!
//! Address and port bindings, worker threads and the concurrency limit.
//! Default values are sourced from `crate::constants`.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_MAX_CONCURRENT_REQUESTS, DEFAULT_THREADS};

// Requests served at once before answering 503
fn default_max_concurrent_requests() -> usize {
    DEFAULT_MAX_CONCURRENT_REQUESTS
}

// Pingora worker threads for the listener
fn default_threads() -> usize {
    DEFAULT_THREADS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
    /// Number of worker threads (default: 4)
    #[serde(default = "default_threads")]
    pub threads: usize,
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
}

impl ServerConfig {
    /// Socket address the listener binds to.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_defaults() {
        let yaml = r#"
address: "0.0.0.0"
port: 8080
"#;
        let config: ServerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.threads, DEFAULT_THREADS);
        assert_eq!(
            config.max_concurrent_requests,
            DEFAULT_MAX_CONCURRENT_REQUESTS
        );
        assert_eq!(config.listen_addr(), "0.0.0.0:8080");
    }
}
