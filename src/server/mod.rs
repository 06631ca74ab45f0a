// Server module - Pingora HTTP server setup

use pingora_core::server::configuration::Opt as ServerOpt;
use pingora_core::server::Server;

use crate::config::Config;
use crate::error::ProxyError;
use crate::proxy::ImageProxy;

/// Pingora server wrapper for the image proxy
pub struct ProxyServer {
    config: Config,
    server_opt: ServerOpt,
}

impl ProxyServer {
    pub fn new(config: Config, server_opt: ServerOpt) -> Self {
        Self { config, server_opt }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn server_opt(&self) -> &ServerOpt {
        &self.server_opt
    }

    pub fn listen_addr(&self) -> String {
        self.config.server.listen_addr()
    }

    /// Build the service and block serving requests until shutdown.
    pub fn run(self) -> Result<(), ProxyError> {
        let listen_addr = self.listen_addr();
        let threads = self.config.server.threads;

        let mut server = Server::new(Some(self.server_opt))
            .map_err(|e| ProxyError::Internal(format!("failed to create server: {}", e)))?;
        server.bootstrap();

        let proxy = ImageProxy::new(&self.config)?;
        let mut proxy_service = pingora_proxy::http_proxy_service(&server.configuration, proxy);
        proxy_service.add_tcp(&listen_addr);
        proxy_service.threads = Some(threads);

        tracing::info!(
            address = %listen_addr,
            threads,
            storage_backend = ?self.config.storage.backend,
            "Starting image proxy"
        );

        server.add_service(proxy_service);
        server.run_forever()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listen_addr_from_config() {
        let config = Config::from_yaml_with_env(
            r#"
server:
  address: "0.0.0.0"
  port: 3001
storage:
  backend: memory
"#,
        )
        .unwrap();
        let server = ProxyServer::new(config, ServerOpt::default());

        assert_eq!(server.listen_addr(), "0.0.0.0:3001");
        assert!(!server.server_opt().daemon);
        assert_eq!(server.config().server.port, 3001);
    }
}
