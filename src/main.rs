use catalog_image_proxy::config::Config;
use catalog_image_proxy::server::ProxyServer;
use clap::Parser;
use pingora_core::server::configuration::Opt;
use std::path::PathBuf;

/// Catalog Image Proxy - image delivery and watermarking built with Cloudflare's Pingora
#[derive(Parser, Debug)]
#[command(name = "catalog-image-proxy")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Daemon mode
    #[arg(short = 'd', long)]
    daemon: bool,

    /// Test configuration and exit
    #[arg(long)]
    test: bool,

    /// Upgrade workers gracefully
    #[arg(long)]
    upgrade: bool,
}

fn main() {
    if let Err(e) = catalog_image_proxy::logging::init_subscriber() {
        eprintln!("Failed to initialize logging subsystem: {}", e);
        std::process::exit(1);
    }

    let args = Args::parse();

    let config = Config::from_file(&args.config).unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::process::exit(1);
    });

    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    tracing::info!(
        config_file = %args.config.display(),
        server_address = %config.server.address,
        server_port = config.server.port,
        storage_backend = ?config.storage.backend,
        settings_backend = ?config.settings.backend,
        memory_cache = config.cache.memory.is_some(),
        "Configuration loaded successfully"
    );

    if args.test {
        println!("Configuration file {} is valid", args.config.display());
        return;
    }

    let opt = Opt {
        daemon: args.daemon,
        upgrade: args.upgrade,
        ..Default::default()
    };

    if let Err(e) = ProxyServer::new(config, opt).run() {
        tracing::error!(error = %e, "Image proxy failed to start");
        std::process::exit(1);
    }
}
