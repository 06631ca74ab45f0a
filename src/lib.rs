// Catalog Image Proxy Library

pub mod cache;
pub mod config;
pub mod constants;
pub mod delivery;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod proxy;
pub mod resolver;
pub mod server;
pub mod settings;
pub mod storage;
pub mod watermark;
