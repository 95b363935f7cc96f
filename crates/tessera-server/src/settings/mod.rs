use std::env;
use std::net::{IpAddr, SocketAddr};

use tracing::warn;

use crate::config::ServerConfig;
use crate::http::routes::is_api_path;

mod env_config;
#[cfg(test)]
mod tests;

pub const CONFIG_PATH_ENV: &str = "TESSERA_CONFIG_PATH";

#[derive(Debug, Clone)]
pub struct Settings {
    pub addr: SocketAddr,
    pub config: ServerConfig,
}

impl Settings {
    /// Loads `config.yaml` (or `TESSERA_CONFIG_PATH`), then applies
    /// `TESSERA_*` overrides. Rejected values are logged and skipped.
    #[must_use]
    pub fn from_env() -> Self {
        let config_path = env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "config.yaml".to_string());
        let mut config = env_config::load_config(&config_path);
        env_config::apply_env_overrides(&mut config);
        Self::from_config(config)
    }

    #[must_use]
    pub fn from_config(config: ServerConfig) -> Self {
        let addr = resolve_addr(&config);
        Self { addr, config }
    }
}

fn resolve_addr(config: &ServerConfig) -> SocketAddr {
    if let Ok(value) = env::var("TESSERA_ADDR") {
        match value.parse() {
            Ok(addr) => return addr,
            Err(_) => warn!(event = "config_invalid", field = "TESSERA_ADDR", value = %value),
        }
    }
    let port = config.server.port;
    let ip = config.server.host.parse::<IpAddr>().unwrap_or_else(|_| {
        warn!(event = "config_invalid", field = "server.host", value = %config.server.host);
        IpAddr::from([0, 0, 0, 0])
    });
    SocketAddr::new(ip, port)
}

/// Checks the settings a running server depends on and returns every
/// problem found, not just the first.
pub fn preflight(settings: &Settings) -> Result<(), Vec<String>> {
    let store = &settings.config.store;
    let mut problems = Vec::new();

    for (field, value) in [
        ("store.uri or TESSERA_MONGO_URI", &store.uri),
        ("store.database or TESSERA_MONGO_DATABASE", &store.database),
        ("store.collection or TESSERA_MONGO_COLLECTION", &store.collection),
    ] {
        if value.trim().is_empty() {
            problems.push(format!("{field} is required"));
        }
    }
    for (field, value) in [
        ("store.connect_timeout_ms", store.connect_timeout_ms),
        ("store.ping_timeout_ms", store.ping_timeout_ms),
        ("store.operation_timeout_ms", store.operation_timeout_ms),
        ("store.shutdown_timeout_ms", store.shutdown_timeout_ms),
    ] {
        if value == 0 {
            problems.push(format!("{field} must be greater than zero"));
        }
    }
    if store.ping_timeout_ms > store.connect_timeout_ms {
        problems.push("store.ping_timeout_ms must not exceed store.connect_timeout_ms".to_string());
    }

    let metrics = &settings.config.metrics;
    if metrics.enabled {
        if !metrics.endpoint.starts_with('/') {
            problems.push("metrics.endpoint must start with '/'".to_string());
        } else if is_api_path(&metrics.endpoint) {
            problems.push(format!(
                "metrics.endpoint {} collides with an API route",
                metrics.endpoint
            ));
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(problems)
    }
}
