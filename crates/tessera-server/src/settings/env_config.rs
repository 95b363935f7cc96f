use std::env;
use std::fs;
use std::io::ErrorKind;
use std::str::FromStr;

use tracing::warn;

use crate::config::ServerConfig;

/// Reads the YAML file at `path`. A missing file means "all defaults"; an
/// unreadable or malformed one is reported and also falls back to defaults.
pub(super) fn load_config(path: &str) -> ServerConfig {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return ServerConfig::default(),
        Err(err) => {
            warn!(event = "config_read_failed", path, error = %err);
            return ServerConfig::default();
        }
    };
    serde_yaml::from_str(&contents).unwrap_or_else(|err| {
        warn!(event = "config_parse_failed", path, error = %err);
        ServerConfig::default()
    })
}

pub(super) fn apply_env_overrides(config: &mut ServerConfig) {
    let server = &mut config.server;
    override_text("TESSERA_HOST", &mut server.host);
    override_parsed("TESSERA_PORT", &mut server.port);
    override_parsed("TESSERA_MAX_BODY_BYTES", &mut server.max_body_bytes);

    let store = &mut config.store;
    override_text("TESSERA_MONGO_URI", &mut store.uri);
    override_text("TESSERA_MONGO_DATABASE", &mut store.database);
    override_text("TESSERA_MONGO_COLLECTION", &mut store.collection);
    override_parsed("TESSERA_MONGO_CONNECT_TIMEOUT_MS", &mut store.connect_timeout_ms);
    override_parsed("TESSERA_MONGO_PING_TIMEOUT_MS", &mut store.ping_timeout_ms);
    override_parsed("TESSERA_MONGO_OPERATION_TIMEOUT_MS", &mut store.operation_timeout_ms);
    override_parsed("TESSERA_MONGO_SHUTDOWN_TIMEOUT_MS", &mut store.shutdown_timeout_ms);

    override_flag("TESSERA_METRICS_ENABLED", &mut config.metrics.enabled);
    override_text("TESSERA_METRICS_ENDPOINT", &mut config.metrics.endpoint);

    let otel = &mut config.tracing.otel;
    override_flag("TESSERA_TRACING_OTEL_ENABLED", &mut otel.enabled);
    override_optional_text("TESSERA_TRACING_OTEL_ENDPOINT", &mut otel.endpoint);
    override_optional_text("TESSERA_TRACING_OTEL_SERVICE_NAME", &mut otel.service_name);
    override_optional_text("TESSERA_TRACING_OTEL_CA_FILE", &mut otel.ca_file);
    override_flag("TESSERA_TRACING_OTEL_INSECURE", &mut otel.insecure);
    if let Some(ratio) = parse_env::<f64>("TESSERA_TRACING_OTEL_SAMPLING_RATIO") {
        otel.sampling_ratio = Some(ratio);
    }
}

fn override_text(name: &str, target: &mut String) {
    let Ok(value) = env::var(name) else {
        return;
    };
    let value = value.trim();
    if value.is_empty() {
        warn!(event = "config_invalid", field = name, value, "empty value ignored");
    } else {
        *target = value.to_string();
    }
}

fn override_optional_text(name: &str, target: &mut Option<String>) {
    let mut value = String::new();
    override_text(name, &mut value);
    if !value.is_empty() {
        *target = Some(value);
    }
}

fn override_parsed<T: FromStr>(name: &str, target: &mut T) {
    if let Some(value) = parse_env(name) {
        *target = value;
    }
}

fn override_flag(name: &str, target: &mut bool) {
    let Ok(value) = env::var(name) else {
        return;
    };
    match parse_bool(&value) {
        Some(flag) => *target = flag,
        None => warn!(event = "config_invalid", field = name, value = %value),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_env<T: FromStr>(name: &str) -> Option<T> {
    let value = env::var(name).ok()?;
    let parsed = value.trim().parse::<T>().ok();
    if parsed.is_none() {
        warn!(event = "config_invalid", field = name, value = %value);
    }
    parsed
}
