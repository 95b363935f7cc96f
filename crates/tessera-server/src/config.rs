use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 9000;
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
pub const DEFAULT_MONGO_URI: &str = "mongodb://127.0.0.1:27017";
pub const DEFAULT_DATABASE: &str = "Mongo_golang";
pub const DEFAULT_COLLECTION: &str = "User";
pub const DEFAULT_METRICS_ENDPOINT: &str = "/metrics";

/// Effective service configuration. Every section and field may be omitted
/// from the YAML file; missing values take the defaults below.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server: ListenConfig,
    pub store: StoreConfig,
    pub sentry: SentryConfig,
    pub metrics: MetricsConfig,
    pub tracing: TracingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenConfig {
    pub host: String,
    pub port: u16,
    pub max_body_bytes: usize,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Where user records live and how long each kind of store call may take.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub uri: String,
    pub database: String,
    pub collection: String,
    pub connect_timeout_ms: u64,
    pub ping_timeout_ms: u64,
    pub operation_timeout_ms: u64,
    pub shutdown_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: DEFAULT_MONGO_URI.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            connect_timeout_ms: 10_000,
            ping_timeout_ms: 2_000,
            operation_timeout_ms: 5_000,
            shutdown_timeout_ms: 5_000,
        }
    }
}

impl StoreConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout_ms)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// Connection string with any userinfo masked, safe for logs.
    pub fn redacted_uri(&self) -> String {
        let Ok(mut parsed) = url::Url::parse(&self.uri) else {
            return "<unparseable>".to_string();
        };
        if !parsed.username().is_empty() || parsed.password().is_some() {
            let _ = parsed.set_username("***");
            let _ = parsed.set_password(None);
        }
        parsed.to_string()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SentryConfig {
    pub enabled: bool,
    pub dsn: String,
    pub environment: Option<String>,
    pub release: Option<String>,
}

impl SentryConfig {
    pub fn is_active(&self) -> bool {
        self.enabled && !self.dsn.trim().is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: DEFAULT_METRICS_ENDPOINT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    pub otel: OtelConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OtelConfig {
    pub enabled: bool,
    pub endpoint: Option<String>,
    pub service_name: Option<String>,
    pub sampling_ratio: Option<f64>,
    pub ca_file: Option<String>,
    pub insecure: bool,
}
