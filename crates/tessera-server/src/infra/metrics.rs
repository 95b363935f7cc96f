//! Store and user-operation metrics on the default prometheus registry.
//! Per-request HTTP metrics come from the `axum-prometheus` layer.

use std::sync::LazyLock;
use std::time::Duration;

use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};

const STORE_BUCKETS: [f64; 11] = [
    0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    Ok,
    Error,
    Timeout,
}

impl StoreOutcome {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
            Self::Timeout => "timeout",
        }
    }
}

struct ServiceMetrics {
    store_calls: IntCounterVec,
    store_latency: HistogramVec,
    user_requests: IntCounterVec,
}

impl ServiceMetrics {
    fn register(registry: &Registry) -> prometheus::Result<Self> {
        let store_calls = IntCounterVec::new(
            Opts::new("tessera_store_operations_total", "Store calls by outcome"),
            &["operation", "result"],
        )?;
        let store_latency = HistogramVec::new(
            HistogramOpts::new(
                "tessera_store_operation_duration_seconds",
                "Store call latency, including calls that timed out",
            )
            .buckets(STORE_BUCKETS.to_vec()),
            &["operation"],
        )?;
        let user_requests = IntCounterVec::new(
            Opts::new("tessera_user_requests_total", "User API calls by outcome"),
            &["operation", "outcome"],
        )?;
        registry.register(Box::new(store_calls.clone()))?;
        registry.register(Box::new(store_latency.clone()))?;
        registry.register(Box::new(user_requests.clone()))?;
        Ok(Self {
            store_calls,
            store_latency,
            user_requests,
        })
    }
}

static METRICS: LazyLock<Option<ServiceMetrics>> = LazyLock::new(|| {
    ServiceMetrics::register(prometheus::default_registry())
        .map_err(|err| tracing::warn!(event = "metrics_register_failed", error = %err))
        .ok()
});

pub fn record_store_call(operation: &str, outcome: StoreOutcome, elapsed: Duration) {
    if let Some(metrics) = METRICS.as_ref() {
        metrics
            .store_calls
            .with_label_values(&[operation, outcome.as_str()])
            .inc();
        metrics
            .store_latency
            .with_label_values(&[operation])
            .observe(elapsed.as_secs_f64());
    }
}

pub fn record_user_request(operation: &str, outcome: &str) {
    if let Some(metrics) = METRICS.as_ref() {
        metrics
            .user_requests
            .with_label_values(&[operation, outcome])
            .inc();
    }
}

/// Adds process CPU/memory/fd metrics. Linux only.
pub fn register_process_collector() {
    #[cfg(target_os = "linux")]
    {
        let collector = prometheus::process_collector::ProcessCollector::for_self();
        if let Err(err) = prometheus::default_registry().register(Box::new(collector)) {
            tracing::warn!(event = "metrics_register_failed", metric = "process", error = %err);
        }
    }
}

/// Text exposition of everything on the default registry.
pub fn render() -> String {
    let encoder = prometheus::TextEncoder::new();
    encoder
        .encode_to_string(&prometheus::gather())
        .unwrap_or_else(|err| {
            tracing::warn!(event = "metrics_encode_failed", error = %err);
            String::new()
        })
}
