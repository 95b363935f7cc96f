use std::future::Future;

use opentelemetry::trace::{TraceError, TracerProvider as _};
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{Sampler, TracerProvider};
use opentelemetry_sdk::Resource;
use thiserror::Error;
use tokio::task::JoinError;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{prelude::*, EnvFilter};

use crate::config::OtelConfig;
use crate::settings::Settings;

const DEFAULT_LOG_FILTER: &str = "tessera_server=info,tessera_db=info,tower_http=info,mongodb=warn";
const SERVICE_NAME: &str = "tessera-server";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Plain-text subscriber for the window before settings are known.
pub fn startup_subscriber<W>(writer: W) -> impl tracing::Subscriber + Send + Sync
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(writer)
        .with_ansi(false)
        .finish()
}

/// Loads settings with a startup subscriber in scope, so rejected config
/// values are reported instead of silently replaced by defaults.
pub fn load_settings() -> Settings {
    tracing::subscriber::with_default(startup_subscriber(std::io::stderr), Settings::from_env)
}

/// Installs the process subscriber. Returns the trace exporter guard when
/// OTLP export is enabled and came up.
pub fn init_tracing(settings: &Settings, sentry_active: bool) -> Option<OtelGuard> {
    let otel = &settings.config.tracing.otel;
    let otel_guard = if otel.enabled {
        match OtelGuard::install(otel) {
            Ok(guard) => Some(guard),
            Err(err) => {
                eprintln!("otel export disabled: {err}");
                None
            }
        }
    } else {
        None
    };

    let fmt_layer = if std::env::var("LOG_FORMAT").is_ok_and(|format| format == "json") {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer().pretty().boxed()
    };
    let otel_layer = otel_guard.as_ref().map(|guard| {
        tracing_opentelemetry::layer().with_tracer(guard.provider.tracer(SERVICE_NAME))
    });

    let installed = tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt_layer)
        .with(sentry_active.then(sentry_tracing::layer))
        .with(otel_layer)
        .try_init();
    if let Err(err) = installed {
        eprintln!("tracing subscriber already installed: {err}");
    }

    let sentry = &settings.config.sentry;
    if !sentry.enabled && !sentry.dsn.trim().is_empty() {
        tracing::warn!(event = "sentry_disabled", "sentry.dsn is set but sentry.enabled is false");
    }
    otel_guard
}

#[derive(Debug, Error)]
pub enum OtelInitError {
    #[error("reading CA file {path}: {source}")]
    CaRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("CA file is not a PEM certificate: {0}")]
    CaInvalid(#[source] reqwest::Error),
    #[error("building export client: {0}")]
    HttpClient(#[source] reqwest::Error),
    #[error("installing export pipeline: {0}")]
    Install(#[from] TraceError),
}

/// Flushes and stops the OTLP exporter when dropped.
pub struct OtelGuard {
    provider: TracerProvider,
}

impl OtelGuard {
    fn install(config: &OtelConfig) -> Result<Self, OtelInitError> {
        let mut exporter = opentelemetry_otlp::new_exporter().http();
        if let Some(endpoint) = config.endpoint.as_deref() {
            exporter = exporter.with_endpoint(endpoint);
        }
        if let Some(client) = export_client(config)? {
            exporter = exporter.with_http_client(client);
        }
        let service_name = config
            .service_name
            .clone()
            .unwrap_or_else(|| SERVICE_NAME.to_string());
        let trace_config = opentelemetry_sdk::trace::Config::default()
            .with_resource(Resource::new([KeyValue::new("service.name", service_name)]))
            .with_sampler(sampler(config));

        let provider = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(exporter)
            .with_trace_config(trace_config)
            .install_batch(opentelemetry_sdk::runtime::Tokio)?;
        opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());
        opentelemetry::global::set_tracer_provider(provider.clone());
        Ok(Self { provider })
    }
}

impl Drop for OtelGuard {
    fn drop(&mut self) {
        if let Err(err) = self.provider.shutdown() {
            eprintln!("otel shutdown failed: {err}");
        }
    }
}

/// Only built when the exporter needs something reqwest's defaults lack.
fn export_client(config: &OtelConfig) -> Result<Option<reqwest::Client>, OtelInitError> {
    if !config.insecure && config.ca_file.is_none() {
        return Ok(None);
    }
    let mut builder = reqwest::Client::builder().danger_accept_invalid_certs(config.insecure);
    if let Some(path) = config.ca_file.as_deref() {
        let pem = std::fs::read(path).map_err(|source| OtelInitError::CaRead {
            path: path.to_string(),
            source,
        })?;
        let cert = reqwest::Certificate::from_pem(&pem).map_err(OtelInitError::CaInvalid)?;
        builder = builder.add_root_certificate(cert);
    }
    builder.build().map(Some).map_err(OtelInitError::HttpClient)
}

fn sampler(config: &OtelConfig) -> Sampler {
    match config.sampling_ratio {
        None => Sampler::AlwaysOn,
        Some(ratio) if (0.0..=1.0).contains(&ratio) => Sampler::TraceIdRatioBased(ratio),
        Some(ratio) => {
            eprintln!("otel sampling_ratio {ratio} is outside 0..=1; sampling everything");
            Sampler::AlwaysOn
        }
    }
}

/// Runs `work` on its own task and awaits `teardown` once it finishes,
/// whether it returned or panicked.
pub async fn run_scoped<T, W, C>(work: W, teardown: C) -> Result<T, JoinError>
where
    T: Send + 'static,
    W: Future<Output = T> + Send + 'static,
    C: Future<Output = ()>,
{
    let outcome = tokio::spawn(work).await;
    teardown.await;
    outcome
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let signal = tokio::select! {
        () = interrupt() => "SIGINT",
        () = terminate() => "SIGTERM",
    };
    tracing::info!(event = "shutdown_signal_received", signal, "Shutting down");
}

async fn interrupt() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(event = "shutdown_signal_failed", signal = "SIGINT", error = %err);
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(err) => {
            tracing::warn!(event = "shutdown_signal_failed", signal = "SIGTERM", error = %err);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
