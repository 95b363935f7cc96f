use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use opentelemetry::propagation::Extractor;
use tessera_db::{connect_mongo, ConnectError, MongoHandle, StoreOptions};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::app::{self, AppState};
use crate::config::MetricsConfig;
use crate::infra::metrics;
use crate::runtime;
use crate::settings::Settings;

const REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

pub fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let sentry = &settings.config.sentry;
    if !sentry.is_active() {
        return None;
    }
    let options = sentry::ClientOptions {
        environment: sentry.environment.clone().map(Into::into),
        release: sentry.release.clone().map(Into::into),
        ..Default::default()
    };
    Some(sentry::init((sentry.dsn.as_str(), options)))
}

pub fn log_startup(settings: &Settings) {
    let store = &settings.config.store;
    tracing::info!(
        event = "server_startup",
        addr = %settings.addr,
        mongo_uri = %store.redacted_uri(),
        database = %store.database,
        collection = %store.collection,
        connect_timeout_ms = store.connect_timeout_ms,
        ping_timeout_ms = store.ping_timeout_ms,
        operation_timeout_ms = store.operation_timeout_ms,
        max_body_bytes = settings.config.server.max_body_bytes,
        metrics_endpoint = settings.config.metrics.enabled.then_some(settings.config.metrics.endpoint.as_str()),
        otel_enabled = settings.config.tracing.otel.enabled,
        "Server configuration loaded"
    );
}

pub fn init_metrics(metrics_config: &MetricsConfig) {
    if metrics_config.enabled {
        metrics::register_process_collector();
    }
}

pub fn store_options(settings: &Settings) -> StoreOptions {
    let store = &settings.config.store;
    StoreOptions {
        connect_timeout: store.connect_timeout(),
        ping_timeout: store.ping_timeout(),
        shutdown_timeout: store.shutdown_timeout(),
        app_name: Some("tessera-server".to_string()),
    }
}

pub async fn connect_store(settings: &Settings) -> Result<MongoHandle, ConnectError> {
    connect_mongo(&settings.config.store.uri, &store_options(settings)).await
}

/// Connects, pings and disconnects again. Backs the `check` subcommand.
pub async fn run_check(settings: &Settings) -> Result<(), ConnectError> {
    let handle = connect_store(settings).await?;
    handle.close().await;
    tracing::info!(event = "store_check_ok", "MongoDB is reachable");
    Ok(())
}

pub fn build_state(settings: &Settings, handle: &MongoHandle) -> AppState {
    let store = &settings.config.store;
    let repo = handle.user_repo(&store.database, &store.collection);
    tracing::debug!(
        event = "user_repo_ready",
        database = %store.database,
        collection = repo.collection_name()
    );
    AppState::new(Arc::new(repo), settings.config.clone())
}

struct HeaderExtractor<'a>(&'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|value| value.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(HeaderName::as_str).collect()
    }
}

/// One span per request, joined to the caller's trace when a `traceparent`
/// header is present.
fn request_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(&REQUEST_ID)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or("unmatched", MatchedPath::as_str);
    let span = tracing::info_span!(
        "http_request",
        method = %request.method(),
        route,
        request_id
    );
    let parent = opentelemetry::global::get_text_map_propagator(|propagator| {
        propagator.extract(&HeaderExtractor(request.headers()))
    });
    span.set_parent(parent);
    span
}

fn panic_response(panic: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload");
    tracing::error!(event = "panic_recovered", detail, "handler panicked");
    let mut response = Response::new(Body::from("Internal server error\n"));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    response
}

/// Adds the scrape route plus the `axum-prometheus` request layer.
fn with_metrics(app: Router, endpoint: &str) -> Router {
    let (layer, handle) = axum_prometheus::PrometheusMetricLayer::pair();
    let scrape = move || async move {
        let mut body = handle.render();
        body.push('\n');
        body.push_str(&metrics::render());
        (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
    };
    app.layer(layer).route(endpoint, axum::routing::get(scrape))
}

pub fn build_app(metrics_config: &MetricsConfig, state: AppState) -> Router {
    let mut app = app::build_router(state);
    if metrics_config.enabled {
        app = with_metrics(app, &metrics_config.endpoint);
    }
    app.layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(PropagateRequestIdLayer::new(REQUEST_ID))
        .layer(SetRequestIdLayer::new(REQUEST_ID, MakeRequestUuid))
        .layer(CatchPanicLayer::custom(panic_response))
}

pub async fn serve(settings: &Settings, app: Router) -> std::io::Result<()> {
    let addr: SocketAddr = settings.addr;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .inspect_err(|err| tracing::error!(event = "server_bind_failed", %addr, error = %err))?;
    tracing::info!(event = "server_listening", %addr, "Server starting on port {}", addr.port());

    axum::serve(listener, app)
        .with_graceful_shutdown(runtime::shutdown_signal())
        .await
        .inspect_err(|err| tracing::error!(event = "server_failed", error = %err))
}
