#![allow(clippy::pedantic)]
#![allow(clippy::nursery)]
#![deny(clippy::unwrap_used)]
#![allow(clippy::cognitive_complexity)]

use tessera_server::{bootstrap, runtime, settings};

mod cli;

#[tokio::main]
async fn main() {
    let run_mode = cli::parse_args();
    let settings = runtime::load_settings();
    let sentry_guard = bootstrap::init_sentry(&settings);
    let otel_guard = runtime::init_tracing(&settings, sentry_guard.is_some());
    if let Err(problems) = settings::preflight(&settings) {
        tracing::error!(
            event = "preflight_failed",
            problems = ?problems,
            "Invalid configuration"
        );
        std::process::exit(1);
    }
    bootstrap::log_startup(&settings);

    // Guards outlive the run so late events still reach Sentry and OTLP.
    let code = match run_mode {
        cli::RunMode::Check => check(&settings).await,
        cli::RunMode::Server => serve(settings).await,
    };

    drop(otel_guard);
    drop(sentry_guard);
    if code != 0 {
        std::process::exit(code);
    }
}

async fn check(settings: &settings::Settings) -> i32 {
    match bootstrap::run_check(settings).await {
        Ok(()) => 0,
        Err(err) => {
            tracing::error!(event = "store_connect_failed", error = %err, "Could not connect to MongoDB");
            1
        }
    }
}

async fn serve(settings: settings::Settings) -> i32 {
    bootstrap::init_metrics(&settings.config.metrics);
    let handle = match bootstrap::connect_store(&settings).await {
        Ok(handle) => handle,
        Err(err) => {
            tracing::error!(event = "store_connect_failed", error = %err, "Could not connect to MongoDB");
            return 1;
        }
    };

    // Everything past the connect runs on its own task so the handle is
    // closed even when router setup or serving panics.
    let state = bootstrap::build_state(&settings, &handle);
    let served = runtime::run_scoped(
        async move {
            let app = bootstrap::build_app(&settings.config.metrics, state);
            bootstrap::serve(&settings, app).await
        },
        handle.close(),
    )
    .await;

    match served {
        Ok(Ok(())) => 0,
        Ok(Err(_)) => 1,
        Err(err) => {
            tracing::error!(event = "server_task_failed", error = %err, "Server task aborted");
            1
        }
    }
}
