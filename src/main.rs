use std::path::PathBuf;

use clientele::config::Configuration;
use clientele::{app, initialize_state, telemetry};
use opentelemetry::global;
use tokio::net::TcpListener;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const CONFIG_PATH_ENV: &str = "CONFIG_PATH";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut config = Configuration::default();
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        config = config.path(PathBuf::from(path));
    }
    let config = config.read()?;
    let telemetry = config.telemetry();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level()));

    // initialize tracing.
    let (otlp_logs, tracer) = match &telemetry.otlp_endpoint {
        Some(endpoint) => {
            let tracer = telemetry::setup_tracer(endpoint)?;
            global::set_tracer_provider(tracer.clone());
            (Some(telemetry::setup_logging(endpoint)?), Some(tracer))
        },
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(filter))
        .with(otlp_logs)
        .init();

    // initialize metrics.
    let metrics = if telemetry.prometheus {
        Some(telemetry::setup_metrics_recorder()?)
    } else {
        None
    };

    let state = initialize_state(config.clone(), metrics).await?;
    let storage = state.users.backend();

    let listener = TcpListener::bind(config.address()).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        version = config.version(),
        storage,
        "server listening"
    );

    axum::serve(listener, app(state))
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "cannot listen for shutdown signal");
            }
            tracing::info!("shutdown signal received");
        })
        .await?;

    if let Some(tracer) = tracer {
        tracer.shutdown()?;
    }

    Ok(())
}
