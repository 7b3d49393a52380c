//! Clientele keeps track of which consultor looks after which client.
#![forbid(unsafe_code)]

pub mod clock;
pub mod config;
pub mod database;
pub mod error;
mod router;
pub mod telemetry;
pub mod user;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{Method, StatusCode, header};
use axum::routing::get;
use axum::{Router, middleware as AxumMiddleware};
pub use error::ServerError;
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceBuilder;
use tower_http::LatencyUnit;
use tower_http::cors::{Any, CorsLayer};
use tower_http::sensitive_headers::SetSensitiveHeadersLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{
    DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer,
};

use crate::clock::SystemClock;
use crate::user::{
    MemoryUserRepository, PgUserRepository, UserRepository, UserService,
};

/// MUST NEVER be used in production.
#[cfg(test)]
pub async fn make_request(
    app: Router,
    method: Method,
    path: &str,
    body: String,
) -> axum::http::Response<axum::body::Body> {
    use axum::extract::Request;
    use tower::util::ServiceExt;

    app.oneshot(
        Request::builder()
            .method(method)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(axum::body::Body::from(body))
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Collect a response body as JSON.
#[cfg(test)]
pub async fn body_json(
    response: axum::http::Response<axum::body::Body>,
) -> serde_json::Value {
    use http_body_util::BodyExt;

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// State backed by the in-memory store and a manual clock.
#[cfg(test)]
pub fn memory_state() -> (AppState, Arc<clock::ManualClock>) {
    let (users, clock) = user::service::tests::service();
    let config = config::Configuration::default()
        .from_yaml("name: clientele")
        .unwrap();

    (
        AppState {
            config: Arc::new(config),
            users,
            metrics: None,
        },
        clock,
    )
}

/// State sharing between routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Configuration>,
    pub users: UserService,
    /// Set when the Prometheus recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

/// Create router.
pub fn app(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        // Add high level tracing/logging to all requests.
        .layer(
            TraceLayer::new_for_http()
                .on_body_chunk(|chunk: &Bytes, latency: Duration, _span: &tracing::Span| {
                    tracing::trace!(size_bytes = chunk.len(), latency = ?latency, "sending body chunk")
                })
                .make_span_with(DefaultMakeSpan::new().include_headers(true).level(tracing::Level::INFO))
                .on_request(DefaultOnRequest::new())
                .on_response(DefaultOnResponse::new().include_headers(true).latency_unit(LatencyUnit::Micros)),
        )
        // Set a timeout.
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, Duration::from_secs(10)))
        // Remove sensitive headers from trace.
        .layer(SetSensitiveHeadersLayer::new([header::AUTHORIZATION, header::COOKIE]))
        // Add CORS preflight support.
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
                .allow_headers(Any),
        );

    Router::new()
        // `GET /status.json` goes to `status`.
        .route("/status.json", get(router::status::status))
        // `GET /metrics` goes to `metrics`.
        .route("/metrics", get(router::status::metrics))
        .nest("/api", router::api())
        .with_state(state)
        .route_layer(AxumMiddleware::from_fn(telemetry::track))
        .layer(middleware)
}

/// Initialize the application state.
///
/// Without a `postgres` section users live in memory and are lost on exit.
pub async fn initialize_state(
    config: Arc<config::Configuration>,
    metrics: Option<PrometheusHandle>,
) -> Result<AppState, Box<dyn std::error::Error + Send + Sync>> {
    let repo: Arc<dyn UserRepository> = match config.postgres {
        Some(ref postgres) => {
            let db = database::Database::from_config(postgres).await?;
            // execute migrations scripts on start.
            db.migrate().await?;
            Arc::new(PgUserRepository::new(db.postgres))
        },
        None => {
            tracing::warn!(
                "missing `postgres` entry on `config.yaml` file, users are kept in memory"
            );
            Arc::new(MemoryUserRepository::new())
        },
    };

    let users =
        UserService::new(repo, Arc::new(SystemClock), config.zone());

    Ok(AppState {
        config,
        users,
        metrics,
    })
}
