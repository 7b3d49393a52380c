//! Instance identification and metrics exposition.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::config::Configuration;
use crate::user::UserService;

/// Public server status.
#[derive(Debug, Serialize, Deserialize)]
pub struct Status {
    pub name: String,
    pub url: String,
    pub version: String,
    /// `postgres` or `memory`.
    pub storage: String,
}

pub async fn status(
    State(config): State<Arc<Configuration>>,
    State(users): State<UserService>,
) -> Json<Status> {
    Json(Status {
        name: config.name.clone(),
        url: config.url.clone(),
        version: config.version().to_owned(),
        storage: users.backend().to_owned(),
    })
}

/// Prometheus text exposition, or `404` when the recorder is disabled.
pub async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
