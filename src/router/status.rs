//! Public server status and metrics.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::AppState;
use crate::config::Configuration;
use crate::error::{Result, ServerError};

/// Structured configuration.
#[derive(Serialize)]
pub struct Status {
    name: String,
    version: String,
}

/// Public server status (configuration).
pub async fn status(State(config): State<Arc<Configuration>>) -> Json<Status> {
    Json(Status {
        name: config.name.clone(),
        version: config.version.clone(),
    })
}

/// Prometheus exposition, when enabled.
pub async fn metrics(State(state): State<AppState>) -> Result<String> {
    state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .ok_or(ServerError::NotFound)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::*;

    #[tokio::test]
    async fn test_status() {
        let app = app(test_state());

        let response = make_request(None, app, Method::GET, "/status.json", String::default()).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_metrics_disabled() {
        let app = app(test_state());

        let response = make_request(None, app, Method::GET, "/metrics", String::default()).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
