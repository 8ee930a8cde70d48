//! devroom is a small social API where developers register, log in and
//! follow each other.

#![forbid(unsafe_code)]
pub mod config;
mod crypto;
mod database;
pub mod error;
pub mod follow;
mod middleware;
mod router;
pub mod telemetry;
mod token;
pub mod user;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{Method, StatusCode, header};
use axum::routing::{get, post};
use axum::{Router, middleware as AxumMiddleware};
use error::ServerError;
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceBuilder;
use tower_http::LatencyUnit;
use tower_http::cors::{Any, CorsLayer};
use tower_http::sensitive_headers::SetSensitiveHeadersLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};

const CONFIG_PATH_ENV: &str = "CONFIG_PATH";

/// State sharing between routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Configuration>,
    pub users: user::UserService,
    pub follows: follow::FollowService,
    pub token: token::TokenManager,
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
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers(Any)
                .vary([header::AUTHORIZATION]),
        );

    let protected = Router::new()
        // `GET /me` goes to `me`.
        .route("/me", get(router::me::handler))
        .route("/addFollower", post(router::follow::add))
        .route("/removeFollower", post(router::follow::remove))
        .route("/users", get(router::users::handler))
        .route_layer(AxumMiddleware::from_fn_with_state(
            state.clone(),
            middleware::authenticate,
        ));

    Router::new()
        // `GET /status.json` goes to `status`.
        .route("/status.json", get(router::status::status))
        .route("/metrics", get(router::status::metrics))
        // `POST /register` goes to `register`.
        .route("/register", post(router::register::handler))
        // `POST /login` goes to `login`.
        .route("/login", post(router::login::handler))
        .merge(protected)
        .with_state(state)
        .route_layer(AxumMiddleware::from_fn(telemetry::track))
        .layer(middleware)
}

/// Initialize the application state.
pub async fn initialize_state() -> Result<AppState, Box<dyn std::error::Error>> {
    // read configuration file. let it in memory.
    let mut config = config::Configuration::default();
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        config = config.path(path.into());
    }
    let config = config.read()?;

    let repo = database::repository(config.postgres.as_ref()).await?;

    let crypto = Arc::new(crypto::PasswordManager::new(config.argon2.clone())?);

    // handle jwt.
    let Some(token_config) = config.token.as_ref().filter(|t| !t.secret.is_empty()) else {
        tracing::error!("missing `token.secret` entry on `config.yaml` file or `TOKEN_SECRET` variable");
        return Err("no token secret configured".into());
    };
    let issuer = if config.url.is_empty() { &config.name } else { &config.url };
    let mut token = token::TokenManager::new(issuer, &token_config.secret)?;
    if let Some(audience) = &token_config.audience {
        token.audience(audience);
    }
    if let Some(expiration) = token_config.expiration {
        token.expiration(expiration);
    }

    let metrics = if config.metrics {
        Some(telemetry::setup_metrics_recorder()?)
    } else {
        None
    };

    Ok(AppState {
        users: user::UserService::new(Arc::clone(&repo), crypto, config.default_avatar()),
        follows: follow::FollowService::new(repo),
        config,
        token,
        metrics,
    })
}

/// MUST NEVER be used in production.
#[cfg(test)]
pub async fn make_request(
    token: Option<&str>,
    app: Router,
    method: Method,
    path: &str,
    body: String,
) -> axum::http::Response<axum::body::Body> {
    use axum::extract::Request;
    use tower::util::ServiceExt;

    let mut request = Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    app.oneshot(request.body(axum::body::Body::from(body)).unwrap())
        .await
        .unwrap()
}

/// State backed by memory, with cheap hashing.
#[cfg(test)]
pub fn test_state() -> AppState {
    let mut config = config::Configuration::default();
    config.name = "devroom".into();
    config.version = env!("CARGO_PKG_VERSION").into();
    let config = Arc::new(config);
    let repo: Arc<dyn user::UserRepository> = Arc::new(user::MemoryRepository::new());
    let crypto = Arc::new(
        crypto::PasswordManager::new(Some(crypto::tests::light_config())).unwrap(),
    );

    AppState {
        users: user::UserService::new(Arc::clone(&repo), crypto, config.default_avatar()),
        follows: follow::FollowService::new(repo),
        token: token::TokenManager::new("devroom", "test-secret").unwrap(),
        metrics: None,
        config,
    }
}

#[cfg(test)]
pub async fn body_json(response: axum::http::Response<axum::body::Body>) -> serde_json::Value {
    use http_body_util::BodyExt;

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Log in and return the bearer token.
#[cfg(test)]
pub async fn login(app: &Router, email: &str, password: &str) -> String {
    let body = serde_json::json!({ "email": email, "password": password });
    let response = make_request(None, app.clone(), Method::POST, "/login", body.to_string()).await;
    assert_eq!(response.status(), StatusCode::OK);

    body_json(response).await["token"]
        .as_str()
        .unwrap()
        .to_owned()
}

/// Register a user and return its ID.
#[cfg(test)]
pub async fn register(app: &Router, name: &str, email: &str, password: &str) -> user::UserId {
    let body = serde_json::json!({ "name": name, "email": email, "password": password });
    let response =
        make_request(None, app.clone(), Method::POST, "/register", body.to_string()).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let token = login(app, email, password).await;
    let response = make_request(Some(&token), app.clone(), Method::GET, "/me", String::default()).await;
    let id = body_json(response).await["user"]["id"].as_str().unwrap().to_owned();

    user::UserId::parse(&id).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_configuration() {
        let state = test_state();

        assert_eq!(state.config.name, "devroom");
        assert_eq!(state.config.version, env!("CARGO_PKG_VERSION"));
        assert!(state.metrics.is_none());
    }
}
