use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use subjob_core::executor::JobQueue;
use subjob_core::provenance::ProvenanceSeed;
use subjob_core::session::{InMemorySessionStore, SessionStore};
use subjob_worker::DetachedJobQueue;
use tower::ServiceExt;

use subjob_api::config::{ExecutorKind, ServerConfig};
use subjob_api::router::build_app_router;
use subjob_api::session::SESSION_HEADER;
use subjob_api::state::AppState;

/// Build a test `ServerConfig` with safe defaults.
///
/// No executor, no session expiry and a fixed provenance seed so tests can
/// assert on the provenance header.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        debug: false,
        session_idle_ttl_secs: 0,
        executor: ExecutorKind::None,
        worker_concurrency: 1,
        provenance: ProvenanceSeed {
            service: "TestModule".to_string(),
            method: "run_test".to_string(),
            service_ver: "0.0.1".to_string(),
            ..ProvenanceSeed::default()
        },
    }
}

/// Build the full application router with no executor attached, so every
/// submitted job stays `pending`.
pub fn build_test_app() -> Router {
    let config = test_config();
    let store: Arc<dyn SessionStore> =
        Arc::new(InMemorySessionStore::new(config.provenance.clone()));
    build_test_app_with(config, store, Arc::new(DetachedJobQueue))
}

/// Build the full application router over the given store and job queue.
///
/// Uses the same [`build_app_router`] as `main.rs`, so tests exercise the
/// production middleware stack.
pub fn build_test_app_with(
    config: ServerConfig,
    sessions: Arc<dyn SessionStore>,
    job_queue: Arc<dyn JobQueue>,
) -> Router {
    let state = AppState {
        config: Arc::new(config.clone()),
        sessions,
        job_queue,
    };
    build_app_router(state, &config)
}

/// POST a JSON body to `/`, optionally continuing the session `token`.
pub async fn post_json(
    app: Router,
    body: serde_json::Value,
    token: Option<&str>,
) -> Response<Body> {
    post_raw(app, body.to_string(), token).await
}

/// POST raw bytes to `/`, for bodies that are not valid JSON.
pub async fn post_raw(app: Router, body: String, token: Option<&str>) -> Response<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/")
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header(SESSION_HEADER, token);
    }
    app.oneshot(builder.body(Body::from(body)).unwrap())
        .await
        .unwrap()
}

/// GET `uri` with an empty body.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri).await
}

/// Send an empty-bodied request with an arbitrary HTTP method.
pub async fn send(app: Router, method: Method, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// The session token the server echoed on `response`.
pub fn session_token(response: &Response<Body>) -> String {
    response
        .headers()
        .get(SESSION_HEADER)
        .expect("response must carry a session token")
        .to_str()
        .unwrap()
        .to_string()
}

/// Collect the response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
