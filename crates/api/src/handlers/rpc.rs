//! Handlers for the single RPC endpoint.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;
use subjob_core::dispatch::{dispatch, RpcReply};
use subjob_core::rpc::RpcRequest;

use crate::error::{AppError, AppResult};
use crate::session::SessionToken;
use crate::state::AppState;

/// GET / -- liveness convenience, same body as `CallbackServer.status`.
pub async fn status(token: SessionToken) -> Response {
    let mut response = match RpcReply::Status.to_json() {
        Ok(body) => Json(body).into_response(),
        Err(err) => AppError::Core(err).into_response(),
    };
    token.attach(&mut response);
    response
}

/// POST / -- run one RPC call against the caller's session.
///
/// Every outcome, including validation and routing failures, is answered
/// here as JSON; the request `id` is echoed when present.
pub async fn call(State(state): State<AppState>, token: SessionToken, body: Bytes) -> Response {
    let (result, id) = match serde_json::from_slice::<Value>(&body) {
        Ok(raw) => {
            let id = raw.get("id").cloned();
            (run(&state, &token, raw).await, id)
        }
        Err(e) => (Err(AppError::BadRequest(format!("Invalid JSON body: {e}"))), None),
    };

    let (status, mut body) = match result {
        Ok(reply) => (StatusCode::OK, reply),
        Err(err) => err.status_and_body(state.config.debug),
    };
    if let (Some(id), Some(fields)) = (id, body.as_object_mut()) {
        fields.insert("id".to_string(), id);
    }

    let mut response = (status, Json(body)).into_response();
    token.attach(&mut response);
    response
}

async fn run(state: &AppState, token: &SessionToken, raw: Value) -> AppResult<Value> {
    let request = RpcRequest::parse(raw)?;
    tracing::info!(session = %token.as_str(), method = %request.method, "RPC call");

    let reply = dispatch(
        &request,
        token.as_str(),
        state.sessions.as_ref(),
        state.job_queue.as_ref(),
    )
    .await?;
    Ok(reply.to_json()?)
}

/// Any HTTP method other than GET/POST on the RPC endpoint.
pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

/// Any path without a route.
pub async fn not_found() -> AppError {
    AppError::NotFound
}
