//! Route definition for the RPC endpoint.

use axum::routing::get;
use axum::Router;

use crate::handlers::rpc;
use crate::state::AppState;

/// The single RPC endpoint.
///
/// ```text
/// GET    /    -> status
/// POST   /    -> call
/// other  /    -> 405
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/",
        get(rpc::status)
            .post(rpc::call)
            .fallback(rpc::method_not_allowed),
    )
}
