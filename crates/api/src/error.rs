use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{json, Value};
use subjob_core::error::CoreError;

/// Body of every unexpected-fault response.
pub const INTERNAL_ERROR_MESSAGE: &str = "500 - Unexpected server error";

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Everything maps to a `{"error": ...}` JSON body; only internal faults
/// produce a 500.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `subjob_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("404 - Not found.")]
    NotFound,

    #[error("405 - Method not allowed.")]
    MethodNotAllowed,

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// HTTP status and JSON body for this error.
    ///
    /// With `debug` set, internal faults also carry `error_class` and
    /// `error_details`.
    pub fn status_and_body(&self, debug: bool) -> (StatusCode, Value) {
        match self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::Validation(violation) => {
                    tracing::debug!(error = %violation.message, "Request failed validation");
                    (
                        StatusCode::BAD_REQUEST,
                        json!({
                            "error": violation.message,
                            "instance": violation.instance,
                            "validator": violation.validator,
                            "validator_value": violation.validator_value,
                            "schema": violation.schema,
                        }),
                    )
                }
                CoreError::UnknownMethod
                | CoreError::JobNotFound { .. }
                | CoreError::MissingContext { .. } => {
                    (StatusCode::BAD_REQUEST, json!({"error": core.to_string()}))
                }
                CoreError::InvalidTransition { .. } => {
                    (StatusCode::CONFLICT, json!({"error": core.to_string()}))
                }
                CoreError::SessionNotFound(_) | CoreError::Internal(_) => {
                    internal_error(core.class_name(), &core.to_string(), debug)
                }
            },

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({"error": msg})),
            AppError::NotFound => (StatusCode::NOT_FOUND, json!({"error": self.to_string()})),
            AppError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                json!({"error": self.to_string()}),
            ),
            AppError::InternalError(msg) => internal_error("InternalError", msg, debug),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body(false);
        (status, axum::Json(body)).into_response()
    }
}

/// Log an unexpected fault and build the generic 500 body.
pub fn internal_error(class: &str, details: &str, debug: bool) -> (StatusCode, Value) {
    tracing::error!(error_class = class, error = %details, "500 Unexpected server error");

    let mut body = json!({"error": INTERNAL_ERROR_MESSAGE});
    if debug {
        body["error_class"] = json!(class);
        body["error_details"] = json!(details);
    }
    (StatusCode::INTERNAL_SERVER_ERROR, body)
}
