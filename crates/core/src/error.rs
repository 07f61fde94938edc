use crate::jobs::JobStatus;
use crate::schema::SchemaViolation;
use crate::types::JobId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The request body violated one of the request schemas.
    #[error("{}", .0.message)]
    Validation(Box<SchemaViolation>),

    /// Well-formed envelope, but no routing rule matched the method name.
    #[error("Unknown method")]
    UnknownMethod,

    #[error("No such job with ID {id}")]
    JobNotFound { id: JobId },

    /// A submission arrived without a required `context` field.
    #[error("'{field}' is a required property of the request context")]
    MissingContext { field: &'static str },

    #[error("Job {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: JobId,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("No session with token {0}")]
    SessionNotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<SchemaViolation> for CoreError {
    fn from(violation: SchemaViolation) -> Self {
        CoreError::Validation(Box::new(violation))
    }
}

impl CoreError {
    /// Short variant name, reported as `error_class` in debug responses.
    pub fn class_name(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "ValidationError",
            CoreError::UnknownMethod => "UnknownMethodError",
            CoreError::JobNotFound { .. } => "NotFoundError",
            CoreError::MissingContext { .. } => "MissingContextError",
            CoreError::InvalidTransition { .. } => "InvalidTransitionError",
            CoreError::SessionNotFound(_) => "SessionNotFoundError",
            CoreError::Internal(_) => "InternalError",
        }
    }
}
