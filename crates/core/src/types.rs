/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Opaque job identifier handed out at submission time (a v4 UUID string).
pub type JobId = String;

/// Opaque token naming one caller's session.
pub type SessionToken = String;
