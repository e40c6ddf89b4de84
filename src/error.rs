//! Error type shared by the file organizer, record service and exporter.

use std::fmt;

#[derive(Debug)]
pub enum ServiceError {
    /// A required field is missing or malformed.
    Validation(String),
    /// The admin credential did not verify.
    Auth,
    /// A referenced teacher or practice does not exist.
    NotFound(String),
    /// File copy, directory creation or report write failed.
    Io(String),
    /// The storage engine rejected a statement.
    Storage(String),
}

impl ServiceError {
    /// Stable IPC error code for this kind.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "validation_failed",
            ServiceError::Auth => "auth_failed",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::Io(_) => "io_failed",
            ServiceError::Storage(_) => "db_query_failed",
        }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Validation(msg) => write!(f, "{}", msg),
            ServiceError::Auth => write!(f, "invalid admin password"),
            ServiceError::NotFound(msg) => write!(f, "{}", msg),
            ServiceError::Io(msg) => write!(f, "I/O error: {}", msg),
            ServiceError::Storage(msg) => write!(f, "storage error: {}", msg),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<rusqlite::Error> for ServiceError {
    fn from(err: rusqlite::Error) -> Self {
        ServiceError::Storage(err.to_string())
    }
}

pub fn validation(msg: impl Into<String>) -> ServiceError {
    ServiceError::Validation(msg.into())
}
