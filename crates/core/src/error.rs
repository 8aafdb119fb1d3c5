//! Unified error types for srcwatch.
//!
//! Messages carry a stable code prefix so request handlers can map them
//! without string matching on the detail.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the source verification subsystem.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty location).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Candidate URL could not be parsed.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// No cached sources for the given key.
    #[error("CACHE_MISS: {0}")]
    CacheMiss(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// A stored value could not be decoded.
    #[error("CACHE_ERROR: corrupt row: {0}")]
    CorruptRow(String),

    /// HTTP client could not be constructed.
    #[error("HTTP_CLIENT: {0}")]
    HttpClient(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::InvalidUrl(msg) => (-32602, msg.clone()),
            Error::CacheMiss(msg) => (-32001, msg.clone()),
            Error::Database(e) => (-32002, e.to_string()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
            Error::CorruptRow(msg) => (-32002, msg.clone()),
            Error::HttpClient(msg) => (-32003, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::CacheMiss("springfield/pizza box".to_string());
        assert!(err.to_string().contains("CACHE_MISS"));
        assert!(err.to_string().contains("pizza box"));
    }

    #[test]
    fn test_invalid_input_maps_to_invalid_params() {
        let mcp_err: McpError = Error::InvalidInput("location cannot be empty".into()).into();
        assert_eq!(mcp_err.code.0, -32602);

        let mcp_err: McpError = Error::InvalidUrl("not a url".into()).into();
        assert_eq!(mcp_err.code.0, -32602);
    }

    #[test]
    fn test_cache_miss_code() {
        let mcp_err: McpError = Error::CacheMiss("x".into()).into();
        assert_eq!(mcp_err.code.0, -32001);
    }
}
