//! Error types for the record client.
//!
//! # Design
//! Every failure of a client call lands in exactly one variant. Soft failures
//! reported by the backend on update/delete (a `code` field in the body) are
//! not errors: those operations return `Ok(false)` instead.

use thiserror::Error;

/// Errors returned by `RecordClient` operations and parse methods.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection, TLS, timeout or read failure in the transport.
    #[error("transport failed: {0}")]
    TransportError(String),

    /// The response body is not valid JSON.
    #[error("malformed response: {0}")]
    MalformedResponseError(String),

    /// The JSON parsed but does not have the shape the operation expects.
    #[error("unexpected response shape: {0}")]
    ProtocolError(String),

    /// The backend returned no body where one was required.
    #[error("empty response from backend")]
    EmptyResponseError,

    /// A required field is absent from an otherwise well-formed response.
    #[error("field `{0}` missing from response")]
    MissingFieldError(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// Client configuration is incomplete or invalid.
    #[error("invalid configuration: {0}")]
    ConfigError(String),
}
