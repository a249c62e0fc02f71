//! Error types for the network client.
//!
//! # Design
//! Every failure surfaces as a distinct variant so callers can decide their
//! own retry policy. `ServerError` keeps the raw status and body, and the
//! wrapped causes stay reachable through `std::error::Error::source`.
//! The `Display` output is meant for logs and UI, not for branching.

use thiserror::Error;

/// Boxed cause carried by transport-level failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by `NetworkClient` and the request builders.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The transport produced something without a usable status line.
    #[error("invalid response from server")]
    InvalidResponse,

    /// The server answered with a status outside 200..300.
    #[error("server error with status code {status}: {}", describe_body(.body))]
    ServerError { status: u16, body: Option<Vec<u8>> },

    /// The response body did not match the expected shape.
    #[error("decoding error: {0}")]
    DecodingError(#[source] serde_json::Error),

    /// Reserved for authentication-specific failures. The current flow
    /// reports rejected credentials as `ServerError`.
    #[error("authentication error: {0}")]
    AuthenticationError(#[source] BoxError),

    /// Any other transport failure: refused connection, timeout, DNS.
    #[error("unknown error: {0}")]
    Unknown(#[source] BoxError),

    /// The request body could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(#[source] serde_json::Error),

    /// The configured base URL cannot have path segments appended.
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

fn describe_body(body: &Option<Vec<u8>>) -> String {
    match body {
        Some(bytes) if !bytes.is_empty() => match std::str::from_utf8(bytes) {
            Ok(text) => text.to_string(),
            Err(_) => format!("<{} bytes of binary data>", bytes.len()),
        },
        _ => "no data".to_string(),
    }
}
