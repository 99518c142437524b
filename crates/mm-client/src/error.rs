//! Error types for the mm-client crate.

use thiserror::Error;

/// Errors that can occur while talking to the server.
///
/// The variants are split along the lines a caller needs to react to
/// differently: a hostname that does not resolve, a server that does not
/// accept connections, a failure on the local side of the socket, and
/// responses the server produced on purpose.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server hostname could not be resolved to any address.
    #[error("Could not resolve host '{host}': {message}")]
    Resolve {
        /// Hostname that failed to resolve.
        host: String,
        /// Resolver error description.
        message: String,
    },

    /// A TCP or TLS connection to the server could not be established.
    #[error("Could not connect to server: {0}")]
    Connect(String),

    /// A local I/O failure while sending or receiving a request.
    #[error("I/O error talking to server: {0}")]
    Io(String),

    /// The HTTP client could not be constructed or the request could not be built.
    #[error("HTTP client error: {0}")]
    Http(String),

    /// The server rejected a login attempt (bad credentials, locked account, ...).
    #[error("Login rejected: {message}")]
    LoginRejected {
        /// HTTP status of the rejection.
        status: u16,
        /// Server-provided explanation.
        message: String,
    },

    /// The session token is not (or no longer) valid.
    #[error("Session is not authorized")]
    Unauthorized,

    /// The login response did not carry a session token.
    #[error("Server response did not include a session token")]
    MissingToken,

    /// Server returned a 5xx status.
    #[error("Server error: HTTP {0}")]
    Server(u16),

    /// Server returned an unexpected status code.
    #[error("Unexpected response: HTTP {0}")]
    Unexpected(u16),

    /// Response body could not be decoded.
    #[error("Failed to decode server response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Classifies a transport-level `reqwest` failure.
    pub(crate) fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            return ApiError::Connect(err.to_string());
        }
        if err.is_builder() {
            return ApiError::Http(err.to_string());
        }
        if err.is_decode() {
            return ApiError::Decode(err.to_string());
        }
        if has_io_source(err) {
            return ApiError::Io(err.to_string());
        }
        ApiError::Http(err.to_string())
    }
}

/// Walks the source chain looking for a `std::io::Error`.
fn has_io_source(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = err.source();
    while let Some(source) = current {
        if source.is::<std::io::Error>() {
            return true;
        }
        current = source.source();
    }
    false
}
