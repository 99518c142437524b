//! Pooled transport to a Mattermost server.
//!
//! A [`Connection`] wraps one `reqwest` blocking client whose pool is sized
//! by the fixed [`PoolConfig`]. Opening a connection resolves the hostname
//! up front so that an unknown host is reported as
//! [`ApiError::Resolve`](crate::ApiError::Resolve) rather than as a generic
//! connect failure on the first request.

use std::net::ToSocketAddrs;
use std::time::Duration;

use crate::error::ApiError;

/// Whether to talk to the server over TLS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// HTTPS.
    Secure,
    /// Plain HTTP. Only for servers without TLS.
    Insecure,
}

impl TransportKind {
    /// URL scheme for this transport.
    pub fn scheme(self) -> &'static str {
        match self {
            TransportKind::Secure => "https",
            TransportKind::Insecure => "http",
        }
    }
}

/// Fixed connection pool parameters.
///
/// These are not tunable per attempt. The underlying HTTP client keeps a
/// single pool per host, which corresponds to one stripe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// How long an idle pooled connection is kept before it is closed.
    pub idle_timeout: Duration,
    /// Number of independent sub-pools.
    pub stripes: usize,
    /// Maximum pooled connections per host.
    pub max_connections: usize,
}

impl PoolConfig {
    /// The pool parameters every connection uses.
    pub const FIXED: PoolConfig = PoolConfig {
        idle_timeout: Duration::from_secs(60),
        stripes: 1,
        max_connections: 5,
    };
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::FIXED
    }
}

/// Everything needed to open a connection, minus credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionData {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Optional path prefix when the server is not mounted at `/`.
    pub url_path: Option<String>,
    /// TLS or plain HTTP.
    pub transport: TransportKind,
    /// Reject invalid TLS certificates (default `true`).
    pub validate_certificate: bool,
}

impl ConnectionData {
    /// Creates connection data with no path prefix and certificate validation on.
    pub fn new(host: impl Into<String>, port: u16, transport: TransportKind) -> Self {
        Self {
            host: host.into(),
            port,
            url_path: None,
            transport,
            validate_certificate: true,
        }
    }

    /// Base URL for API requests, without a trailing slash.
    pub fn base_url(&self) -> String {
        let mut url = format!("{}://{}:{}", self.transport.scheme(), self.host, self.port);
        if let Some(path) = self.url_path.as_deref() {
            let trimmed = path.trim_matches('/');
            if !trimmed.is_empty() {
                url.push('/');
                url.push_str(trimmed);
            }
        }
        url
    }
}

/// An opened, pooled handle to the server.
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
#[derive(Debug)]
pub struct Connection {
    pub(crate) http: reqwest::blocking::Client,
    pub(crate) base_url: String,
    data: ConnectionData,
}

impl Connection {
    /// Resolves the server hostname and builds the pooled HTTP client.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Resolve`] if the hostname does not resolve
    /// - [`ApiError::Http`] if the HTTP client cannot be built
    pub fn open(data: &ConnectionData) -> Result<Self, ApiError> {
        resolve(&data.host, data.port)?;
        let pool = PoolConfig::FIXED;
        let http = reqwest::blocking::Client::builder()
            .pool_idle_timeout(pool.idle_timeout)
            .pool_max_idle_per_host(pool.max_connections)
            .danger_accept_invalid_certs(!data.validate_certificate)
            .user_agent(concat!("mm-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Http(e.to_string()))?;
        Ok(Self {
            http,
            base_url: data.base_url(),
            data: data.clone(),
        })
    }

    /// The data this connection was opened with.
    pub fn data(&self) -> &ConnectionData {
        &self.data
    }
}

/// Resolves `host:port`, failing if no address comes back.
fn resolve(host: &str, port: u16) -> Result<(), ApiError> {
    let mut addrs = (host, port).to_socket_addrs().map_err(|e| ApiError::Resolve {
        host: host.to_string(),
        message: e.to_string(),
    })?;
    if addrs.next().is_none() {
        return Err(ApiError::Resolve {
            host: host.to_string(),
            message: "no addresses returned".to_string(),
        });
    }
    Ok(())
}
