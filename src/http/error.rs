//! Error types for the http module.

use thiserror::Error;

/// Errors raised by the filter pipeline while sending a request.
///
/// HTTP error statuses are not errors here: the pipeline hands every response
/// back to the caller and lets the filters and the caller interpret the status.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, body read, etc.)
    #[error("network error requesting {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout requesting {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// The provided URL is malformed or invalid.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// A header name or value supplied by the caller is not valid HTTP.
    #[error("invalid header {name}")]
    InvalidHeader {
        /// The offending header name.
        name: String,
    },

    /// A response filter returned a context without the received response.
    #[error("response for {url} was discarded by a response filter")]
    ResponseDiscarded {
        /// The URL whose response went missing.
        url: String,
    },

    /// The underlying HTTP client could not be constructed.
    #[error("failed to build HTTP client: {source}")]
    ClientBuild {
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },
}

impl HttpError {
    /// Creates a network or timeout error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout { url: url.into() }
        } else {
            Self::Network {
                url: url.into(),
                source,
            }
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates an invalid header error.
    pub fn invalid_header(name: impl Into<String>) -> Self {
        Self::InvalidHeader { name: name.into() }
    }
}
