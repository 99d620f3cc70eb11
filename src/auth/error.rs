//! Error types for session negotiation.

use thiserror::Error;

use super::payload::PayloadError;
use crate::http::HttpError;

/// How a failed negotiation affects future cookie attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// May succeed later; the next request needing a cookie negotiates again.
    Transient,

    /// Will not succeed with these credentials; cookie authentication stops
    /// for the lifetime of the filter.
    Permanent,
}

/// Errors from one exchange with the `_session` endpoint.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The session endpoint URL could not be derived from the request URL.
    #[error("cannot derive session endpoint from {url}")]
    InvalidUrl {
        /// The request URL the derivation started from.
        url: String,
    },

    /// The session request could not be sent or its response not read.
    #[error("transport failure talking to session endpoint: {source}")]
    Transport {
        /// The underlying pipeline error.
        #[source]
        source: HttpError,
    },

    /// The server rejected the credentials (HTTP 401).
    #[error("credentials rejected by {url} (HTTP 401)")]
    CredentialsRejected {
        /// The session endpoint URL.
        url: String,
    },

    /// The server failed (HTTP 5xx).
    #[error("session endpoint {url} returned server error HTTP {status}")]
    ServerError {
        /// The session endpoint URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// Any status that is not 2xx, 401 or 5xx.
    #[error("session endpoint {url} returned unexpected HTTP {status}")]
    UnexpectedStatus {
        /// The session endpoint URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// A 2xx response whose body is not JSON.
    #[error("session response from {url} is not valid JSON: {source}")]
    MalformedBody {
        /// The session endpoint URL.
        url: String,
        /// The JSON parse error.
        #[source]
        source: serde_json::Error,
    },

    /// A 2xx response whose body does not vouch for the configured user.
    #[error("session response from {url} rejected: {reason}")]
    InvalidPayload {
        /// The session endpoint URL.
        url: String,
        /// Which validation step failed.
        #[source]
        reason: PayloadError,
    },

    /// A 2xx response with an acceptable body but no usable `Set-Cookie`.
    #[error("session response from {url} carried no cookie")]
    MissingCookie {
        /// The session endpoint URL.
        url: String,
    },
}

impl SessionError {
    /// Classifies the error as transient or permanent.
    ///
    /// Credential rejection and statuses outside the understood set are
    /// permanent.
    #[must_use]
    pub fn failure_type(&self) -> FailureType {
        match self {
            Self::CredentialsRejected { .. } | Self::UnexpectedStatus { .. } => {
                FailureType::Permanent
            }
            Self::InvalidUrl { .. }
            | Self::Transport { .. }
            | Self::ServerError { .. }
            | Self::MalformedBody { .. }
            | Self::InvalidPayload { .. }
            | Self::MissingCookie { .. } => FailureType::Transient,
        }
    }

    /// Creates an error for a non-2xx session status.
    ///
    /// Returns `None` for 2xx statuses, which are not errors at this stage.
    #[must_use]
    pub fn from_status(url: impl Into<String>, status: u16) -> Option<Self> {
        let url = url.into();
        match status {
            200..=299 => None,
            401 => Some(Self::CredentialsRejected { url }),
            500..=599 => Some(Self::ServerError { url, status }),
            _ => Some(Self::UnexpectedStatus { url, status }),
        }
    }
}
