//! Credential exchange with the `_session` endpoint.
//!
//! The negotiator posts the configured credentials to the session endpoint
//! of the server a request is addressed to, classifies the response status,
//! validates the body, and extracts the session token from `Set-Cookie`.

use std::fmt;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, SET_COOKIE};
use serde_json::{Value, json};
use tracing::{debug, instrument};
use url::Url;

use super::error::SessionError;
use super::payload::validate_session_payload;
use crate::http::{HttpClient, HttpError};

/// Path of the CouchDB session endpoint.
pub const DEFAULT_SESSION_PATH: &str = "/_session";

/// Username plus the pre-serialized `_session` request body.
///
/// The body embeds the password, so it is redacted in Debug output.
#[derive(Clone)]
pub struct SessionCredentials {
    username: String,
    request_body: String,
}

impl SessionCredentials {
    /// Serializes `{"name": username, "password": password}` once, up front.
    #[must_use]
    pub fn new(username: impl Into<String>, password: &str) -> Self {
        let username = username.into();
        let request_body = json!({ "name": username, "password": password }).to_string();
        Self {
            username,
            request_body,
        }
    }

    /// The configured username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }
}

impl fmt::Debug for SessionCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredentials")
            .field("username", &self.username)
            .field("request_body", &"[REDACTED]")
            .finish()
    }
}

/// A session token as sent back in the `Cookie` header, e.g. `AuthSession=abc`.
///
/// Session tokens are bearer credentials: Debug output is redacted and the
/// header value is marked sensitive.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCookie {
    token: String,
    header: HeaderValue,
}

impl SessionCookie {
    /// Wraps a token, or returns `None` if it is empty or not a valid header value.
    ///
    /// Whitespace around the token is trimmed, so `AuthSession=x ; Path=/`
    /// yields `AuthSession=x`.
    #[must_use]
    pub fn new(token: &str) -> Option<Self> {
        let token = token.trim();
        if token.is_empty() {
            return None;
        }
        let mut header = HeaderValue::from_str(token).ok()?;
        header.set_sensitive(true);
        Some(Self {
            token: token.to_string(),
            header,
        })
    }

    /// The token text. Avoid logging the return value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.token
    }

    /// The token as a ready-to-send header value.
    #[must_use]
    pub fn header_value(&self) -> &HeaderValue {
        &self.header
    }
}

impl fmt::Debug for SessionCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionCookie([REDACTED])")
    }
}

/// Extracts the session token from the response's `Set-Cookie` headers.
///
/// The token is everything before the first `;` of the first non-empty
/// `Set-Cookie` header; cookie attributes (`Path`, `HttpOnly`, ...) are
/// dropped. A header without attributes is taken whole.
#[must_use]
pub fn extract_cookie_token(headers: &HeaderMap) -> Option<SessionCookie> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|raw| raw.split(';').next())
        .find_map(SessionCookie::new)
}

/// Derives the session endpoint for the server `request_url` points at.
///
/// Scheme, host and port are kept (a non-default port stays in the URL);
/// path is replaced by `session_path`; query, fragment and userinfo are
/// dropped.
///
/// # Errors
///
/// Returns [`SessionError::InvalidUrl`] when `request_url` has no host.
pub fn session_url(request_url: &Url, session_path: &str) -> Result<Url, SessionError> {
    let invalid = || SessionError::InvalidUrl {
        url: request_url.to_string(),
    };
    if request_url.cannot_be_a_base() || request_url.host_str().is_none() {
        return Err(invalid());
    }

    let mut url = request_url.clone();
    url.set_path(session_path);
    url.set_query(None);
    url.set_fragment(None);
    url.set_username("").map_err(|()| invalid())?;
    url.set_password(None).map_err(|()| invalid())?;
    Ok(url)
}

/// Performs `_session` exchanges for one identity.
///
/// Session requests are sent with the bare reqwest client behind the given
/// [`HttpClient`], never through its filters, so a negotiator can be used
/// from inside a filter registered on that same client. Redirects are not
/// followed: a 3xx from the session endpoint is an unexpected status.
#[derive(Debug, Clone)]
pub struct SessionNegotiator {
    client: HttpClient,
    credentials: SessionCredentials,
    session_path: String,
}

impl SessionNegotiator {
    /// Creates a negotiator for `credentials` using [`DEFAULT_SESSION_PATH`].
    #[must_use]
    pub fn new(client: HttpClient, credentials: SessionCredentials) -> Self {
        Self {
            client,
            credentials,
            session_path: DEFAULT_SESSION_PATH.to_string(),
        }
    }

    /// Overrides the session endpoint path. A missing leading `/` is added.
    #[must_use]
    pub fn with_session_path(mut self, session_path: &str) -> Self {
        self.session_path = if session_path.starts_with('/') {
            session_path.to_string()
        } else {
            format!("/{session_path}")
        };
        self
    }

    /// The credentials this negotiator presents.
    #[must_use]
    pub fn credentials(&self) -> &SessionCredentials {
        &self.credentials
    }

    /// The session endpoint path.
    #[must_use]
    pub fn session_path(&self) -> &str {
        &self.session_path
    }

    /// Exchanges the credentials for a session cookie.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] describing why no cookie was obtained; use
    /// [`SessionError::failure_type`] to decide whether to try again later.
    #[instrument(skip(self), fields(url = %request_url, username = %self.credentials.username))]
    pub async fn negotiate(&self, request_url: &Url) -> Result<SessionCookie, SessionError> {
        let url = session_url(request_url, &self.session_path)?;
        let url_str = url.to_string();

        let response = self
            .client
            .inner_without_redirects()
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(self.credentials.request_body.clone())
            .send()
            .await
            .map_err(|e| SessionError::Transport {
                source: HttpError::network(url_str.as_str(), e),
            })?;

        let status = response.status().as_u16();
        if let Some(error) = SessionError::from_status(url_str.as_str(), status) {
            return Err(error);
        }

        let cookie = extract_cookie_token(response.headers());
        let body = response
            .bytes()
            .await
            .map_err(|e| SessionError::Transport {
                source: HttpError::network(url_str.as_str(), e),
            })?;
        let payload: Value =
            serde_json::from_slice(&body).map_err(|source| SessionError::MalformedBody {
                url: url_str.clone(),
                source,
            })?;
        validate_session_payload(&payload, &self.credentials.username).map_err(|reason| {
            SessionError::InvalidPayload {
                url: url_str.clone(),
                reason,
            }
        })?;

        let cookie = cookie.ok_or(SessionError::MissingCookie { url: url_str })?;
        debug!(status, "session cookie obtained");
        Ok(cookie)
    }
}
