//! Session-cookie state machine hooked into the filter pipeline.
//!
//! # States
//!
//! - `NoCookie`: the next request negotiates a cookie before it is sent.
//! - `HasCookie`: requests carry the stored cookie; no network call.
//! - `Disabled`: terminal. Cookie authentication is never attempted again.
//!
//! A 401 on a data request triggers a renegotiation and, when it yields a
//! cookie and the replay limit allows it, a replay of the request. A 401 from the session endpoint itself
//! (or any status it should never return) moves the filter to `Disabled`.

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::COOKIE;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};
use url::Url;

use super::error::{FailureType, SessionError};
use super::session::{SessionCookie, SessionCredentials, SessionNegotiator};
use crate::http::{DEFAULT_MAX_REPLAYS, FilterContext, HttpClient, RequestFilter, ResponseFilter};

/// Observable cookie state of a [`CookieFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookieStatus {
    /// No cookie held; the next request negotiates one.
    NoCookie,
    /// A validated cookie is attached to every request.
    HasCookie,
    /// Cookie authentication was abandoned for good.
    Disabled,
}

/// Cookie and disabled flag folded into one value so they are never read torn.
#[derive(Debug, Clone, PartialEq, Eq)]
enum CookieState {
    NoCookie,
    HasCookie(SessionCookie),
    Disabled,
}

impl CookieState {
    fn status(&self) -> CookieStatus {
        match self {
            Self::NoCookie => CookieStatus::NoCookie,
            Self::HasCookie(_) => CookieStatus::HasCookie,
            Self::Disabled => CookieStatus::Disabled,
        }
    }

    fn cookie(&self) -> Option<&SessionCookie> {
        match self {
            Self::HasCookie(cookie) => Some(cookie),
            Self::NoCookie | Self::Disabled => None,
        }
    }

    /// Applies a negotiation outcome. `Disabled` absorbs every outcome.
    fn apply(&mut self, outcome: Result<SessionCookie, SessionError>, url: &Url) {
        if *self == Self::Disabled {
            return;
        }
        match outcome {
            Ok(cookie) => {
                debug!(url = %url, "session cookie stored");
                *self = Self::HasCookie(cookie);
            }
            Err(error) => match error.failure_type() {
                FailureType::Permanent => {
                    error!(
                        url = %url,
                        error = %error,
                        "cookie authentication failed permanently and will not be attempted again"
                    );
                    *self = Self::Disabled;
                }
                FailureType::Transient => {
                    if matches!(error, SessionError::InvalidPayload { .. }) {
                        warn!(url = %url, error = %error, "session response failed validation; no cookie stored");
                    } else {
                        error!(url = %url, error = %error, "failed to get session cookie; will retry on next request");
                    }
                    *self = Self::NoCookie;
                }
            },
        }
    }
}

/// Attaches a CouchDB session cookie to requests and refreshes it on 401.
///
/// Register the same instance on both sides of the pipeline with
/// [`HttpClient::with_filter`]. One filter serves one identity.
///
/// The state is guarded by an async mutex held across negotiation, so at
/// most one `_session` exchange per filter is in flight; concurrent requests
/// that need a cookie wait for it and reuse the result.
#[derive(Debug)]
pub struct CookieFilter {
    negotiator: SessionNegotiator,
    state: Mutex<CookieState>,
    max_replays: u32,
}

impl CookieFilter {
    /// Creates a filter for `username`/`password`.
    ///
    /// `client` is used only for `_session` requests, which bypass its
    /// filters.
    #[must_use]
    pub fn new(client: HttpClient, username: impl Into<String>, password: &str) -> Self {
        Self::from_negotiator(SessionNegotiator::new(
            client,
            SessionCredentials::new(username, password),
        ))
    }

    /// Creates a filter around a preconfigured negotiator.
    #[must_use]
    pub fn from_negotiator(negotiator: SessionNegotiator) -> Self {
        Self {
            negotiator,
            state: Mutex::new(CookieState::NoCookie),
            max_replays: DEFAULT_MAX_REPLAYS,
        }
    }

    /// Overrides the session endpoint path (default `/_session`).
    #[must_use]
    pub fn with_session_path(mut self, session_path: &str) -> Self {
        self.negotiator = self.negotiator.with_session_path(session_path);
        self
    }

    /// Caps how many replays this filter requests for one original request.
    ///
    /// A 401 on a request that has already been replayed this many times
    /// still renegotiates, but is returned to the caller instead of replayed.
    #[must_use]
    pub fn with_max_replays(mut self, max_replays: u32) -> Self {
        self.max_replays = max_replays;
        self
    }

    /// The configured username.
    #[must_use]
    pub fn username(&self) -> &str {
        self.negotiator.credentials().username()
    }

    /// Current cookie state.
    pub async fn status(&self) -> CookieStatus {
        self.state.lock().await.status()
    }

    /// The cookie currently attached to requests, if any.
    pub async fn current_cookie(&self) -> Option<SessionCookie> {
        self.state.lock().await.cookie().cloned()
    }
}

#[async_trait]
impl RequestFilter for CookieFilter {
    async fn filter_request(&self, mut context: FilterContext) -> FilterContext {
        let mut state = self.state.lock().await;
        match state.status() {
            CookieStatus::Disabled => return context,
            CookieStatus::HasCookie => {}
            CookieStatus::NoCookie => {
                let outcome = self.negotiator.negotiate(context.url()).await;
                state.apply(outcome, context.url());
            }
        }

        match state.cookie() {
            Some(cookie) => {
                context
                    .headers_mut()
                    .insert(COOKIE, cookie.header_value().clone());
            }
            None => {
                context.headers_mut().remove(COOKIE);
            }
        }
        context
    }
}

#[async_trait]
impl ResponseFilter for CookieFilter {
    async fn filter_response(&self, mut context: FilterContext) -> FilterContext {
        let Some(status) = context.status() else {
            error!(url = %context.url(), "failed to read response status; skipping cookie renegotiation");
            return context;
        };
        if status != StatusCode::UNAUTHORIZED {
            return context;
        }

        let mut state = self.state.lock().await;
        if *state == CookieState::Disabled {
            return context;
        }

        // Another request may have refreshed the cookie while this one was in flight.
        let sent = context.headers().get(COOKIE);
        let refreshed = state
            .cookie()
            .is_some_and(|current| sent != Some(current.header_value()));
        if refreshed {
            debug!(url = %context.url(), "cookie refreshed concurrently; not renegotiating");
        } else {
            let outcome = self.negotiator.negotiate(context.url()).await;
            state.apply(outcome, context.url());
        }

        let has_cookie = state.cookie().is_some();
        let within_cap = context.replay_count() < self.max_replays;
        if has_cookie && !within_cap {
            warn!(
                url = %context.url(),
                replay_count = context.replay_count(),
                max_replays = self.max_replays,
                "request unauthorized and replay limit reached; fresh cookie kept for later requests"
            );
        }
        context.set_replay_request(has_cookie && within_cap);
        context
    }
}
