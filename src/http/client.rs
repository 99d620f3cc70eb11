//! HTTP client wrapper carrying the filter pipeline.
//!
//! [`HttpClient`] owns a pooled reqwest client plus the request and response
//! filters every [`HttpConnection`] created from it runs through.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::redirect::Policy;
use reqwest::{Client, ClientBuilder, Method};
use tracing::instrument;

use super::connection::HttpConnection;
use super::constants::{CONNECT_TIMEOUT_SECS, DEFAULT_MAX_REPLAYS, READ_TIMEOUT_SECS};
use super::error::HttpError;
use super::filter::{RequestFilter, ResponseFilter};
use crate::user_agent;

/// HTTP client with a request/response filter pipeline.
///
/// Cloning is cheap: the reqwest connection pool and the registered filters
/// are shared between clones. Filters are added with the `with_*` builders,
/// which return a new client and leave the original untouched, so an
/// unfiltered client can be handed to a filter that needs to make its own
/// requests.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use couch_session_auth::{CookieFilter, HttpClient};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let base = HttpClient::new();
/// let cookies = Arc::new(CookieFilter::new(base.clone(), "alice", "secret"));
/// let client = base.with_filter(cookies);
/// let response = client.get("http://localhost:5984/db/doc").execute().await?;
/// println!("{}", response.status());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    no_redirect_client: Client,
    pub(super) request_filters: Vec<Arc<dyn RequestFilter>>,
    pub(super) response_filters: Vec<Arc<dyn ResponseFilter>>,
    pub(super) max_replays: u32,
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("request_filters", &self.request_filters.len())
            .field("response_filters", &self.response_filters.len())
            .field("max_replays", &self.max_replays)
            .finish_non_exhaustive()
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a new HTTP client with default timeouts and no filters.
    ///
    /// Default configuration:
    /// - Connect timeout: 30 seconds
    /// - Read timeout: 60 seconds
    /// - Gzip decompression: enabled
    /// - Replays per original request: 1
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    pub fn new() -> Self {
        Self::new_with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a new HTTP client with explicit timeout values.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the supplied
    /// timeout configuration.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new_with_timeouts(connect_timeout_secs: u64, read_timeout_secs: u64) -> Self {
        Self::try_new_with_timeouts(connect_timeout_secs, read_timeout_secs)
            .expect("failed to build HTTP client with static configuration")
    }

    /// Fallible variant of [`new_with_timeouts`](Self::new_with_timeouts).
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::ClientBuild`] when reqwest cannot build the client
    /// (for example when the TLS backend fails to initialize).
    #[instrument(level = "debug")]
    pub fn try_new_with_timeouts(
        connect_timeout_secs: u64,
        read_timeout_secs: u64,
    ) -> Result<Self, HttpError> {
        let client = base_client_builder(connect_timeout_secs, read_timeout_secs)
            .build()
            .map_err(|source| HttpError::ClientBuild { source })?;
        let no_redirect_client = base_client_builder(connect_timeout_secs, read_timeout_secs)
            .redirect(Policy::none())
            .build()
            .map_err(|source| HttpError::ClientBuild { source })?;
        Ok(Self {
            client,
            no_redirect_client,
            request_filters: Vec::new(),
            response_filters: Vec::new(),
            max_replays: DEFAULT_MAX_REPLAYS,
        })
    }

    /// Returns a client that also runs `filter` before every request.
    #[must_use]
    pub fn with_request_filter(mut self, filter: Arc<dyn RequestFilter>) -> Self {
        self.request_filters.push(filter);
        self
    }

    /// Returns a client that also runs `filter` after every response.
    #[must_use]
    pub fn with_response_filter(mut self, filter: Arc<dyn ResponseFilter>) -> Self {
        self.response_filters.push(filter);
        self
    }

    /// Registers a filter that hooks both the request and the response side.
    #[must_use]
    pub fn with_filter<F>(self, filter: Arc<F>) -> Self
    where
        F: RequestFilter + ResponseFilter + 'static,
    {
        self.with_request_filter(filter.clone())
            .with_response_filter(filter)
    }

    /// Sets how many times one original request may be replayed on filter request.
    #[must_use]
    pub fn with_max_replays(mut self, max_replays: u32) -> Self {
        self.max_replays = max_replays;
        self
    }

    /// Maximum replays per original request.
    #[must_use]
    pub fn max_replays(&self) -> u32 {
        self.max_replays
    }

    /// Starts a request with an arbitrary method.
    #[must_use]
    pub fn request(&self, method: Method, url: impl Into<String>) -> HttpConnection {
        HttpConnection::new(self.clone(), method, url.into())
    }

    /// Starts a GET request.
    #[must_use]
    pub fn get(&self, url: impl Into<String>) -> HttpConnection {
        self.request(Method::GET, url)
    }

    /// Starts a HEAD request.
    #[must_use]
    pub fn head(&self, url: impl Into<String>) -> HttpConnection {
        self.request(Method::HEAD, url)
    }

    /// Starts a POST request with the given `Content-Type`.
    #[must_use]
    pub fn post(&self, url: impl Into<String>, content_type: &str) -> HttpConnection {
        self.request(Method::POST, url).content_type(content_type)
    }

    /// Starts a PUT request with the given `Content-Type`.
    #[must_use]
    pub fn put(&self, url: impl Into<String>, content_type: &str) -> HttpConnection {
        self.request(Method::PUT, url).content_type(content_type)
    }

    /// Starts a DELETE request.
    #[must_use]
    pub fn delete(&self, url: impl Into<String>) -> HttpConnection {
        self.request(Method::DELETE, url)
    }

    /// Returns a reference to the underlying reqwest client.
    ///
    /// Requests sent directly through it bypass the filter pipeline.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Like [`inner`](Self::inner), but 3xx responses are returned as is
    /// instead of being followed.
    ///
    /// Used for credential exchanges.
    #[must_use]
    pub fn inner_without_redirects(&self) -> &Client {
        &self.no_redirect_client
    }
}

fn base_client_builder(connect_timeout_secs: u64, read_timeout_secs: u64) -> ClientBuilder {
    Client::builder()
        .connect_timeout(Duration::from_secs(connect_timeout_secs))
        .timeout(Duration::from_secs(read_timeout_secs))
        .gzip(true)
        .user_agent(user_agent::default_user_agent())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::filter::FilterContext;
    use async_trait::async_trait;

    struct Noop;

    #[async_trait]
    impl RequestFilter for Noop {
        async fn filter_request(&self, context: FilterContext) -> FilterContext {
            context
        }
    }

    #[async_trait]
    impl ResponseFilter for Noop {
        async fn filter_response(&self, context: FilterContext) -> FilterContext {
            context
        }
    }

    #[test]
    fn test_new_client_has_no_filters_and_default_replays() {
        let client = HttpClient::new();
        assert!(client.request_filters.is_empty());
        assert!(client.response_filters.is_empty());
        assert_eq!(client.max_replays(), DEFAULT_MAX_REPLAYS);
    }

    #[test]
    fn test_with_filter_registers_both_sides_without_touching_original() {
        let base = HttpClient::new();
        let filtered = base.clone().with_filter(Arc::new(Noop));
        assert_eq!(filtered.request_filters.len(), 1);
        assert_eq!(filtered.response_filters.len(), 1);
        assert!(base.request_filters.is_empty());
        assert!(base.response_filters.is_empty());
    }

    #[test]
    fn test_with_max_replays_overrides_default() {
        let client = HttpClient::new().with_max_replays(3);
        assert_eq!(client.max_replays(), 3);
    }

    #[test]
    fn test_debug_reports_filter_counts() {
        let client = HttpClient::new().with_request_filter(Arc::new(Noop));
        let debug = format!("{client:?}");
        assert!(debug.contains("request_filters: 1"), "unexpected debug: {debug}");
        assert!(debug.contains("response_filters: 0"), "unexpected debug: {debug}");
    }
}
