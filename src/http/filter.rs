//! Request/response filter hooks and the context passed through them.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Method, Response, StatusCode};
use url::Url;

/// Hook invoked on every outgoing request before it is sent.
///
/// Filters receive the context by value and hand it back, possibly modified.
/// They cannot fail: a filter that cannot do its job logs and returns the
/// context unchanged.
#[async_trait]
pub trait RequestFilter: Send + Sync {
    /// Inspects or mutates the outgoing request.
    async fn filter_request(&self, context: FilterContext) -> FilterContext;
}

/// Hook invoked on every response after it is received.
///
/// Setting [`FilterContext::set_replay_request`] asks the pipeline to resend
/// the original request.
#[async_trait]
pub trait ResponseFilter: Send + Sync {
    /// Inspects the response and decides whether the request should be replayed.
    async fn filter_response(&self, context: FilterContext) -> FilterContext;
}

/// The parts of a request that survive across replays.
#[derive(Debug, Clone)]
pub(crate) struct RequestParts {
    pub(crate) method: Method,
    pub(crate) url: Url,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Option<Vec<u8>>,
}

/// Per-request carrier passed through the filter pipeline.
///
/// A fresh context is built from the original request parts for every send,
/// including replays, so headers added by filters on an earlier attempt never
/// leak into the next one.
#[derive(Debug)]
pub struct FilterContext {
    request: RequestParts,
    response: Option<Response>,
    replay_request: bool,
    replay_count: u32,
}

impl FilterContext {
    /// Creates a context for a bodiless request that has not been sent yet.
    #[must_use]
    pub fn new(method: Method, url: Url) -> Self {
        Self::from_parts(
            RequestParts {
                method,
                url,
                headers: HeaderMap::new(),
                body: None,
            },
            0,
        )
    }

    pub(crate) fn from_parts(request: RequestParts, replay_count: u32) -> Self {
        Self {
            request,
            response: None,
            replay_request: false,
            replay_count,
        }
    }

    /// Request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.request.method
    }

    /// Request URL.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.request.url
    }

    /// Request headers as they will be (or were) sent.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.request.headers
    }

    /// Mutable access to the request headers; only meaningful before send.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.request.headers
    }

    /// Request body, if any.
    #[must_use]
    pub fn body(&self) -> Option<&[u8]> {
        self.request.body.as_deref()
    }

    /// The received response, once the request has been sent.
    #[must_use]
    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    /// Status of the received response, or `None` before send.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        self.response.as_ref().map(Response::status)
    }

    /// Whether a filter asked the pipeline to resend the original request.
    #[must_use]
    pub fn replay_requested(&self) -> bool {
        self.replay_request
    }

    /// Asks (or stops asking) the pipeline to resend the original request.
    pub fn set_replay_request(&mut self, replay: bool) {
        self.replay_request = replay;
    }

    /// Number of replays already performed for the original request.
    #[must_use]
    pub fn replay_count(&self) -> u32 {
        self.replay_count
    }

    pub(crate) fn attach_response(&mut self, response: Response) {
        self.response = Some(response);
    }

    pub(crate) fn into_parts(self) -> (RequestParts, Option<Response>) {
        (self.request, self.response)
    }

    /// Consumes the context and returns the response, if one was received.
    #[must_use]
    pub fn into_response(self) -> Option<Response> {
        self.response
    }
}
