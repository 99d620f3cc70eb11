//! One logical request executed through the filter pipeline.

use reqwest::Method;
use reqwest::Response;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, instrument, warn};
use url::Url;

use super::client::HttpClient;
use super::error::HttpError;
use super::filter::{FilterContext, RequestParts};

/// A request being assembled, executed through the client's filters.
///
/// Header errors are deferred to [`execute`](Self::execute) so the builder
/// methods can be chained without intermediate `?`.
#[derive(Debug)]
pub struct HttpConnection {
    client: HttpClient,
    method: Method,
    url: String,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
    invalid_header: Option<String>,
}

impl HttpConnection {
    pub(super) fn new(client: HttpClient, method: Method, url: String) -> Self {
        Self {
            client,
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            invalid_header: None,
        }
    }

    /// Adds a request header; replaces any previous value for the same name.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => {
                self.invalid_header.get_or_insert_with(|| name.to_string());
            }
        }
        self
    }

    /// Sets the `Content-Type` header.
    #[must_use]
    pub fn content_type(self, content_type: &str) -> Self {
        self.header(CONTENT_TYPE.as_str(), content_type)
    }

    /// Sets the request body. The body is re-sent verbatim on replay.
    #[must_use]
    pub fn request_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sends the request through the filter pipeline.
    ///
    /// Request filters run before every send and response filters after every
    /// receive. When a response filter asks for a replay, the original
    /// request is rebuilt and sent again, at most
    /// [`HttpClient::max_replays`] times; beyond that the last response is
    /// returned as is.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] if the URL or a header is invalid, if the request
    /// cannot be sent or times out, or if a response filter discards the
    /// response.
    #[instrument(skip(self), fields(method = %self.method, url = %self.url))]
    pub async fn execute(self) -> Result<Response, HttpError> {
        if let Some(name) = self.invalid_header {
            return Err(HttpError::invalid_header(name));
        }
        let url = Url::parse(&self.url).map_err(|_| HttpError::invalid_url(&self.url))?;
        let original = RequestParts {
            method: self.method,
            url,
            headers: self.headers,
            body: self.body,
        };

        let mut replay_count = 0;
        loop {
            let mut context = FilterContext::from_parts(original.clone(), replay_count);
            for filter in &self.client.request_filters {
                context = filter.filter_request(context).await;
            }

            let (sent, _) = context.into_parts();
            let response = send(&self.client, &sent).await?;
            debug!(status = response.status().as_u16(), replay_count, "response received");

            let mut context = FilterContext::from_parts(sent, replay_count);
            context.attach_response(response);
            for filter in &self.client.response_filters {
                context = filter.filter_response(context).await;
            }

            let replay = context.replay_requested();
            let response = context
                .into_response()
                .ok_or_else(|| HttpError::ResponseDiscarded {
                    url: self.url.clone(),
                })?;

            if !replay {
                return Ok(response);
            }
            if replay_count >= self.client.max_replays {
                warn!(
                    replay_count,
                    max_replays = self.client.max_replays,
                    status = response.status().as_u16(),
                    "replay requested but replay limit reached; returning last response"
                );
                return Ok(response);
            }
            replay_count += 1;
            debug!(replay_count, "replaying request");
        }
    }
}

async fn send(client: &HttpClient, parts: &RequestParts) -> Result<Response, HttpError> {
    let mut request = client
        .inner()
        .request(parts.method.clone(), parts.url.clone())
        .headers(parts.headers.clone());
    if let Some(body) = &parts.body {
        request = request.body(body.clone());
    }
    request
        .send()
        .await
        .map_err(|e| HttpError::network(parts.url.as_str(), e))
}
