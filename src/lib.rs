//! Session-cookie authentication for CouchDB-style HTTP clients.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`http`] - HTTP client with a request/response filter pipeline and bounded replay
//! - [`auth`] - Session negotiation and the cookie state machine filter

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod http;
pub(crate) mod user_agent;

// Re-export commonly used types
pub use auth::{
    CookieFilter, CookieStatus, DEFAULT_SESSION_PATH, FailureType, PayloadError, SessionCookie,
    SessionCredentials, SessionError, SessionNegotiator,
};
pub use http::{
    DEFAULT_MAX_REPLAYS, FilterContext, HttpClient, HttpConnection, HttpError, RequestFilter,
    ResponseFilter,
};
