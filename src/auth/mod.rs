//! CouchDB session-cookie authentication.
//!
//! [`CookieFilter`] plugs into the [`http`](crate::http) pipeline on both the
//! request and the response side. It obtains a session cookie from the
//! server's `_session` endpoint, attaches it to every request, refreshes it
//! when a request comes back 401, and gives up for good when the server
//! rejects the credentials.

mod cookie_filter;
mod error;
mod payload;
mod session;

pub use cookie_filter::{CookieFilter, CookieStatus};
pub use error::{FailureType, SessionError};
pub use payload::{PayloadError, validate_session_payload};
pub use session::{
    DEFAULT_SESSION_PATH, SessionCookie, SessionCredentials, SessionNegotiator,
    extract_cookie_token, session_url,
};
