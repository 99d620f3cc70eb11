//! Minimal HTTP filter pipeline.
//!
//! Every request sent through an [`HttpClient`] passes its registered
//! [`RequestFilter`]s before it goes on the wire and its [`ResponseFilter`]s
//! after the response comes back. A response filter can ask for the original
//! request to be replayed; the pipeline honors that up to a per-client cap.
//!
//! # Example
//!
//! ```no_run
//! use couch_session_auth::http::HttpClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let response = HttpClient::new()
//!     .post("http://localhost:5984/db", "application/json")
//!     .request_body(r#"{"hello":"world"}"#)
//!     .execute()
//!     .await?;
//! println!("{}", response.status());
//! # Ok(())
//! # }
//! ```

mod client;
mod connection;
pub(crate) mod constants;
mod error;
mod filter;

pub use client::HttpClient;
pub use connection::HttpConnection;
pub use constants::{CONNECT_TIMEOUT_SECS, DEFAULT_MAX_REPLAYS, READ_TIMEOUT_SECS};
pub use error::HttpError;
pub use filter::{FilterContext, RequestFilter, ResponseFilter};
