//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::net::TcpListener;

use wiremock::MockServer;

/// Set to `1` to fail instead of skipping when localhost cannot be bound.
const STRICT_SOCKETS_ENV: &str = "COUCH_SESSION_STRICT_SOCKETS";

/// Starts a mock server, or returns `None` when the sandbox forbids listening
/// on localhost.
pub async fn mock_server() -> Option<MockServer> {
    if let Err(error) = TcpListener::bind("127.0.0.1:0") {
        assert!(
            !strict_sockets(),
            "cannot listen on localhost ({error}) and {STRICT_SOCKETS_ENV} is set"
        );
        eprintln!("skipping: cannot listen on localhost ({error})");
        return None;
    }
    Some(MockServer::start().await)
}

fn strict_sockets() -> bool {
    std::env::var(STRICT_SOCKETS_ENV)
        .is_ok_and(|value| value == "1" || value.eq_ignore_ascii_case("true"))
}
