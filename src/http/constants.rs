//! Constants for the http module (timeouts, replay bounds).

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (60 seconds).
pub const READ_TIMEOUT_SECS: u64 = 60;

/// Default number of replays the pipeline performs for one original request.
pub const DEFAULT_MAX_REPLAYS: u32 = 1;
