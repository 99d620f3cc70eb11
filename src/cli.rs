//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use reqwest::Method;

/// Send one request to a CouchDB-style server using session-cookie authentication.
///
/// The password is read from the environment variable named by
/// `--password-env`, never from the command line or the config file.
#[derive(Parser, Debug)]
#[command(name = "couch-session")]
#[command(author, version, about)]
pub struct Args {
    /// URL to request, e.g. http://localhost:5984/mydb/mydoc
    pub url: String,

    /// Username to authenticate as (overrides the config file)
    #[arg(short, long)]
    pub username: Option<String>,

    /// Environment variable holding the password
    #[arg(long, default_value = "COUCH_PASSWORD")]
    pub password_env: String,

    /// HTTP method
    #[arg(short = 'X', long, value_enum, default_value_t = HttpMethod::Get)]
    pub method: HttpMethod,

    /// JSON request body
    #[arg(short = 'd', long)]
    pub data: Option<String>,

    /// Session endpoint path (default /_session)
    #[arg(long)]
    pub session_path: Option<String>,

    /// Replays allowed after a 401 on the same request (0-5)
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=5))]
    pub max_replays: Option<u32>,

    /// Path to a TOML config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

/// Request methods the CLI can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Delete,
}

impl From<HttpMethod> for Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Head => Method::HEAD,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
        }
    }
}
