//! CLI entry point for the couch-session tool.

use std::env;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use couch_session_auth::{CookieFilter, HttpClient};
use reqwest::Method;
use tracing::{debug, info};

mod app_config;
mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let file_config = app_config::load_config(args.config.as_deref())?;
    let settings = app_config::resolve_settings(&args, file_config.as_ref())?;
    let password = env::var(&args.password_env).with_context(|| {
        format!(
            "Password not found: set the `{}` environment variable",
            args.password_env
        )
    })?;

    let base = HttpClient::try_new_with_timeouts(
        settings.connect_timeout_secs,
        settings.read_timeout_secs,
    )?
    .with_max_replays(settings.max_replays);
    let cookies = Arc::new(
        CookieFilter::new(base.clone(), settings.username.as_str(), &password)
            .with_session_path(&settings.session_path)
            .with_max_replays(settings.max_replays),
    );
    let client = base.with_filter(cookies.clone());

    let mut connection = client.request(Method::from(args.method), args.url.as_str());
    if let Some(data) = &args.data {
        connection = connection
            .content_type("application/json")
            .request_body(data.as_str());
    }

    let response = connection.execute().await?;
    let status = response.status();
    let cookie_status = cookies.status().await;
    info!(
        status = status.as_u16(),
        cookie = ?cookie_status,
        "Request complete"
    );

    let body = response
        .text()
        .await
        .context("Failed to read response body")?;
    if !body.is_empty() {
        println!("{body}");
    }

    if !status.is_success() {
        bail!("Request failed with HTTP {status}");
    }
    Ok(())
}
