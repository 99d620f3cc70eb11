//! Config file loading and merging with CLI flags.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use couch_session_auth::http::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use couch_session_auth::{DEFAULT_MAX_REPLAYS, DEFAULT_SESSION_PATH};
use serde::Deserialize;

use crate::cli::Args;

/// TOML-backed file configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Default username.
    pub username: Option<String>,
    /// Session endpoint path.
    pub session_path: Option<String>,
    /// Replays allowed after a 401 on the same request.
    pub max_replays: Option<u32>,
    /// HTTP connect timeout in seconds.
    pub connect_timeout_secs: Option<u64>,
    /// HTTP read timeout in seconds.
    pub read_timeout_secs: Option<u64>,
}

impl FileConfig {
    /// Validates config values against runtime and CLI constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(username) = &self.username
            && username.trim().is_empty()
        {
            bail!("Invalid config value for `username`: must not be empty");
        }
        if let Some(max_replays) = self.max_replays
            && max_replays > 5
        {
            bail!("Invalid config value for `max_replays`: {max_replays}. Expected range: 0..=5");
        }
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;
        Ok(())
    }
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

/// Settings after merging CLI flags over file config over defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub username: String,
    pub session_path: String,
    pub max_replays: u32,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
}

/// Resolves the default config path.
///
/// 1. `$XDG_CONFIG_HOME/couch-session/config.toml`
/// 2. `$HOME/.config/couch-session/config.toml`
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg).join("couch-session").join("config.toml"));
    }
    env_var_non_empty_os("HOME").map(|home| {
        PathBuf::from(home)
            .join(".config")
            .join("couch-session")
            .join("config.toml")
    })
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    env::var_os(name).filter(|value| !value.is_empty())
}

/// Loads the config file.
///
/// An explicit path must exist. The default path is optional: a missing file
/// yields `Ok(None)`.
pub fn load_config(explicit: Option<&Path>) -> Result<Option<FileConfig>> {
    if let Some(path) = explicit {
        return load_file_config(path).map(Some);
    }
    match resolve_default_config_path() {
        Some(path) if path.is_file() => load_file_config(&path).map(Some),
        _ => Ok(None),
    }
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Cannot read config file '{}'", path.display()))?;
    parse_config_str(&raw).with_context(|| format!("Invalid config file '{}'", path.display()))
}

/// Parses and validates TOML config text.
pub fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let config: FileConfig = toml::from_str(raw).context("Failed to parse TOML")?;
    config.validate()?;
    Ok(config)
}

/// Merges CLI flags over file config over defaults.
pub fn resolve_settings(args: &Args, file_config: Option<&FileConfig>) -> Result<Settings> {
    let file = file_config.cloned().unwrap_or_default();

    let Some(username) = args.username.clone().or(file.username) else {
        bail!("No username given: pass --username or set `username` in the config file");
    };

    Ok(Settings {
        username,
        session_path: args
            .session_path
            .clone()
            .or(file.session_path)
            .unwrap_or_else(|| DEFAULT_SESSION_PATH.to_string()),
        max_replays: args
            .max_replays
            .or(file.max_replays)
            .unwrap_or(DEFAULT_MAX_REPLAYS),
        connect_timeout_secs: file.connect_timeout_secs.unwrap_or(CONNECT_TIMEOUT_SECS),
        read_timeout_secs: file.read_timeout_secs.unwrap_or(READ_TIMEOUT_SECS),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    const URL: &str = "http://localhost:5984/db";

    #[test]
    fn test_parse_config_all_fields() {
        let config = parse_config_str(
            r#"
username = "alice"
session_path = "/couch/_session"
max_replays = 2
connect_timeout_secs = 5
read_timeout_secs = 20
"#,
        )
        .unwrap();
        assert_eq!(config.username.as_deref(), Some("alice"));
        assert_eq!(config.session_path.as_deref(), Some("/couch/_session"));
        assert_eq!(config.max_replays, Some(2));
        assert_eq!(config.connect_timeout_secs, Some(5));
        assert_eq!(config.read_timeout_secs, Some(20));
    }

    #[test]
    fn test_parse_config_empty_is_default() {
        assert_eq!(parse_config_str("").unwrap(), FileConfig::default());
    }

    #[test]
    fn test_parse_config_rejects_unknown_keys() {
        assert!(parse_config_str("password = \"nope\"").is_err());
    }

    #[test]
    fn test_parse_config_rejects_invalid_max_replays() {
        let err = parse_config_str("max_replays = 9").unwrap_err();
        assert!(format!("{err:#}").contains("max_replays"), "unexpected error: {err:#}");
    }

    #[test]
    fn test_parse_config_rejects_zero_timeout() {
        let err = parse_config_str("read_timeout_secs = 0").unwrap_err();
        assert!(format!("{err:#}").contains("read_timeout_secs"), "unexpected error: {err:#}");
    }

    #[test]
    fn test_parse_config_rejects_empty_username() {
        assert!(parse_config_str("username = \"  \"").is_err());
    }

    #[test]
    fn test_load_config_explicit_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custom.toml");
        std::fs::write(&path, "username = \"bob\"\n").unwrap();
        let config = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(config.username.as_deref(), Some("bob"));
    }

    #[test]
    fn test_load_config_missing_explicit_path_is_an_error() {
        let temp = TempDir::new().unwrap();
        assert!(load_config(Some(&temp.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn test_resolve_settings_defaults() {
        let args = Args::try_parse_from(["couch-session", "-u", "alice", URL]).unwrap();
        let settings = resolve_settings(&args, None).unwrap();
        assert_eq!(
            settings,
            Settings {
                username: "alice".to_string(),
                session_path: DEFAULT_SESSION_PATH.to_string(),
                max_replays: DEFAULT_MAX_REPLAYS,
                connect_timeout_secs: CONNECT_TIMEOUT_SECS,
                read_timeout_secs: READ_TIMEOUT_SECS,
            }
        );
    }

    #[test]
    fn test_resolve_settings_cli_overrides_file() {
        let args = Args::try_parse_from([
            "couch-session",
            "-u",
            "cli-user",
            "--max-replays",
            "0",
            URL,
        ])
        .unwrap();
        let file = FileConfig {
            username: Some("file-user".to_string()),
            session_path: Some("/proxy/_session".to_string()),
            max_replays: Some(3),
            connect_timeout_secs: Some(7),
            read_timeout_secs: None,
        };
        let settings = resolve_settings(&args, Some(&file)).unwrap();
        assert_eq!(settings.username, "cli-user");
        assert_eq!(settings.max_replays, 0);
        assert_eq!(settings.session_path, "/proxy/_session");
        assert_eq!(settings.connect_timeout_secs, 7);
        assert_eq!(settings.read_timeout_secs, READ_TIMEOUT_SECS);
    }

    #[test]
    fn test_resolve_settings_requires_username() {
        let args = Args::try_parse_from(["couch-session", URL]).unwrap();
        let err = resolve_settings(&args, Some(&FileConfig::default())).unwrap_err();
        assert!(err.to_string().contains("username"), "unexpected error: {err}");
    }
}
