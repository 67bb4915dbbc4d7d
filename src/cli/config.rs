//! Configuration file handling for the CSDS client
//!
//! Loads optional defaults from ~/.csds/config.toml and resolves every knob
//! from, in order: command line flag, config file, `CSDS_*` environment
//! variable, built-in default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{
    ApiVersion, AuthMode, ClientOptions, DumpTarget, Platform, DEFAULT_SERVICE_URI,
    DEFAULT_TIMEOUT_SECS,
};
use crate::Error;

use super::RunArgs;

/// CLI defaults stored in ~/.csds/config.toml
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CliConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_uri: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_platform: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub authn_mode: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwt_file: Option<PathBuf>,

    /// Connect timeout in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

impl CliConfig {
    /// Default configuration file path (~/.csds/config.toml)
    pub fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .context("Unable to determine home directory")?;

        let mut path = PathBuf::from(home);
        path.push(".csds");
        path.push("config.toml");
        Ok(path)
    }

    /// Load from the default path; a missing home or file yields defaults
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Ok(path) => Self::load_from_path(&path),
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}

/// Parse a poll interval: `0`, or a number with an `ms`, `s`, `m` or `h` suffix
pub fn parse_duration(value: &str) -> std::result::Result<Duration, String> {
    let value = value.trim();
    if value == "0" {
        return Ok(Duration::ZERO);
    }

    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| format!("missing unit in duration '{}' (use ms, s, m or h)", value))?;
    let (number, unit) = value.split_at(split);
    let amount: u64 = number
        .parse()
        .map_err(|_| format!("invalid number in duration '{}'", value))?;

    match unit {
        "ms" => Ok(Duration::from_millis(amount)),
        "s" => Ok(Duration::from_secs(amount)),
        "m" => Ok(Duration::from_secs(amount.saturating_mul(60))),
        "h" => Ok(Duration::from_secs(amount.saturating_mul(3600))),
        other => Err(format!("unknown duration unit '{}' (use ms, s, m or h)", other)),
    }
}

fn parse_platform(value: &str) -> crate::Result<Platform> {
    value.parse().map_err(|_| Error::UnsupportedPlatform(value.to_string()))
}

/// First non-empty value among flag, config file and environment
fn pick(
    name: &str,
    flag: Option<String>,
    file: Option<String>,
    env: &dyn Fn(&str) -> Option<String>,
    env_key: &str,
) -> Option<String> {
    if let Some(value) = flag.filter(|v| !v.is_empty()) {
        debug!(knob = name, "Using value from command line flag");
        return Some(value);
    }
    if let Some(value) = file.filter(|v| !v.is_empty()) {
        debug!(knob = name, "Using value from config file");
        return Some(value);
    }
    if let Some(value) = env(env_key).filter(|v| !v.is_empty()) {
        debug!(knob = name, env = env_key, "Using value from environment");
        return Some(value);
    }
    None
}

/// Build run options from parsed flags, the config file and an environment
/// lookup.
pub fn resolve_options(
    args: &RunArgs,
    file: &CliConfig,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<ClientOptions> {
    let service_uri = pick(
        "service_uri",
        args.service_uri.clone(),
        file.service_uri.clone(),
        env,
        "CSDS_SERVICE_URI",
    )
    .unwrap_or_else(|| DEFAULT_SERVICE_URI.to_string());

    let platform = pick(
        "cloud_platform",
        args.cloud_platform.clone(),
        file.cloud_platform.clone(),
        env,
        "CSDS_CLOUD_PLATFORM",
    )
    .map(|v| parse_platform(&v))
    .transpose()?
    .unwrap_or_default();

    let auth_mode = pick(
        "authn_mode",
        args.authn_mode.clone(),
        file.authn_mode.clone(),
        env,
        "CSDS_AUTHN_MODE",
    )
    .map(|v| v.parse::<AuthMode>())
    .transpose()?
    .unwrap_or_default();

    let api_version = pick(
        "api_version",
        args.api_version.clone(),
        file.api_version.clone(),
        env,
        "CSDS_API_VERSION",
    )
    .map(|v| v.parse::<ApiVersion>())
    .transpose()?
    .unwrap_or_default();

    let jwt_file = pick(
        "jwt_file",
        args.jwt_file.as_ref().map(|p| p.display().to_string()),
        file.jwt_file.as_ref().map(|p| p.display().to_string()),
        env,
        "CSDS_JWT_FILE",
    )
    .map(PathBuf::from);

    let timeout_secs = match args.timeout.or(file.timeout) {
        Some(secs) => secs,
        None => match env("CSDS_TIMEOUT").filter(|v| !v.is_empty()) {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("Invalid CSDS_TIMEOUT value: {}", raw))?,
            None => DEFAULT_TIMEOUT_SECS,
        },
    };

    let options = ClientOptions {
        service_uri,
        platform,
        auth_mode,
        api_version,
        jwt_file,
        request_file: args.request_file.clone(),
        request_yaml: args.request_yaml.clone(),
        dump_target: match &args.file_to_save_config {
            Some(path) if !path.as_os_str().is_empty() => DumpTarget::File(path.clone()),
            _ => DumpTarget::Stdout,
        },
        monitor_interval: args.monitor_interval,
        visualization: args.visualization,
        filter_mode: args.filter_mode,
        filter_pattern: args.filter_pattern.clone(),
        max_retries: args.max_retries,
        timeout: Duration::from_secs(timeout_secs),
    };

    options.validate()?;
    Ok(options)
}
