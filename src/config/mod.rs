//! # Configuration Management
//!
//! Runtime options for one CSDS run. [`ClientOptions`] is assembled by the CLI
//! (flags, config file and environment) and handed to the resolver, the channel
//! factory, the streaming engine and the printer. Nothing here is global.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::csds::classify::{FilterMode, NodeFilter};
use crate::{Error, Result};

/// Default control plane address
pub const DEFAULT_SERVICE_URI: &str = "trafficdirector.googleapis.com:443";

/// Default connect timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default bound on stream reopen attempts after a policy rejection
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Deployment platform of the control plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Google Cloud Traffic Director
    #[default]
    Gcp,
    /// Any other xDS control plane; no mandatory node metadata
    Generic,
}

/// How the channel authenticates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Platform default credentials
    #[default]
    Auto,
    /// Service account credential file
    Jwt,
    /// Plaintext channel without call credentials
    Insecure,
}

/// Status protocol schema generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ApiVersion {
    V2,
    #[default]
    V3,
}

macro_rules! impl_lowercase_enum {
    ($ty:ty, $($variant:ident => $name:literal),+ $(,)?) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($name),)+
                }
            }
        }

        impl FromStr for $ty {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                match s.to_lowercase().as_str() {
                    $($name => Ok(Self::$variant),)+
                    other => Err(Error::config(format!(
                        "invalid {} '{}'",
                        stringify!($ty),
                        other
                    ))),
                }
            }
        }
    };
}

impl_lowercase_enum!(Platform, Gcp => "gcp", Generic => "generic");
impl_lowercase_enum!(AuthMode, Auto => "auto", Jwt => "jwt", Insecure => "insecure");
impl_lowercase_enum!(ApiVersion, V2 => "v2", V3 => "v3");

/// Where the detailed configuration dump goes
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DumpTarget {
    #[default]
    Stdout,
    File(PathBuf),
}

/// All knobs for one run
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub service_uri: String,
    pub platform: Platform,
    pub auth_mode: AuthMode,
    pub api_version: ApiVersion,
    pub jwt_file: Option<PathBuf>,
    pub request_file: Option<PathBuf>,
    pub request_yaml: Option<String>,
    pub dump_target: DumpTarget,
    /// Zero means single-shot
    pub monitor_interval: Duration,
    pub visualization: bool,
    pub filter_mode: Option<FilterMode>,
    pub filter_pattern: Option<String>,
    pub max_retries: u32,
    pub timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            service_uri: DEFAULT_SERVICE_URI.to_string(),
            platform: Platform::default(),
            auth_mode: AuthMode::default(),
            api_version: ApiVersion::default(),
            jwt_file: None,
            request_file: None,
            request_yaml: None,
            dump_target: DumpTarget::default(),
            monitor_interval: Duration::ZERO,
            visualization: false,
            filter_mode: None,
            filter_pattern: None,
            max_retries: DEFAULT_MAX_RETRIES,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ClientOptions {
    /// Whether the engine keeps polling after the first delivery
    pub fn is_monitor(&self) -> bool {
        !self.monitor_interval.is_zero()
    }

    /// Build the node-id filter, if one is configured
    pub fn node_filter(&self) -> Result<Option<NodeFilter>> {
        match (self.filter_mode, self.filter_pattern.as_deref()) {
            (Some(mode), Some(pattern)) => NodeFilter::new(mode, pattern).map(Some),
            (Some(_), None) | (None, None) => Ok(None),
            (None, Some(pattern)) if pattern.is_empty() => Ok(None),
            (None, Some(_)) => {
                Err(Error::config("--filter-pattern requires --filter-mode (prefix, suffix or regex)"))
            }
        }
    }

    /// Validate cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.service_uri.trim().is_empty() {
            return Err(Error::config("service uri cannot be empty"));
        }

        if self.auth_mode == AuthMode::Jwt && self.jwt_file.is_none() {
            return Err(Error::config("missing jwt file: --jwt-file is required with --authn-mode jwt"));
        }

        if self.auth_mode == AuthMode::Auto && self.platform != Platform::Gcp {
            return Err(Error::config(
                "auto authentication mode for this platform is not supported. Please use jwt_file instead",
            ));
        }

        self.node_filter()?;
        Ok(())
    }
}
