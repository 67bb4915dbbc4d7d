//! # Structured Logging
//!
//! Diagnostics go to stderr through `tracing`; stdout is reserved for the
//! status table and the configuration dump so both can be piped.

use std::io;

use tracing_subscriber::EnvFilter;

use crate::config::ClientOptions;

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Create a tracing span covering one CSDS run
#[macro_export]
macro_rules! csds_span {
    ($service_uri:expr, $api_version:expr) => {
        tracing::info_span!(
            "csds_run",
            service_uri = %$service_uri,
            api_version = %$api_version,
            run_id = %uuid::Uuid::new_v4()
        )
    };
    ($service_uri:expr, $api_version:expr, $($field:tt)*) => {
        tracing::info_span!(
            "csds_run",
            service_uri = %$service_uri,
            api_version = %$api_version,
            run_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Install the global subscriber. `RUST_LOG` wins over `verbose`.
pub fn init_logging(verbose: bool, format: LogFormat) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr);
    // A subscriber may already be installed by the embedding process.
    let _ = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

/// Log the effective options at startup
pub fn log_options(options: &ClientOptions) {
    tracing::debug!(
        service_uri = %options.service_uri,
        platform = %options.platform,
        auth_mode = %options.auth_mode,
        api_version = %options.api_version,
        monitor_interval_ms = options.monitor_interval.as_millis() as u64,
        visualization = options.visualization,
        max_retries = options.max_retries,
        "CSDS client configuration"
    );
}
