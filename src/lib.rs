//! # CSDS Client
//!
//! Client for the Envoy Client Status Discovery Service. It asks an xDS
//! control plane which downstream clients it serves, prints how far each
//! client's configuration has synced, and can reconstruct the
//! Listener → Route → Cluster → Endpoint graph from the reported config.
//!
//! ## Architecture
//!
//! ```text
//! request file/yaml → MatcherResolver → StreamEngine ⇄ control plane
//!                                            ↓
//!                                      StatusPrinter → dump → graph (DOT)
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use csds_client::config::{AuthMode, ClientOptions, Platform};
//! use csds_client::csds::run_status;
//!
//! #[tokio::main]
//! async fn main() -> csds_client::Result<()> {
//!     let options = ClientOptions {
//!         service_uri: "localhost:18000".into(),
//!         platform: Platform::Generic,
//!         auth_mode: AuthMode::Insecure,
//!         request_yaml: Some("node_matchers: [{node_id: {exact: gateway-1}}]".into()),
//!         ..Default::default()
//!     };
//!     let (_stop, shutdown) = tokio::sync::watch::channel(false);
//!     run_status(&options, std::io::stdout(), shutdown).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod cli;
pub mod config;
pub mod csds;
pub mod errors;
pub mod graph;
pub mod observability;

pub use config::ClientOptions;
pub use errors::{Error, Result};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_available() {
        assert!(!VERSION.is_empty());
        assert_eq!(APP_NAME, "csds-client");
    }
}
