//! Call credentials attached to every status stream.
//!
//! The channel itself only carries TLS; per-stream request metadata (bearer
//! token, quota project) comes from a [`CallCredentials`] provider selected by
//! the auth mode. Google credential flows live in [`gcp`] and are compiled only
//! with the `gcp` feature.

#[cfg(feature = "gcp")]
pub mod gcp;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::config::{AuthMode, ClientOptions, Platform};
use crate::csds::matcher::NodeScope;
use crate::{Error, Result};

/// OAuth scope requested for control plane access
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Metadata header naming the project billed for the call
pub const USER_PROJECT_HEADER: &str = "x-goog-user-project";

/// One request metadata entry
pub type MetadataPair = (&'static str, String);

/// Source of per-stream request metadata
#[async_trait]
pub trait CallCredentials: Send + Sync {
    /// Metadata to attach when a stream is opened. Tokens are fetched (and
    /// refreshed) on each call.
    async fn metadata(&self) -> Result<Vec<MetadataPair>>;
}

/// No call credentials (plaintext channels and tests)
#[derive(Debug, Clone, Default)]
pub struct NoCredentials;

#[async_trait]
impl CallCredentials for NoCredentials {
    async fn metadata(&self) -> Result<Vec<MetadataPair>> {
        Ok(Vec::new())
    }
}

/// Fixed metadata, e.g. a pre-fetched token
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    pairs: Vec<MetadataPair>,
}

impl StaticCredentials {
    pub fn new(pairs: Vec<MetadataPair>) -> Self {
        Self { pairs }
    }

    pub fn bearer<S: Into<String>>(token: S) -> Self {
        Self { pairs: vec![("authorization", format!("Bearer {}", token.into()))] }
    }
}

#[async_trait]
impl CallCredentials for StaticCredentials {
    async fn metadata(&self) -> Result<Vec<MetadataPair>> {
        Ok(self.pairs.clone())
    }
}

/// Select the credential provider for the configured auth mode.
///
/// `auto` on gcp attaches the quota project derived from the resolved node
/// matchers.
pub async fn credentials_for(
    options: &ClientOptions,
    scope: Option<&NodeScope>,
) -> Result<Arc<dyn CallCredentials>> {
    match (options.auth_mode, options.platform) {
        (AuthMode::Insecure, _) => {
            debug!("Using plaintext channel without call credentials");
            Ok(Arc::new(NoCredentials))
        }
        (AuthMode::Jwt, Platform::Gcp) => {
            let path = options
                .jwt_file
                .as_deref()
                .ok_or_else(|| Error::config("missing jwt file"))?;
            service_account(path).await
        }
        (AuthMode::Auto, Platform::Gcp) => {
            application_default(scope.map(|s| s.project_number.clone())).await
        }
        (AuthMode::Jwt, platform) => Err(Error::UnsupportedPlatform(platform.to_string())),
        (AuthMode::Auto, _) => Err(Error::config(
            "auto authentication mode for this platform is not supported. Please use jwt_file instead",
        )),
    }
}

#[cfg(feature = "gcp")]
async fn service_account(path: &std::path::Path) -> Result<Arc<dyn CallCredentials>> {
    Ok(Arc::new(gcp::GcpCredentials::from_service_account_file(path).await?))
}

#[cfg(feature = "gcp")]
async fn application_default(user_project: Option<String>) -> Result<Arc<dyn CallCredentials>> {
    Ok(Arc::new(gcp::GcpCredentials::application_default(user_project).await?))
}

#[cfg(not(feature = "gcp"))]
async fn service_account(_path: &std::path::Path) -> Result<Arc<dyn CallCredentials>> {
    Err(Error::config("jwt authentication requires building with the `gcp` feature"))
}

#[cfg(not(feature = "gcp"))]
async fn application_default(_user_project: Option<String>) -> Result<Arc<dyn CallCredentials>> {
    Err(Error::config("auto authentication requires building with the `gcp` feature"))
}
