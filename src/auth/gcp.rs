//! Google OAuth call credentials
//!
//! - `jwt`: service account key file
//! - `auto`: Application Default Credentials (`GOOGLE_APPLICATION_CREDENTIALS`,
//!   then the metadata server on GCE/GKE/Cloud Run)

use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, info};
use yup_oauth2::authenticator::DefaultAuthenticator;
use yup_oauth2::{
    ApplicationDefaultCredentialsAuthenticator, ApplicationDefaultCredentialsFlowOpts,
    ServiceAccountAuthenticator,
};

use super::{CallCredentials, MetadataPair, CLOUD_PLATFORM_SCOPE, USER_PROJECT_HEADER};
use crate::{Error, Result};

/// Bearer token provider backed by a yup-oauth2 authenticator
pub struct GcpCredentials {
    auth: DefaultAuthenticator,
    user_project: Option<String>,
}

impl std::fmt::Debug for GcpCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcpCredentials")
            .field("auth", &"[Authenticator]")
            .field("user_project", &self.user_project)
            .finish()
    }
}

impl GcpCredentials {
    /// Credentials from a service account key file
    pub async fn from_service_account_file(path: &Path) -> Result<Self> {
        let key = yup_oauth2::read_service_account_key(path)
            .await
            .map_err(|e| Error::io_path("read service account key", path, e))?;

        let auth = ServiceAccountAuthenticator::builder(key).build().await.map_err(|e| {
            Error::config(format!("Failed to build service account authenticator: {}", e))
        })?;

        info!(path = %path.display(), "Using service account credentials");
        Ok(Self { auth, user_project: None })
    }

    /// Application Default Credentials, optionally billing `user_project`
    pub async fn application_default(user_project: Option<String>) -> Result<Self> {
        use yup_oauth2::authenticator::ApplicationDefaultCredentialsTypes;

        let opts = ApplicationDefaultCredentialsFlowOpts::default();
        let auth = match ApplicationDefaultCredentialsAuthenticator::builder(opts).await {
            ApplicationDefaultCredentialsTypes::InstanceMetadata(builder) => builder.build().await,
            ApplicationDefaultCredentialsTypes::ServiceAccount(builder) => builder.build().await,
        }
        .map_err(|e| {
            Error::config(format!(
                "Failed to load application default credentials. Set GOOGLE_APPLICATION_CREDENTIALS \
                or run on GCP with a service account: {}",
                e
            ))
        })?;

        debug!(user_project = ?user_project, "Using application default credentials");
        Ok(Self { auth, user_project })
    }
}

#[async_trait]
impl CallCredentials for GcpCredentials {
    async fn metadata(&self) -> Result<Vec<MetadataPair>> {
        let token = self
            .auth
            .token(&[CLOUD_PLATFORM_SCOPE])
            .await
            .map_err(|e| Error::config(format!("Failed to fetch access token: {}", e)))?;

        let token = token
            .token()
            .ok_or_else(|| Error::config("Authenticator returned an empty access token"))?;

        let mut pairs = vec![("authorization", format!("Bearer {}", token))];
        if let Some(project) = &self.user_project {
            pairs.push((USER_PROJECT_HEADER, project.clone()));
        }
        Ok(pairs)
    }
}
