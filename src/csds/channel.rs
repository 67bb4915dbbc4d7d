//! Transport channel to the control plane.

use tonic::transport::{Channel, ClientTlsConfig, Endpoint};
use tracing::{debug, error};

use crate::config::{AuthMode, ClientOptions};
use crate::{Error, Result};

/// Endpoint URI for the configured service address.
///
/// Bare `host:port` addresses get `https://`, or `http://` in insecure mode.
pub fn endpoint_uri(options: &ClientOptions) -> String {
    let uri = options.service_uri.trim();
    if uri.contains("://") {
        return uri.to_string();
    }
    match options.auth_mode {
        AuthMode::Insecure => format!("http://{}", uri),
        AuthMode::Auto | AuthMode::Jwt => format!("https://{}", uri),
    }
}

/// Establish the channel. Failures are surfaced as [`Error::ConnectFailed`].
pub async fn connect(options: &ClientOptions) -> Result<Channel> {
    let uri = endpoint_uri(options);
    let target = options.service_uri.clone();

    debug!(
        uri = %uri,
        timeout_ms = options.timeout.as_millis() as u64,
        "Connecting to control plane"
    );

    let mut endpoint = Endpoint::from_shared(uri.clone())
        .map_err(|e| Error::connect(&target, format!("Invalid URI: {}", e)))?
        .connect_timeout(options.timeout);

    if uri.starts_with("https://") {
        endpoint = endpoint
            .tls_config(ClientTlsConfig::new().with_native_roots())
            .map_err(|e| Error::connect(&target, format!("TLS config error: {}", e)))?;
    }

    endpoint.connect().await.map_err(|e| {
        error!(uri = %uri, error = %e, "Failed to connect to control plane");
        Error::connect(&target, e.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_endpoint_uri_scheme() {
        let options = ClientOptions::default();
        assert_eq!(endpoint_uri(&options), "https://trafficdirector.googleapis.com:443");

        let options = ClientOptions {
            service_uri: "localhost:18000".into(),
            auth_mode: AuthMode::Insecure,
            ..Default::default()
        };
        assert_eq!(endpoint_uri(&options), "http://localhost:18000");

        let options =
            ClientOptions { service_uri: "http://cp:9000".into(), ..Default::default() };
        assert_eq!(endpoint_uri(&options), "http://cp:9000");
    }

    #[tokio::test]
    async fn test_connect_failure_is_connect_failed() {
        let options = ClientOptions {
            service_uri: "127.0.0.1:1".into(),
            auth_mode: AuthMode::Insecure,
            timeout: Duration::from_millis(200),
            ..Default::default()
        };
        assert!(matches!(connect(&options).await, Err(Error::ConnectFailed { .. })));
    }
}
