//! # Error Handling
//!
//! Error taxonomy for the CSDS client. Every fallible operation in the crate
//! returns [`Result`]; only [`Error::TransientProtocolReject`] is retried (by the
//! streaming engine), everything else propagates to the caller unchanged.

/// Marker the control plane places in the status message when a stream is
/// rejected by its RPC security policy. Such rejections are recoverable.
pub const TRANSIENT_REJECT_MARKER: &str = "RpcSecurityPolicy";

/// Custom result type for CSDS client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the CSDS client
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Neither a request file nor an inline request was supplied
    #[error("missing request yaml: provide --request-file and/or --request-yaml")]
    MissingInput,

    /// A platform-mandatory node metadata key is absent or empty
    #[error("missing field {key} in NodeMatcher")]
    MissingRequiredField { key: String },

    /// Two mutually exclusive node metadata keys were both supplied
    #[error("NodeMatcher must not set both {first} and {second}")]
    ConflictingFields { first: String, second: String },

    /// Platform is not one of the supported values
    #[error("{0} platform is not supported, list of supported platforms: gcp, generic")]
    UnsupportedPlatform(String),

    /// Invalid or inconsistent configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Establishing the transport channel failed (never retried)
    #[error("Failed to connect to {target}: {message}")]
    ConnectFailed { target: String, message: String },

    /// Recoverable policy rejection from the control plane
    #[error("Stream rejected by control plane after {attempts} attempt(s): {message}")]
    TransientProtocolReject { message: String, attempts: u32 },

    /// Any other gRPC failure on the stream
    #[error("Protocol error: {0}")]
    Protocol(#[from] tonic::Status),

    /// Malformed request or response payload
    #[error("Serialization error: {context}: {message}")]
    Serialization { context: String, message: String },

    /// File read/write failure
    #[error("I/O error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Invalid node-id filter expression
    #[error("Invalid filter pattern: {0}")]
    Regex(#[from] regex::Error),
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a connect error for the given target
    pub fn connect<T: Into<String>, S: Into<String>>(target: T, message: S) -> Self {
        Self::ConnectFailed { target: target.into(), message: message.into() }
    }

    /// Create a serialization error with context
    pub fn serialization<C: Into<String>, E: std::fmt::Display>(context: C, err: E) -> Self {
        Self::Serialization { context: context.into(), message: err.to_string() }
    }

    /// Create an I/O error with context
    pub fn io<C: Into<String>>(context: C, source: std::io::Error) -> Self {
        Self::Io { context: context.into(), source }
    }

    /// Create an I/O error for an operation on a path
    pub fn io_path(action: &str, path: &std::path::Path, source: std::io::Error) -> Self {
        Self::io(format!("failed to {} {}", action, path.display()), source)
    }

    /// Whether this error is the recoverable policy rejection that warrants
    /// reopening the stream.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Protocol(status) => status.message().contains(TRANSIENT_REJECT_MARKER),
            Self::TransientProtocolReject { .. } => true,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization("json", err)
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Self::serialization("yaml", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_rejection_is_transient() {
        let err = Error::Protocol(tonic::Status::permission_denied(
            "denied by RpcSecurityPolicy: rate exceeded",
        ));
        assert!(err.is_transient());
    }

    #[test]
    fn test_other_status_is_fatal() {
        let err = Error::Protocol(tonic::Status::unavailable("connection reset"));
        assert!(!err.is_transient());
        assert!(!Error::MissingInput.is_transient());
    }

    #[test]
    fn test_error_messages() {
        let err = Error::MissingRequiredField { key: "TRAFFICDIRECTOR_NETWORK_NAME".into() };
        assert_eq!(err.to_string(), "missing field TRAFFICDIRECTOR_NETWORK_NAME in NodeMatcher");

        let err = Error::connect("localhost:1", "refused");
        assert_eq!(err.to_string(), "Failed to connect to localhost:1: refused");
    }
}
