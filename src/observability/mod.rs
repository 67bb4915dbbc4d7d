//! # Observability Infrastructure
//!
//! Structured logging for the CSDS client.

pub mod logging;

pub use logging::{init_logging, log_options, LogFormat};
