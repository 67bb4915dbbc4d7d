//! # Client Status Discovery
//!
//! Queries a control plane over the `ClientStatusDiscoveryService` stream and
//! reports which downstream clients it knows about and how far their
//! configuration has synced.
//!
//! ```text
//! MatcherResolver -> StatusSchema -> StreamEngine -> StatusPrinter -> graph
//!                                         |
//!                                   GrpcTransport (channel + credentials)
//! ```

pub mod canonical;
pub mod channel;
pub mod classify;
pub mod engine;
pub mod matcher;
pub mod printer;
pub mod schema;
pub mod transport;

use std::io::Write;

use tokio::sync::watch;
use tracing::Instrument;

use crate::auth::credentials_for;
use crate::config::ClientOptions;
use crate::csds_span;
use crate::Result;

pub use engine::{EngineState, ResponseSink, RetryPolicy, RunSummary, StreamEngine};
pub use matcher::{MatcherResolver, NodeMatcher, ResolvedMatchers};
pub use printer::StatusPrinter;
pub use schema::StatusSchema;
pub use transport::{GrpcTransport, StatusStream, StatusTransport};

/// Resolve the request, connect, and run the engine with a printer on `out`
pub async fn run_status<W: Write>(
    options: &ClientOptions,
    out: W,
    shutdown: watch::Receiver<bool>,
) -> Result<RunSummary> {
    options.validate()?;
    let span = csds_span!(options.service_uri, options.api_version, monitor = options.is_monitor());

    async move {
        let resolved = MatcherResolver::new(options.platform)
            .resolve(options.request_file.as_deref(), options.request_yaml.as_deref())?;
        let schema = StatusSchema::new(options.api_version);
        let request = schema.build_request(&resolved);

        let credentials = credentials_for(options, resolved.scope.as_ref()).await?;
        let channel = channel::connect(options).await?;
        let transport = GrpcTransport::new(channel, schema, credentials);

        let mut printer = StatusPrinter::from_options(options, out)?;
        let mut engine = StreamEngine::from_options(transport, options);
        engine.run(request, &mut printer, shutdown).await
    }
    .instrument(span)
    .await
}
