//! Status table and detailed dump output.
//!
//! [`StatusPrinter`] owns the output sink, the `Any` type registry and the
//! dump/visualization settings for one run. Each response prints a summary
//! table; when any reported client carries configuration, the canonical JSON
//! dump is written once for the whole response.

use std::io::Write;

use envoy_types::pb::envoy::service::status::v3::ClientStatusResponse;
use tracing::debug;

use crate::config::{ClientOptions, DumpTarget};
use crate::csds::canonical::{response_to_json, TypeRegistry};
use crate::csds::classify::{classify, ClientSummary, NodeFilter, NOT_AVAILABLE};
use crate::csds::engine::ResponseSink;
use crate::graph::{Payload, Visualizer};
use crate::{Error, Result};

/// Printed instead of the table when the response lists no clients
pub const NO_CLIENTS: &str = "No xDS clients connected.";

/// What a call to [`StatusPrinter::print_response`] produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PrintOutcome {
    /// Table rows written, continuation rows included
    pub rows: usize,
    /// The detailed dump was written
    pub dumped: bool,
}

fn row(id: &str, stream_type: &str, status: &str) -> String {
    format!("{:<50} {:<30} {:<30} \n", id, stream_type, status)
}

/// Table header line
pub fn header() -> String {
    row("Client ID", "xDS stream type", "Config Status")
}

/// Table rows of one client: the first status inline, the rest in
/// continuation rows with blank id and type columns.
pub fn client_rows(client: &ClientSummary) -> Vec<String> {
    if client.is_unsynced() {
        return vec![row(&client.id, &client.stream_type, NOT_AVAILABLE)];
    }
    client
        .statuses
        .iter()
        .enumerate()
        .map(|(i, status)| {
            let status = status.to_string();
            if i == 0 {
                row(&client.id, &client.stream_type, &status)
            } else {
                row("", "", &status)
            }
        })
        .collect()
}

/// Prints responses for one run
pub struct StatusPrinter<W: Write> {
    out: W,
    registry: TypeRegistry,
    filter: Option<NodeFilter>,
    dump_target: DumpTarget,
    visualizer: Option<Visualizer>,
    monitor: bool,
}

impl<W: Write> std::fmt::Debug for StatusPrinter<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusPrinter")
            .field("filter", &self.filter)
            .field("dump_target", &self.dump_target)
            .field("visualization", &self.visualizer.is_some())
            .field("monitor", &self.monitor)
            .finish()
    }
}

impl<W: Write> StatusPrinter<W> {
    /// Printer with no filter, stdout dump and no visualization
    pub fn new(out: W) -> Self {
        Self {
            out,
            registry: TypeRegistry::envoy(),
            filter: None,
            dump_target: DumpTarget::Stdout,
            visualizer: None,
            monitor: false,
        }
    }

    /// Printer configured from the run options
    pub fn from_options(options: &ClientOptions, out: W) -> Result<Self> {
        let mut printer = Self::new(out)
            .with_dump_target(options.dump_target.clone())
            .with_monitor(options.is_monitor());
        printer.filter = options.node_filter()?;
        if options.visualization {
            printer.visualizer = Some(Visualizer::default());
        }
        Ok(printer)
    }

    pub fn with_filter(mut self, filter: Option<NodeFilter>) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_dump_target(mut self, target: DumpTarget) -> Self {
        self.dump_target = target;
        self
    }

    pub fn with_visualizer(mut self, visualizer: Visualizer) -> Self {
        self.visualizer = Some(visualizer);
        self
    }

    pub fn with_monitor(mut self, monitor: bool) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn with_registry(mut self, registry: TypeRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write(&mut self, text: &str) -> Result<()> {
        self.out
            .write_all(text.as_bytes())
            .map_err(|e| Error::io("failed to write to output", e))
    }

    /// Print the summary table and, when warranted, the detailed dump
    pub fn print_response(&mut self, response: &ClientStatusResponse) -> Result<PrintOutcome> {
        let mut outcome = PrintOutcome::default();

        if response.config.is_empty() {
            self.write(&format!("{}\n", NO_CLIENTS))?;
            return Ok(outcome);
        }

        let classification = classify(response, self.filter.as_ref());
        self.write(&header())?;
        for client in &classification.clients {
            for line in client_rows(client) {
                self.write(&line)?;
                outcome.rows += 1;
            }
        }
        self.out.flush().map_err(|e| Error::io("failed to flush output", e))?;

        if classification.has_detail {
            self.print_detail(response)?;
            outcome.dumped = true;
        }

        debug!(
            clients = classification.clients.len(),
            rows = outcome.rows,
            dumped = outcome.dumped,
            "Printed status response"
        );
        Ok(outcome)
    }

    /// Response restricted to the clients that pass the filter
    fn filtered(&self, response: &ClientStatusResponse) -> ClientStatusResponse {
        let mut kept = response.clone();
        if let Some(filter) = &self.filter {
            kept.config.retain(|config| {
                filter.matches(config.node.as_ref().map(|n| n.id.as_str()).unwrap_or_default())
            });
        }
        kept
    }

    fn print_detail(&mut self, response: &ClientStatusResponse) -> Result<()> {
        let tree = response_to_json(&self.registry, &self.filtered(response))?;
        let text = serde_json::to_string_pretty(&tree)
            .map_err(|e| Error::serialization("canonical dump", e))?;

        match &self.dump_target {
            DumpTarget::Stdout => {
                self.write(&format!("Detailed Config:\n{}\n", text))?;
            }
            DumpTarget::File(path) => {
                let path = path.clone();
                std::fs::write(&path, &text).map_err(|e| Error::io_path("write", &path, e))?;
                self.write(&format!("Config has been saved to {}\n", path.display()))?;
            }
        }

        if let Some(visualizer) = &self.visualizer {
            visualizer.visualize(&Payload::from(tree), self.monitor, &mut self.out)?;
        }
        Ok(())
    }
}

impl<W: Write> ResponseSink for StatusPrinter<W> {
    fn deliver(&mut self, response: &ClientStatusResponse) -> Result<()> {
        self.print_response(response).map(|_| ())
    }
}
