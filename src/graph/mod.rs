//! # Configuration Graph
//!
//! Reconstructs the Listener → Route → Cluster → Endpoint dependency graph
//! from a configuration dump and renders it as Graphviz DOT.

pub mod extract;
pub mod model;
pub mod payload;
pub mod render;
pub mod visualize;

pub use extract::extract;
pub use model::{GraphBuilder, GraphModel, NodeKind};
pub use payload::{PathError, Payload};
pub use render::render;
pub use visualize::{BrowserLauncher, NoBrowser, SystemBrowser, Visualizer, GRAPH_FILE};
