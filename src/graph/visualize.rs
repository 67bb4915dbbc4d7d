//! Visualization side effect: save the DOT graph and open it in a viewer.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, warn};

use crate::graph::{extract, render, Payload};
use crate::{Error, Result};

/// File the graph is written to, relative to the output directory
pub const GRAPH_FILE: &str = "config_graph.dot";

/// Online Graphviz viewer; the DOT text goes in the URL fragment
pub const VIEWER_URL: &str = "http://dreampuf.github.io/GraphvizOnline/#";

/// Opens URLs in the user's browser
pub trait BrowserLauncher: Send + Sync {
    fn open(&self, url: &str) -> Result<()>;
}

/// Launches the platform URL opener
#[derive(Debug, Clone, Default)]
pub struct SystemBrowser;

impl BrowserLauncher for SystemBrowser {
    fn open(&self, url: &str) -> Result<()> {
        let mut command = if cfg!(target_os = "linux") {
            let mut c = Command::new("xdg-open");
            c.arg(url);
            c
        } else if cfg!(target_os = "macos") {
            let mut c = Command::new("open");
            c.arg(url);
            c
        } else if cfg!(target_os = "windows") {
            let mut c = Command::new("rundll32");
            c.args(["url.dll,FileProtocolHandler", url]);
            c
        } else {
            return Err(Error::config("opening a browser is not supported on this platform"));
        };

        command.spawn().map_err(|e| Error::io("failed to launch browser", e))?;
        Ok(())
    }
}

/// Launcher that never opens anything
#[derive(Debug, Clone, Default)]
pub struct NoBrowser;

impl BrowserLauncher for NoBrowser {
    fn open(&self, url: &str) -> Result<()> {
        debug!(len = url.len(), "Browser launch skipped");
        Ok(())
    }
}

/// Writes graphs for dumps and optionally opens them
pub struct Visualizer {
    output_dir: PathBuf,
    launcher: Box<dyn BrowserLauncher>,
}

impl std::fmt::Debug for Visualizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Visualizer").field("output_dir", &self.output_dir).finish()
    }
}

impl Default for Visualizer {
    fn default() -> Self {
        Self::new(".", Box::new(SystemBrowser))
    }
}

impl Visualizer {
    pub fn new<P: Into<PathBuf>>(output_dir: P, launcher: Box<dyn BrowserLauncher>) -> Self {
        Self { output_dir: output_dir.into(), launcher }
    }

    pub fn graph_path(&self) -> PathBuf {
        self.output_dir.join(GRAPH_FILE)
    }

    /// Extract and render `dump`, save it, and open the viewer unless
    /// `monitor` is set. Returns the rendered DOT text.
    pub fn visualize<W: Write>(&self, dump: &Payload, monitor: bool, out: &mut W) -> Result<String> {
        let model = extract(dump)?;
        let dot = render(&model);

        let path = self.graph_path();
        save_graph(&path, &dot)?;
        writeln!(out, "Config graph has been saved to {}", GRAPH_FILE)
            .map_err(|e| Error::io("failed to write to output", e))?;

        if !monitor {
            if let Err(err) = self.launcher.open(&format!("{}{}", VIEWER_URL, dot)) {
                warn!(error = %err, "Could not open graph viewer");
            }
        }

        Ok(dot)
    }
}

/// Write DOT text to `path`
pub fn save_graph(path: &Path, dot: &str) -> Result<()> {
    std::fs::write(path, dot).map_err(|e| Error::io_path("write", path, e))?;
    debug!(path = %path.display(), bytes = dot.len(), "Saved config graph");
    Ok(())
}
