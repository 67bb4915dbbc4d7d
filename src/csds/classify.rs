//! Response classification.
//!
//! Reduces a `ClientStatusResponse` to one [`ClientSummary`] per reported
//! client: its id, its xDS stream type and the sync state of each resource
//! kind. Clients whose id does not pass the [`NodeFilter`] are dropped.

use std::fmt;

use envoy_types::pb::envoy::config::core::v3::Node;
use envoy_types::pb::envoy::service::status::v3::{
    per_xds_config, ClientConfig, ClientStatusResponse, ConfigStatus, PerXdsConfig,
};
use envoy_types::pb::google::protobuf::value::Kind;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Node metadata key the control plane uses to report the stream type
pub const STREAM_TYPE_KEY: &str = "XDS_STREAM_TYPE";

/// Status shown for a connected client with no resource statuses
pub const NOT_AVAILABLE: &str = "N/A";

/// How the node-id filter pattern is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    Prefix,
    Suffix,
    Regex,
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterMode::Prefix => f.write_str("prefix"),
            FilterMode::Suffix => f.write_str("suffix"),
            FilterMode::Regex => f.write_str("regex"),
        }
    }
}

/// Client-side filter on reported node ids
#[derive(Debug, Clone)]
pub struct NodeFilter {
    mode: FilterMode,
    pattern: String,
    regex: Option<Regex>,
}

impl NodeFilter {
    /// Build a filter; regex patterns are compiled up front.
    pub fn new<S: Into<String>>(mode: FilterMode, pattern: S) -> Result<Self> {
        let pattern = pattern.into();
        let regex = match mode {
            FilterMode::Regex if !pattern.is_empty() => Some(Regex::new(&pattern)?),
            _ => None,
        };
        Ok(Self { mode, pattern, regex })
    }

    /// An empty pattern passes every id. Regex matches anywhere in the id.
    pub fn matches(&self, id: &str) -> bool {
        if self.pattern.is_empty() {
            return true;
        }
        match self.mode {
            FilterMode::Prefix => id.starts_with(&self.pattern),
            FilterMode::Suffix => id.ends_with(&self.pattern),
            FilterMode::Regex => self.regex.as_ref().map(|re| re.is_match(id)).unwrap_or(true),
        }
    }
}

/// Resource kind of a per-resource status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Listener,
    Route,
    ScopedRoute,
    Cluster,
    Endpoint,
}

impl ResourceKind {
    /// Short xDS label used in the summary table
    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::Listener => "LDS",
            ResourceKind::Route => "RDS",
            ResourceKind::ScopedRoute => "SRDS",
            ResourceKind::Cluster => "CDS",
            ResourceKind::Endpoint => "EDS",
        }
    }

    /// Kind of a resource type URL, v2 or v3
    pub fn from_type_url(type_url: &str) -> Option<Self> {
        let message = type_url.rsplit(['/', '.']).next()?;
        match message {
            "Listener" => Some(ResourceKind::Listener),
            "RouteConfiguration" => Some(ResourceKind::Route),
            "ScopedRouteConfiguration" => Some(ResourceKind::ScopedRoute),
            "Cluster" => Some(ResourceKind::Cluster),
            "ClusterLoadAssignment" => Some(ResourceKind::Endpoint),
            _ => None,
        }
    }

    fn of(config: &per_xds_config::PerXdsConfig) -> Self {
        use per_xds_config::PerXdsConfig as Dump;
        match config {
            Dump::ListenerConfig(_) => ResourceKind::Listener,
            Dump::ClusterConfig(_) => ResourceKind::Cluster,
            Dump::RouteConfig(_) => ResourceKind::Route,
            Dump::ScopedRouteConfig(_) => ResourceKind::ScopedRoute,
            Dump::EndpointConfig(_) => ResourceKind::Endpoint,
        }
    }
}

/// Sync state of one resource kind on one client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceStatus {
    pub kind: ResourceKind,
    pub state: String,
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}   {}", self.kind.label(), self.state)
    }
}

/// Summary of one reported client
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClientSummary {
    pub id: String,
    pub stream_type: String,
    pub statuses: Vec<ResourceStatus>,
}

impl ClientSummary {
    /// Client is connected but has not synced any resource
    pub fn is_unsynced(&self) -> bool {
        self.statuses.is_empty()
    }
}

/// Result of classifying one response
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Classification {
    pub clients: Vec<ClientSummary>,
    /// Any kept client carried a configuration blob
    pub has_detail: bool,
}

fn state_name(raw: i32) -> String {
    ConfigStatus::try_from(raw).unwrap_or(ConfigStatus::Unknown).as_str_name().to_string()
}

fn stream_type(node: &Node) -> String {
    node.metadata
        .as_ref()
        .and_then(|metadata| metadata.fields.get(STREAM_TYPE_KEY))
        .and_then(|value| match &value.kind {
            Some(Kind::StringValue(s)) => Some(s.clone()),
            _ => None,
        })
        .unwrap_or_default()
}

fn per_xds_status(config: &PerXdsConfig) -> Option<ResourceStatus> {
    config.per_xds_config.as_ref().map(|dump| ResourceStatus {
        kind: ResourceKind::of(dump),
        state: state_name(config.status),
    })
}

fn summarize(config: &ClientConfig) -> (ClientSummary, bool) {
    let (id, stream_type) = match &config.node {
        Some(node) => (node.id.clone(), stream_type(node)),
        None => (String::new(), String::new()),
    };

    let mut statuses: Vec<ResourceStatus> =
        config.xds_config.iter().filter_map(per_xds_status).collect();
    statuses.extend(config.generic_xds_configs.iter().filter_map(|generic| {
        ResourceKind::from_type_url(&generic.type_url)
            .map(|kind| ResourceStatus { kind, state: state_name(generic.config_status) })
    }));

    let has_detail = config.xds_config.iter().any(|c| c.per_xds_config.is_some())
        || config.generic_xds_configs.iter().any(|c| c.xds_config.is_some());

    (ClientSummary { id, stream_type, statuses }, has_detail)
}

/// Classify a response, dropping clients rejected by `filter`
pub fn classify(response: &ClientStatusResponse, filter: Option<&NodeFilter>) -> Classification {
    let mut classification = Classification::default();

    for config in &response.config {
        let (summary, has_detail) = summarize(config);
        if let Some(filter) = filter {
            if !filter.matches(&summary.id) {
                continue;
            }
        }
        classification.has_detail |= has_detail;
        classification.clients.push(summary);
    }

    classification
}
