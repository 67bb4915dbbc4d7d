//! Schema generations of the status protocol.
//!
//! The v2 and v3 `ClientStatusDiscoveryService` messages agree on every field
//! number the client reads or writes, so both generations share the v3 prost
//! types. Only the gRPC method path and the request node identity differ.

use envoy_types::pb::envoy::config::core::v3::Node;
use envoy_types::pb::envoy::service::status::v3::ClientStatusRequest;
use uuid::Uuid;

use crate::config::ApiVersion;
use crate::csds::matcher::{NetworkScope, NodeScope, ResolvedMatchers};

const V2_STREAM_PATH: &str =
    "/envoy.service.status.v2.ClientStatusDiscoveryService/StreamClientStatus";
const V3_STREAM_PATH: &str =
    "/envoy.service.status.v3.ClientStatusDiscoveryService/StreamClientStatus";

/// Per-generation details of the status protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusSchema {
    version: ApiVersion,
}

impl StatusSchema {
    pub fn new(version: ApiVersion) -> Self {
        Self { version }
    }

    pub fn version(&self) -> ApiVersion {
        self.version
    }

    /// Fully qualified path of the bidirectional `StreamClientStatus` method
    pub fn stream_path(&self) -> &'static str {
        match self.version {
            ApiVersion::V2 => V2_STREAM_PATH,
            ApiVersion::V3 => V3_STREAM_PATH,
        }
    }

    /// Build the request sent on every poll of a run.
    ///
    /// v3 requests on a scoped platform identify the client itself with a
    /// fresh node id; v2 requests only carry the matchers.
    pub fn build_request(&self, resolved: &ResolvedMatchers) -> ClientStatusRequest {
        let node = match (self.version, resolved.scope.as_ref()) {
            (ApiVersion::V3, Some(scope)) => Some(Node {
                id: request_node_id(scope, Uuid::new_v4()),
                ..Default::default()
            }),
            _ => None,
        };

        ClientStatusRequest {
            node_matchers: resolved.to_proto(),
            node,
            ..Default::default()
        }
    }
}

/// Node id of the requesting client: `projects/{p}/networks/{n}/nodes/{uuid}`.
/// Mesh-scoped requests use `mesh:{scope}` as the network segment.
pub fn request_node_id(scope: &NodeScope, id: Uuid) -> String {
    let network = match &scope.network {
        NetworkScope::Network(name) => name.clone(),
        NetworkScope::MeshScope(name) => format!("mesh:{}", name),
    };
    format!("projects/{}/networks/{}/nodes/{}", scope.project_number, network, id)
}
