//! Relationship extraction from a canonical configuration dump.
//!
//! Walks the `config[].xdsConfig[]` and `config[].genericXdsConfigs[]` branches
//! of a dump and records Listener→Route→Cluster→Endpoint references. Absent
//! branches are empty; a present branch of the wrong shape is an error.

use tracing::debug;

use crate::csds::classify::ResourceKind;
use crate::graph::model::{GraphBuilder, GraphModel, NodeKind};
use crate::graph::payload::Payload;
use crate::Result;

/// Build the dependency graph of a dump
pub fn extract(payload: &Payload) -> Result<GraphModel> {
    let mut builder = GraphBuilder::new();

    for config in payload.list_at(&["config"])? {
        for per_xds in config.list_at(&["xdsConfig"])? {
            walk_per_xds(&mut builder, per_xds)?;
        }
        for generic in config.list_at(&["genericXdsConfigs"])? {
            walk_generic(&mut builder, generic)?;
        }
    }

    let model = builder.finish();
    debug!(nodes = model.node_count(), edges = model.edge_count(), "Extracted config graph");
    Ok(model)
}

/// Entries of every list held by a dump branch (`dynamicListeners`,
/// `staticListeners`, ...). Scalar members such as `versionInfo` are skipped.
fn dump_entries(dump: &Payload) -> Result<Vec<&Payload>> {
    let mut entries = Vec::new();
    for value in dump.as_map()?.values() {
        if let Payload::List(items) = value {
            entries.extend(items.iter());
        }
    }
    Ok(entries)
}

fn walk_per_xds(builder: &mut GraphBuilder, per_xds: &Payload) -> Result<()> {
    for (key, dump) in per_xds.as_map()? {
        match key.as_str() {
            "listenerConfig" => {
                for entry in dump_entries(dump)? {
                    let listener = match entry.node_at(&["activeState", "listener"])? {
                        Some(listener) => Some(listener),
                        None => entry.node_at(&["listener"])?,
                    };
                    if let Some(listener) = listener {
                        walk_listener(builder, listener)?;
                    }
                }
            }
            "routeConfig" => {
                for entry in dump_entries(dump)? {
                    if let Some(route_config) = entry.node_at(&["routeConfig"])? {
                        walk_route_config(builder, route_config)?;
                    }
                }
            }
            "clusterConfig" => {
                for entry in dump_entries(dump)? {
                    if let Some(cluster) = entry.node_at(&["cluster"])? {
                        walk_cluster(builder, cluster)?;
                    }
                }
            }
            "endpointConfig" => {
                for entry in dump_entries(dump)? {
                    if let Some(endpoints) = entry.node_at(&["endpointConfig"])? {
                        walk_endpoints(builder, endpoints)?;
                    }
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn walk_generic(builder: &mut GraphBuilder, generic: &Payload) -> Result<()> {
    let Some(type_url) = generic.str_at(&["typeUrl"])? else {
        return Ok(());
    };
    let Some(resource) = generic.node_at(&["xdsConfig"])? else {
        return Ok(());
    };

    match ResourceKind::from_type_url(type_url) {
        Some(ResourceKind::Listener) => walk_listener(builder, resource),
        Some(ResourceKind::Route) => walk_route_config(builder, resource),
        Some(ResourceKind::Cluster) => walk_cluster(builder, resource),
        Some(ResourceKind::Endpoint) => walk_endpoints(builder, resource),
        Some(ResourceKind::ScopedRoute) | None => Ok(()),
    }
}

/// Route names referenced by a network filter or API listener config
fn walk_connection_manager(
    builder: &mut GraphBuilder,
    listener: &str,
    hcm: &Payload,
) -> Result<()> {
    if let Some(route_name) = hcm.str_at(&["rds", "routeConfigName"])? {
        builder.reference(NodeKind::Listener, listener, route_name);
    }
    if let Some(inline) = hcm.node_at(&["routeConfig"])? {
        walk_route_config(builder, inline)?;
        if let Some(route_name) = inline.str_at(&["name"])? {
            builder.reference(NodeKind::Listener, listener, route_name);
        }
    }
    Ok(())
}

fn walk_listener(builder: &mut GraphBuilder, listener: &Payload) -> Result<()> {
    let Some(name) = listener.str_at(&["name"])? else {
        return Ok(());
    };
    builder.declare(NodeKind::Listener, name);

    for chain in listener.list_at(&["filterChains"])? {
        for filter in chain.list_at(&["filters"])? {
            if let Some(typed_config) = filter.node_at(&["typedConfig"])? {
                walk_connection_manager(builder, name, typed_config)?;
            }
        }
    }

    if let Some(api_listener) = listener.node_at(&["apiListener", "apiListener"])? {
        walk_connection_manager(builder, name, api_listener)?;
    }
    Ok(())
}

fn walk_route_config(builder: &mut GraphBuilder, route_config: &Payload) -> Result<()> {
    let Some(name) = route_config.str_at(&["name"])? else {
        return Ok(());
    };
    builder.declare(NodeKind::Route, name);

    for host in route_config.list_at(&["virtualHosts"])? {
        for route in host.list_at(&["routes"])? {
            if let Some(weighted) = route.node_at(&["route", "weightedClusters"])? {
                for cluster in weighted.list_at(&["clusters"])? {
                    if let Some(cluster_name) = cluster.str_at(&["name"])? {
                        builder.reference(NodeKind::Route, name, cluster_name);
                    }
                }
            } else if let Some(cluster_name) = route.str_at(&["route", "cluster"])? {
                builder.reference(NodeKind::Route, name, cluster_name);
            }
        }
    }
    Ok(())
}

fn walk_cluster(builder: &mut GraphBuilder, cluster: &Payload) -> Result<()> {
    if let Some(name) = cluster.str_at(&["name"])? {
        builder.declare(NodeKind::Cluster, name);
    }
    Ok(())
}

fn walk_endpoints(builder: &mut GraphBuilder, endpoints: &Payload) -> Result<()> {
    if let Some(cluster_name) = endpoints.str_at(&["clusterName"])? {
        builder.declare_endpoints(cluster_name);
    }
    Ok(())
}
