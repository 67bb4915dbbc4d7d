//! Builders for `ClientStatusResponse` messages.

use envoy_types::pb::envoy::admin::v3::{
    clusters_config_dump::DynamicCluster, listeners_config_dump::DynamicListener,
    listeners_config_dump::DynamicListenerState, routes_config_dump::DynamicRouteConfig,
    ClustersConfigDump, ListenersConfigDump, RoutesConfigDump,
};
use envoy_types::pb::envoy::config::cluster::v3::Cluster;
use envoy_types::pb::envoy::config::core::v3::Node;
use envoy_types::pb::envoy::config::listener::v3::{filter, Filter, FilterChain, Listener};
use envoy_types::pb::envoy::config::route::v3::{
    route, route_action, weighted_cluster, Route, RouteAction, RouteConfiguration, VirtualHost,
    WeightedCluster,
};
use envoy_types::pb::envoy::extensions::filters::network::http_connection_manager::v3::{
    http_connection_manager::RouteSpecifier, HttpConnectionManager, Rds,
};
use envoy_types::pb::envoy::service::status::v3::{
    per_xds_config, ClientConfig, ClientStatusResponse, ConfigStatus, PerXdsConfig,
};
use envoy_types::pb::google::protobuf::{value::Kind, Any, Struct, UInt32Value, Value};
use prost::Message;

use csds_client::csds::classify::STREAM_TYPE_KEY;

const TYPE_URL_PREFIX: &str = "type.googleapis.com/";

pub fn any_of<M: Message>(name: &str, message: &M) -> Any {
    Any { type_url: format!("{}{}", TYPE_URL_PREFIX, name), value: message.encode_to_vec() }
}

pub fn node(id: &str, stream_type: &str) -> Node {
    let metadata = Struct {
        fields: [(
            STREAM_TYPE_KEY.to_string(),
            Value { kind: Some(Kind::StringValue(stream_type.to_string())) },
        )]
        .into_iter()
        .collect(),
    };
    Node { id: id.to_string(), metadata: Some(metadata), ..Default::default() }
}

/// Connected client that has not synced anything
pub fn unsynced_client(id: &str) -> ClientConfig {
    ClientConfig { node: Some(node(id, "ADS")), ..Default::default() }
}

pub fn response(clients: Vec<ClientConfig>) -> ClientStatusResponse {
    ClientStatusResponse { config: clients, ..Default::default() }
}

pub fn per_xds(status: ConfigStatus, dump: per_xds_config::PerXdsConfig) -> PerXdsConfig {
    PerXdsConfig { status: status as i32, per_xds_config: Some(dump), ..Default::default() }
}

/// Listener whose filters each reference one RDS route configuration
pub fn listener(name: &str, routes: &[&str]) -> Listener {
    let filters = routes
        .iter()
        .map(|route_name| Filter {
            name: "envoy.filters.network.http_connection_manager".into(),
            config_type: Some(filter::ConfigType::TypedConfig(any_of(
                "envoy.extensions.filters.network.http_connection_manager.v3.HttpConnectionManager",
                &HttpConnectionManager {
                    stat_prefix: "ingress".into(),
                    route_specifier: Some(RouteSpecifier::Rds(Rds {
                        route_config_name: route_name.to_string(),
                        ..Default::default()
                    })),
                    ..Default::default()
                },
            ))),
        })
        .collect();

    Listener {
        name: name.into(),
        filter_chains: vec![FilterChain { filters, ..Default::default() }],
        ..Default::default()
    }
}

/// Route configuration with one route; several clusters become weighted
pub fn route_config(name: &str, clusters: &[&str]) -> RouteConfiguration {
    let specifier = match clusters {
        [single] => route_action::ClusterSpecifier::Cluster(single.to_string()),
        many => route_action::ClusterSpecifier::WeightedClusters(WeightedCluster {
            clusters: many
                .iter()
                .map(|c| weighted_cluster::ClusterWeight {
                    name: c.to_string(),
                    weight: Some(UInt32Value { value: 100 / many.len() as u32 }),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }),
    };

    RouteConfiguration {
        name: name.into(),
        virtual_hosts: vec![VirtualHost {
            name: format!("{}-vh", name),
            domains: vec!["*".into()],
            routes: vec![Route {
                action: Some(route::Action::Route(RouteAction {
                    cluster_specifier: Some(specifier),
                    ..Default::default()
                })),
                ..Default::default()
            }],
            ..Default::default()
        }],
        ..Default::default()
    }
}

pub fn cluster(name: &str) -> Cluster {
    Cluster { name: name.into(), ..Default::default() }
}

pub fn listeners_dump(listeners: &[Listener]) -> per_xds_config::PerXdsConfig {
    per_xds_config::PerXdsConfig::ListenerConfig(ListenersConfigDump {
        dynamic_listeners: listeners
            .iter()
            .map(|l| DynamicListener {
                name: l.name.clone(),
                active_state: Some(DynamicListenerState {
                    listener: Some(any_of("envoy.config.listener.v3.Listener", l)),
                    ..Default::default()
                }),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    })
}

pub fn routes_dump(configs: &[RouteConfiguration]) -> per_xds_config::PerXdsConfig {
    per_xds_config::PerXdsConfig::RouteConfig(RoutesConfigDump {
        dynamic_route_configs: configs
            .iter()
            .map(|c| DynamicRouteConfig {
                route_config: Some(any_of("envoy.config.route.v3.RouteConfiguration", c)),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    })
}

pub fn clusters_dump(clusters: &[Cluster]) -> per_xds_config::PerXdsConfig {
    per_xds_config::PerXdsConfig::ClusterConfig(ClustersConfigDump {
        dynamic_active_clusters: clusters
            .iter()
            .map(|c| DynamicCluster {
                cluster: Some(any_of("envoy.config.cluster.v3.Cluster", c)),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    })
}

/// One client holding L0 -> {R0, R1}, R0 -> {C0, C1}, R1 -> C1
pub fn layered_client(id: &str) -> ClientConfig {
    ClientConfig {
        node: Some(node(id, "ADS")),
        xds_config: vec![
            per_xds(ConfigStatus::Synced, listeners_dump(&[listener("L0", &["R0", "R1"])])),
            per_xds(
                ConfigStatus::Synced,
                routes_dump(&[route_config("R0", &["C0", "C1"]), route_config("R1", &["C1"])]),
            ),
            per_xds(ConfigStatus::Synced, clusters_dump(&[cluster("C0"), cluster("C1")])),
        ],
        ..Default::default()
    }
}
