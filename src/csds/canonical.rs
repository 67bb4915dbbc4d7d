//! Canonical JSON encoding of status responses.
//!
//! Produces the proto3 JSON shape of a `ClientStatusResponse` (lowerCamelCase
//! keys, default values omitted, enums by name, timestamps in RFC 3339).
//! Resources wrapped in `google.protobuf.Any` are expanded through a
//! [`TypeRegistry`]; type URLs it does not know are emitted as
//! `{"@type": ..., "value": <base64>}`.
//!
//! Expanded payloads list the fields an operator reads when inspecting a
//! client and that the relationship extractor walks. Every `Any` also keeps
//! its original bytes under `"value"`, so fields outside the expanded set are
//! never lost from a dump.

use std::collections::HashMap;

use base64::Engine as _;
use chrono::{DateTime, SecondsFormat};
use envoy_types::pb::envoy::admin::v3::{
    ClientResourceStatus, ClustersConfigDump, EndpointsConfigDump, ListenersConfigDump,
    RoutesConfigDump, ScopedRoutesConfigDump,
};
use envoy_types::pb::envoy::config::cluster::v3::{cluster, Cluster};
use envoy_types::pb::envoy::config::core::v3::{
    address, socket_address, Address, HealthStatus, Node,
};
use envoy_types::pb::envoy::config::endpoint::v3::{lb_endpoint, ClusterLoadAssignment};
use envoy_types::pb::envoy::config::core::v3::transport_socket;
use envoy_types::pb::envoy::config::listener::v3::{filter, listener_filter, Listener};
use envoy_types::pb::envoy::config::route::v3::{
    route, route_action, route_match, RouteConfiguration, VirtualHost,
};
use envoy_types::pb::envoy::extensions::filters::network::http_connection_manager::v3::{
    http_connection_manager, http_filter, HttpConnectionManager,
};
use envoy_types::pb::envoy::service::status::v3::{
    client_config::GenericXdsConfig, per_xds_config, ClientConfig, ClientStatusResponse,
    ConfigStatus, PerXdsConfig,
};
use envoy_types::pb::google::protobuf::{value::Kind, Any, Duration, Struct, Timestamp};
use prost::Message;
use serde_json::{Map, Value};

use crate::{Error, Result};

const TYPE_URL_PREFIX: &str = "type.googleapis.com/";

/// Expands one registered `Any` payload into its JSON fields
type AnyEncoder = fn(&TypeRegistry, &[u8]) -> Result<Map<String, Value>>;

/// Type URL to encoder lookup used when expanding `Any` payloads
#[derive(Clone)]
pub struct TypeRegistry {
    encoders: HashMap<String, AnyEncoder>,
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut urls: Vec<&String> = self.encoders.keys().collect();
        urls.sort();
        f.debug_struct("TypeRegistry").field("type_urls", &urls).finish()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::envoy()
    }
}

impl TypeRegistry {
    /// Registry with no entries; every `Any` is emitted opaque
    pub fn empty() -> Self {
        Self { encoders: HashMap::new() }
    }

    /// Registry for the xDS resource types of both schema generations
    pub fn envoy() -> Self {
        let mut registry = Self::empty();
        for name in ["envoy.config.listener.v3.Listener", "envoy.api.v2.Listener"] {
            registry.register(name, encode_listener);
        }
        for name in ["envoy.config.route.v3.RouteConfiguration", "envoy.api.v2.RouteConfiguration"]
        {
            registry.register(name, encode_route_configuration);
        }
        for name in ["envoy.config.cluster.v3.Cluster", "envoy.api.v2.Cluster"] {
            registry.register(name, encode_cluster);
        }
        for name in [
            "envoy.config.endpoint.v3.ClusterLoadAssignment",
            "envoy.api.v2.ClusterLoadAssignment",
        ] {
            registry.register(name, encode_cluster_load_assignment);
        }
        for name in [
            "envoy.extensions.filters.network.http_connection_manager.v3.HttpConnectionManager",
            "envoy.config.filter.network.http_connection_manager.v2.HttpConnectionManager",
        ] {
            registry.register(name, encode_http_connection_manager);
        }
        for name in
            ["envoy.extensions.filters.http.router.v3.Router", "envoy.config.filter.http.router.v2.Router"]
        {
            registry.register(name, encode_empty);
        }
        registry
    }

    /// Register an encoder for a fully qualified message name
    pub fn register(&mut self, message_name: &str, encoder: AnyEncoder) {
        self.encoders.insert(format!("{}{}", TYPE_URL_PREFIX, message_name), encoder);
    }

    pub fn contains(&self, type_url: &str) -> bool {
        self.encoders.contains_key(type_url)
    }

    /// Encode an `Any`, expanding it when its type URL is registered.
    ///
    /// The original bytes are always kept under `"value"`.
    pub fn encode_any(&self, any: &Any) -> Result<Value> {
        let mut object = match self.encoders.get(&any.type_url) {
            Some(encoder) => encoder(self, &any.value)?,
            None => Map::new(),
        };
        object.insert(
            "value".into(),
            Value::String(base64::engine::general_purpose::STANDARD.encode(&any.value)),
        );
        object.insert("@type".into(), Value::String(any.type_url.clone()));
        Ok(Value::Object(object))
    }
}

/// Builder for JSON objects that omits proto3 default values
#[derive(Default)]
struct Obj(Map<String, Value>);

impl Obj {
    fn new() -> Self {
        Self::default()
    }

    fn str(mut self, key: &str, value: &str) -> Self {
        if !value.is_empty() {
            self.0.insert(key.into(), Value::String(value.to_string()));
        }
        self
    }

    fn strs(mut self, key: &str, values: &[String]) -> Self {
        if !values.is_empty() {
            self.0.insert(key.into(), Value::from(values.to_vec()));
        }
        self
    }

    fn num<N: Into<serde_json::Number> + Default + PartialEq>(mut self, key: &str, value: N) -> Self {
        if value != N::default() {
            self.0.insert(key.into(), Value::Number(value.into()));
        }
        self
    }

    fn flag(mut self, key: &str, value: bool) -> Self {
        if value {
            self.0.insert(key.into(), Value::Bool(true));
        }
        self
    }

    fn opt(mut self, key: &str, value: Option<Value>) -> Self {
        if let Some(value) = value {
            self.0.insert(key.into(), value);
        }
        self
    }

    fn list(mut self, key: &str, values: Vec<Value>) -> Self {
        if !values.is_empty() {
            self.0.insert(key.into(), Value::Array(values));
        }
        self
    }

    fn into_map(self) -> Map<String, Value> {
        self.0
    }

    fn build(self) -> Value {
        Value::Object(self.0)
    }
}

fn decode<M: Message + Default>(context: &str, bytes: &[u8]) -> Result<M> {
    M::decode(bytes).map_err(|e| Error::serialization(context, e))
}

fn encode_opt_any(registry: &TypeRegistry, any: Option<&Any>) -> Result<Option<Value>> {
    any.map(|any| registry.encode_any(any)).transpose()
}

fn encode_anys(registry: &TypeRegistry, anys: &[Any]) -> Result<Vec<Value>> {
    anys.iter().map(|any| registry.encode_any(any)).collect()
}

fn timestamp(ts: Option<&Timestamp>) -> Option<Value> {
    let ts = ts?;
    let nanos = u32::try_from(ts.nanos).unwrap_or(0);
    DateTime::from_timestamp(ts.seconds, nanos)
        .map(|dt| Value::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)))
}

/// Proto3 JSON form of a `Duration`: seconds with 0, 3, 6 or 9 fractional digits
fn duration_json(d: Option<&Duration>) -> Option<Value> {
    let d = d?;
    let negative = d.seconds < 0 || d.nanos < 0;
    let seconds = d.seconds.unsigned_abs();
    let nanos = d.nanos.unsigned_abs();
    let sign = if negative { "-" } else { "" };
    let text = if nanos == 0 {
        format!("{sign}{seconds}s")
    } else if nanos % 1_000_000 == 0 {
        format!("{sign}{seconds}.{:03}s", nanos / 1_000_000)
    } else if nanos % 1_000 == 0 {
        format!("{sign}{seconds}.{:06}s", nanos / 1_000)
    } else {
        format!("{sign}{seconds}.{nanos:09}s")
    };
    Some(Value::String(text))
}

fn config_status(raw: i32) -> &'static str {
    match ConfigStatus::try_from(raw) {
        Ok(ConfigStatus::Unknown) | Err(_) => "",
        Ok(status) => status.as_str_name(),
    }
}

fn resource_status(raw: i32) -> &'static str {
    match ClientResourceStatus::try_from(raw) {
        Ok(ClientResourceStatus::Unknown) | Err(_) => "",
        Ok(status) => status.as_str_name(),
    }
}

/// JSON form of a protobuf `Struct`
pub fn struct_to_json(s: &Struct) -> Value {
    Value::Object(s.fields.iter().map(|(k, v)| (k.clone(), proto_value_to_json(&v.kind))).collect())
}

fn proto_value_to_json(kind: &Option<Kind>) -> Value {
    match kind {
        Some(Kind::NullValue(_)) | None => Value::Null,
        Some(Kind::BoolValue(b)) => Value::Bool(*b),
        Some(Kind::NumberValue(n)) => {
            serde_json::Number::from_f64(*n).map(Value::Number).unwrap_or(Value::Null)
        }
        Some(Kind::StringValue(s)) => Value::String(s.clone()),
        Some(Kind::ListValue(list)) => {
            Value::Array(list.values.iter().map(|v| proto_value_to_json(&v.kind)).collect())
        }
        Some(Kind::StructValue(s)) => struct_to_json(s),
    }
}

fn address_json(address: &Address) -> Value {
    match &address.address {
        Some(address::Address::SocketAddress(socket)) => {
            let mut inner = Obj::new().str("address", &socket.address);
            inner = match &socket.port_specifier {
                Some(socket_address::PortSpecifier::PortValue(port)) => inner.num("portValue", *port),
                Some(socket_address::PortSpecifier::NamedPort(name)) => inner.str("namedPort", name),
                None => inner,
            };
            Obj::new().opt("socketAddress", Some(inner.build())).build()
        }
        Some(address::Address::Pipe(pipe)) => {
            Obj::new().opt("pipe", Some(Obj::new().str("path", &pipe.path).build())).build()
        }
        _ => Obj::new().build(),
    }
}

fn encode_empty(_: &TypeRegistry, _: &[u8]) -> Result<Map<String, Value>> {
    Ok(Map::new())
}

fn encode_listener(registry: &TypeRegistry, bytes: &[u8]) -> Result<Map<String, Value>> {
    let listener: Listener = decode("Listener", bytes)?;

    let mut chains = Vec::with_capacity(listener.filter_chains.len());
    for chain in &listener.filter_chains {
        let mut filters = Vec::with_capacity(chain.filters.len());
        for f in &chain.filters {
            let typed = match &f.config_type {
                Some(filter::ConfigType::TypedConfig(any)) => Some(registry.encode_any(any)?),
                _ => None,
            };
            filters.push(Obj::new().str("name", &f.name).opt("typedConfig", typed).build());
        }
        chains.push(Obj::new().str("name", &chain.name).list("filters", filters).build());
    }

    let api_listener = match listener.api_listener.as_ref() {
        Some(api) => Some(
            Obj::new()
                .opt("apiListener", encode_opt_any(registry, api.api_listener.as_ref())?)
                .build(),
        ),
        None => None,
    };

    let mut listener_filters = Vec::with_capacity(listener.listener_filters.len());
    for f in &listener.listener_filters {
        let typed = match &f.config_type {
            Some(listener_filter::ConfigType::TypedConfig(any)) => Some(registry.encode_any(any)?),
            _ => None,
        };
        listener_filters.push(Obj::new().str("name", &f.name).opt("typedConfig", typed).build());
    }

    Ok(Obj::new()
        .str("name", &listener.name)
        .opt("address", listener.address.as_ref().map(address_json))
        .str("statPrefix", &listener.stat_prefix)
        .list("filterChains", chains)
        .list("listenerFilters", listener_filters)
        .opt("apiListener", api_listener)
        .into_map())
}

fn encode_http_connection_manager(
    registry: &TypeRegistry,
    bytes: &[u8],
) -> Result<Map<String, Value>> {
    use http_connection_manager::RouteSpecifier;

    let hcm: HttpConnectionManager = decode("HttpConnectionManager", bytes)?;

    let mut obj = Obj::new().str("statPrefix", &hcm.stat_prefix);
    obj = match &hcm.route_specifier {
        Some(RouteSpecifier::Rds(rds)) => obj.opt(
            "rds",
            Some(Obj::new().str("routeConfigName", &rds.route_config_name).build()),
        ),
        Some(RouteSpecifier::RouteConfig(config)) => {
            obj.opt("routeConfig", Some(Value::Object(route_configuration_json(config))))
        }
        Some(RouteSpecifier::ScopedRoutes(scoped)) => obj.opt(
            "scopedRoutes",
            Some(Obj::new().str("name", &scoped.name).build()),
        ),
        None => obj,
    };

    let mut http_filters = Vec::with_capacity(hcm.http_filters.len());
    for f in &hcm.http_filters {
        let typed = match &f.config_type {
            Some(http_filter::ConfigType::TypedConfig(any)) => Some(registry.encode_any(any)?),
            _ => None,
        };
        http_filters.push(Obj::new().str("name", &f.name).opt("typedConfig", typed).build());
    }

    Ok(obj.list("httpFilters", http_filters).into_map())
}

fn route_action_json(action: &route::Action) -> Option<(&'static str, Value)> {
    use route_action::ClusterSpecifier;

    match action {
        route::Action::Route(route_action) => {
            let obj = match &route_action.cluster_specifier {
                Some(ClusterSpecifier::Cluster(name)) => Obj::new().str("cluster", name),
                Some(ClusterSpecifier::ClusterHeader(header)) => {
                    Obj::new().str("clusterHeader", header)
                }
                Some(ClusterSpecifier::WeightedClusters(weighted)) => {
                    let clusters = weighted
                        .clusters
                        .iter()
                        .map(|c| {
                            Obj::new()
                                .str("name", &c.name)
                                .opt("weight", c.weight.as_ref().map(|w| Value::from(w.value)))
                                .build()
                        })
                        .collect();
                    Obj::new().opt(
                        "weightedClusters",
                        Some(Obj::new().list("clusters", clusters).build()),
                    )
                }
                _ => Obj::new(),
            };
            let obj = obj
                .str("prefixRewrite", &route_action.prefix_rewrite)
                .opt("timeout", duration_json(route_action.timeout.as_ref()));
            Some(("route", obj.build()))
        }
        route::Action::Redirect(_) => Some(("redirect", Obj::new().build())),
        route::Action::DirectResponse(direct) => {
            Some(("directResponse", Obj::new().num("status", direct.status).build()))
        }
        _ => None,
    }
}

fn route_match_json(m: &route_match::PathSpecifier) -> Value {
    use route_match::PathSpecifier;

    match m {
        PathSpecifier::Prefix(prefix) => json_single("prefix", prefix),
        PathSpecifier::Path(path) => json_single("path", path),
        PathSpecifier::SafeRegex(regex) => Obj::new()
            .opt("safeRegex", Some(Obj::new().str("regex", &regex.regex).build()))
            .build(),
        _ => Obj::new().build(),
    }
}

fn json_single(key: &str, value: &str) -> Value {
    let mut map = Map::new();
    map.insert(key.into(), Value::String(value.to_string()));
    Value::Object(map)
}

fn virtual_host_json(host: &VirtualHost) -> Value {
    let routes = host
        .routes
        .iter()
        .map(|r| {
            let path = r.r#match.as_ref().map(|m| {
                m.path_specifier
                    .as_ref()
                    .map(route_match_json)
                    .unwrap_or_else(|| Value::Object(Map::new()))
            });
            let mut obj = Obj::new().str("name", &r.name).opt("match", path);
            if let Some((key, value)) = r.action.as_ref().and_then(route_action_json) {
                obj = obj.opt(key, Some(value));
            }
            obj.build()
        })
        .collect();

    Obj::new()
        .str("name", &host.name)
        .strs("domains", &host.domains)
        .list("routes", routes)
        .build()
}

fn route_configuration_json(config: &RouteConfiguration) -> Map<String, Value> {
    Obj::new()
        .str("name", &config.name)
        .list("virtualHosts", config.virtual_hosts.iter().map(virtual_host_json).collect())
        .into_map()
}

fn encode_route_configuration(_: &TypeRegistry, bytes: &[u8]) -> Result<Map<String, Value>> {
    let config: RouteConfiguration = decode("RouteConfiguration", bytes)?;
    Ok(route_configuration_json(&config))
}

fn encode_cluster(registry: &TypeRegistry, bytes: &[u8]) -> Result<Map<String, Value>> {
    let c: Cluster = decode("Cluster", bytes)?;

    let discovery_type = match &c.cluster_discovery_type {
        Some(cluster::ClusterDiscoveryType::Type(raw)) => cluster::DiscoveryType::try_from(*raw)
            .ok()
            .filter(|t| *t != cluster::DiscoveryType::Static)
            .map(|t| Value::String(t.as_str_name().to_string())),
        _ => None,
    };

    let eds = c
        .eds_cluster_config
        .as_ref()
        .map(|eds| Obj::new().str("serviceName", &eds.service_name).build());

    let lb_policy = cluster::LbPolicy::try_from(c.lb_policy)
        .ok()
        .filter(|p| *p != cluster::LbPolicy::RoundRobin)
        .map(|p| Value::String(p.as_str_name().to_string()));

    let dns_lookup_family = cluster::DnsLookupFamily::try_from(c.dns_lookup_family)
        .ok()
        .filter(|f| *f != cluster::DnsLookupFamily::Auto)
        .map(|f| Value::String(f.as_str_name().to_string()));

    let socket = match c.transport_socket.as_ref() {
        Some(socket) => {
            let typed = match &socket.config_type {
                Some(transport_socket::ConfigType::TypedConfig(any)) => {
                    Some(registry.encode_any(any)?)
                }
                None => None,
            };
            Some(Obj::new().str("name", &socket.name).opt("typedConfig", typed).build())
        }
        None => None,
    };

    let load_assignment = c
        .load_assignment
        .as_ref()
        .map(|cla| Value::Object(cluster_load_assignment_json(cla)));

    Ok(Obj::new()
        .str("name", &c.name)
        .opt("type", discovery_type)
        .opt("edsClusterConfig", eds)
        .opt("connectTimeout", duration_json(c.connect_timeout.as_ref()))
        .opt("lbPolicy", lb_policy)
        .opt("dnsLookupFamily", dns_lookup_family)
        .opt("transportSocket", socket)
        .opt("loadAssignment", load_assignment)
        .into_map())
}

fn encode_cluster_load_assignment(_: &TypeRegistry, bytes: &[u8]) -> Result<Map<String, Value>> {
    let cla: ClusterLoadAssignment = decode("ClusterLoadAssignment", bytes)?;
    Ok(cluster_load_assignment_json(&cla))
}

fn cluster_load_assignment_json(cla: &ClusterLoadAssignment) -> Map<String, Value> {
    let endpoints = cla
        .endpoints
        .iter()
        .map(|locality_endpoints| {
            let locality = locality_endpoints.locality.as_ref().map(|l| {
                Obj::new()
                    .str("region", &l.region)
                    .str("zone", &l.zone)
                    .str("subZone", &l.sub_zone)
                    .build()
            });

            let lb_endpoints = locality_endpoints
                .lb_endpoints
                .iter()
                .map(|lb| {
                    let endpoint = match &lb.host_identifier {
                        Some(lb_endpoint::HostIdentifier::Endpoint(endpoint)) => Some(
                            Obj::new()
                                .opt("address", endpoint.address.as_ref().map(address_json))
                                .build(),
                        ),
                        _ => None,
                    };
                    let health = HealthStatus::try_from(lb.health_status)
                        .ok()
                        .filter(|h| *h != HealthStatus::Unknown)
                        .map(|h| Value::String(h.as_str_name().to_string()));
                    Obj::new().opt("endpoint", endpoint).opt("healthStatus", health).build()
                })
                .collect();

            Obj::new()
                .opt("locality", locality)
                .list("lbEndpoints", lb_endpoints)
                .build()
        })
        .collect();

    Obj::new()
        .str("clusterName", &cla.cluster_name)
        .list("endpoints", endpoints)
        .into_map()
}

fn listeners_dump_json(registry: &TypeRegistry, dump: &ListenersConfigDump) -> Result<Value> {
    let mut statics = Vec::new();
    for listener in &dump.static_listeners {
        statics.push(
            Obj::new()
                .opt("listener", encode_opt_any(registry, listener.listener.as_ref())?)
                .opt("lastUpdated", timestamp(listener.last_updated.as_ref()))
                .build(),
        );
    }

    let mut dynamics = Vec::new();
    for listener in &dump.dynamic_listeners {
        let mut obj = Obj::new().str("name", &listener.name);
        for (key, state) in [
            ("activeState", &listener.active_state),
            ("warmingState", &listener.warming_state),
            ("drainingState", &listener.draining_state),
        ] {
            if let Some(state) = state {
                obj = obj.opt(
                    key,
                    Some(
                        Obj::new()
                            .str("versionInfo", &state.version_info)
                            .opt("listener", encode_opt_any(registry, state.listener.as_ref())?)
                            .opt("lastUpdated", timestamp(state.last_updated.as_ref()))
                            .build(),
                    ),
                );
            }
        }
        dynamics.push(obj.str("clientStatus", resource_status(listener.client_status)).build());
    }

    Ok(Obj::new()
        .str("versionInfo", &dump.version_info)
        .list("staticListeners", statics)
        .list("dynamicListeners", dynamics)
        .build())
}

fn routes_dump_json(registry: &TypeRegistry, dump: &RoutesConfigDump) -> Result<Value> {
    let mut statics = Vec::new();
    for route in &dump.static_route_configs {
        statics.push(
            Obj::new()
                .opt("routeConfig", encode_opt_any(registry, route.route_config.as_ref())?)
                .opt("lastUpdated", timestamp(route.last_updated.as_ref()))
                .build(),
        );
    }

    let mut dynamics = Vec::new();
    for route in &dump.dynamic_route_configs {
        dynamics.push(
            Obj::new()
                .str("versionInfo", &route.version_info)
                .opt("routeConfig", encode_opt_any(registry, route.route_config.as_ref())?)
                .opt("lastUpdated", timestamp(route.last_updated.as_ref()))
                .str("clientStatus", resource_status(route.client_status))
                .build(),
        );
    }

    Ok(Obj::new()
        .list("staticRouteConfigs", statics)
        .list("dynamicRouteConfigs", dynamics)
        .build())
}

fn scoped_routes_dump_json(registry: &TypeRegistry, dump: &ScopedRoutesConfigDump) -> Result<Value> {
    let mut inline = Vec::new();
    for scoped in &dump.inline_scoped_route_configs {
        inline.push(
            Obj::new()
                .str("name", &scoped.name)
                .list("scopedRouteConfigs", encode_anys(registry, &scoped.scoped_route_configs)?)
                .opt("lastUpdated", timestamp(scoped.last_updated.as_ref()))
                .build(),
        );
    }

    let mut dynamics = Vec::new();
    for scoped in &dump.dynamic_scoped_route_configs {
        dynamics.push(
            Obj::new()
                .str("name", &scoped.name)
                .str("versionInfo", &scoped.version_info)
                .list("scopedRouteConfigs", encode_anys(registry, &scoped.scoped_route_configs)?)
                .opt("lastUpdated", timestamp(scoped.last_updated.as_ref()))
                .build(),
        );
    }

    Ok(Obj::new()
        .list("inlineScopedRouteConfigs", inline)
        .list("dynamicScopedRouteConfigs", dynamics)
        .build())
}

fn clusters_dump_json(registry: &TypeRegistry, dump: &ClustersConfigDump) -> Result<Value> {
    let mut statics = Vec::new();
    for c in &dump.static_clusters {
        statics.push(
            Obj::new()
                .opt("cluster", encode_opt_any(registry, c.cluster.as_ref())?)
                .opt("lastUpdated", timestamp(c.last_updated.as_ref()))
                .build(),
        );
    }

    let mut active = Vec::new();
    for c in &dump.dynamic_active_clusters {
        active.push(
            Obj::new()
                .str("versionInfo", &c.version_info)
                .opt("cluster", encode_opt_any(registry, c.cluster.as_ref())?)
                .opt("lastUpdated", timestamp(c.last_updated.as_ref()))
                .str("clientStatus", resource_status(c.client_status))
                .build(),
        );
    }

    let mut warming = Vec::new();
    for c in &dump.dynamic_warming_clusters {
        warming.push(
            Obj::new()
                .str("versionInfo", &c.version_info)
                .opt("cluster", encode_opt_any(registry, c.cluster.as_ref())?)
                .opt("lastUpdated", timestamp(c.last_updated.as_ref()))
                .build(),
        );
    }

    Ok(Obj::new()
        .str("versionInfo", &dump.version_info)
        .list("staticClusters", statics)
        .list("dynamicActiveClusters", active)
        .list("dynamicWarmingClusters", warming)
        .build())
}

fn endpoints_dump_json(registry: &TypeRegistry, dump: &EndpointsConfigDump) -> Result<Value> {
    let mut statics = Vec::new();
    for e in &dump.static_endpoint_configs {
        statics.push(
            Obj::new()
                .opt("endpointConfig", encode_opt_any(registry, e.endpoint_config.as_ref())?)
                .opt("lastUpdated", timestamp(e.last_updated.as_ref()))
                .build(),
        );
    }

    let mut dynamics = Vec::new();
    for e in &dump.dynamic_endpoint_configs {
        dynamics.push(
            Obj::new()
                .str("versionInfo", &e.version_info)
                .opt("endpointConfig", encode_opt_any(registry, e.endpoint_config.as_ref())?)
                .opt("lastUpdated", timestamp(e.last_updated.as_ref()))
                .str("clientStatus", resource_status(e.client_status))
                .build(),
        );
    }

    Ok(Obj::new()
        .list("staticEndpointConfigs", statics)
        .list("dynamicEndpointConfigs", dynamics)
        .build())
}

fn per_xds_config_json(registry: &TypeRegistry, config: &PerXdsConfig) -> Result<Value> {
    use per_xds_config::PerXdsConfig as Dump;

    let obj = Obj::new().str("status", config_status(config.status));
    let obj = match &config.per_xds_config {
        Some(Dump::ListenerConfig(dump)) => {
            obj.opt("listenerConfig", Some(listeners_dump_json(registry, dump)?))
        }
        Some(Dump::ClusterConfig(dump)) => {
            obj.opt("clusterConfig", Some(clusters_dump_json(registry, dump)?))
        }
        Some(Dump::RouteConfig(dump)) => {
            obj.opt("routeConfig", Some(routes_dump_json(registry, dump)?))
        }
        Some(Dump::ScopedRouteConfig(dump)) => {
            obj.opt("scopedRouteConfig", Some(scoped_routes_dump_json(registry, dump)?))
        }
        Some(Dump::EndpointConfig(dump)) => {
            obj.opt("endpointConfig", Some(endpoints_dump_json(registry, dump)?))
        }
        None => obj,
    };
    Ok(obj.build())
}

fn generic_xds_config_json(registry: &TypeRegistry, config: &GenericXdsConfig) -> Result<Value> {
    Ok(Obj::new()
        .str("typeUrl", &config.type_url)
        .str("name", &config.name)
        .str("versionInfo", &config.version_info)
        .opt("xdsConfig", encode_opt_any(registry, config.xds_config.as_ref())?)
        .opt("lastUpdated", timestamp(config.last_updated.as_ref()))
        .str("configStatus", config_status(config.config_status))
        .str("clientStatus", resource_status(config.client_status))
        .flag("isStaticResource", config.is_static_resource)
        .build())
}

fn node_json(node: &Node) -> Value {
    Obj::new()
        .str("id", &node.id)
        .str("cluster", &node.cluster)
        .opt(
            "metadata",
            node.metadata.as_ref().filter(|m| !m.fields.is_empty()).map(struct_to_json),
        )
        .str("userAgentName", &node.user_agent_name)
        .build()
}

fn client_config_json(registry: &TypeRegistry, config: &ClientConfig) -> Result<Value> {
    let xds_config = config
        .xds_config
        .iter()
        .map(|c| per_xds_config_json(registry, c))
        .collect::<Result<Vec<_>>>()?;
    let generic = config
        .generic_xds_configs
        .iter()
        .map(|c| generic_xds_config_json(registry, c))
        .collect::<Result<Vec<_>>>()?;

    Ok(Obj::new()
        .opt("node", config.node.as_ref().map(node_json))
        .list("xdsConfig", xds_config)
        .list("genericXdsConfigs", generic)
        .build())
}

/// Encode a whole response into its canonical JSON tree
pub fn response_to_json(registry: &TypeRegistry, response: &ClientStatusResponse) -> Result<Value> {
    let configs = response
        .config
        .iter()
        .map(|c| client_config_json(registry, c))
        .collect::<Result<Vec<_>>>()?;
    Ok(Obj::new().list("config", configs).build())
}

/// Pretty-printed canonical JSON of a response
pub fn response_to_string(registry: &TypeRegistry, response: &ClientStatusResponse) -> Result<String> {
    let tree = response_to_json(registry, response)?;
    serde_json::to_string_pretty(&tree).map_err(|e| Error::serialization("canonical dump", e))
}
