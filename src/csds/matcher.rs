//! Node Matcher Resolver
//!
//! Builds the `NodeMatcher` selectors sent in every `ClientStatusRequest`.
//! Matchers come from a request file, an inline request string, or both. Each
//! source is a document of the form `{ node_matchers: [ ... ] }` written either
//! as proto3 JSON (`nodeId`, `nodeMetadatas`, `stringMatch`) or as a YAML
//! mapping using the proto field names (`node_id`, `node_metadatas`, ...).
//! A request file is read by its extension (`.json`, `.yaml`/`.yml`); other
//! files and inline strings are tried as JSON first, then as YAML.
//!
//! When both sources are present the inline list is merged onto the file list
//! positionally, with protobuf merge semantics: set scalars and oneofs from the
//! inline entry win, repeated fields are appended.

use std::path::Path;

use envoy_types::pb::envoy::r#type::matcher::v3 as proto;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Platform;
use crate::{Error, Result};

/// Metadata key carrying the GCP project number
pub const GCP_PROJECT_NUMBER_KEY: &str = "TRAFFICDIRECTOR_GCP_PROJECT_NUMBER";

/// Metadata key carrying the VPC network name
pub const GCP_NETWORK_NAME_KEY: &str = "TRAFFICDIRECTOR_NETWORK_NAME";

/// Metadata key carrying the mesh scope name (alternative to the network name)
pub const GCP_MESH_SCOPE_KEY: &str = "TRAFFICDIRECTOR_MESH_SCOPE_NAME";

/// Request document wrapping the matcher list
#[derive(Debug, Clone, Default, Deserialize)]
struct RequestDocument {
    #[serde(default, alias = "nodeMatchers")]
    node_matchers: Vec<NodeMatcher>,
}

/// Selector for the clients a status query is scoped to
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NodeMatcher {
    #[serde(default, alias = "node_id", skip_serializing_if = "Option::is_none")]
    pub node_id: Option<StringMatcher>,

    #[serde(default, alias = "node_metadatas", skip_serializing_if = "Vec::is_empty")]
    pub node_metadatas: Vec<StructMatcher>,
}

/// String match; exactly one pattern field is expected to be set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StringMatcher {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exact: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains: Option<String>,

    #[serde(default, alias = "safe_regex", skip_serializing_if = "Option::is_none")]
    pub safe_regex: Option<RegexMatcher>,

    #[serde(default, alias = "ignore_case", skip_serializing_if = "std::ops::Not::not")]
    pub ignore_case: bool,
}

/// Regular expression pattern with its optional engine selection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegexMatcher {
    pub regex: String,

    #[serde(default, alias = "google_re2", skip_serializing_if = "Option::is_none")]
    pub google_re2: Option<GoogleRe2>,
}

/// RE2 engine settings carried to the service as given
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GoogleRe2 {
    #[serde(default, alias = "max_program_size", skip_serializing_if = "Option::is_none")]
    pub max_program_size: Option<u32>,
}

impl RegexMatcher {
    #[allow(deprecated)]
    fn to_proto(&self) -> proto::RegexMatcher {
        use envoy_types::pb::google::protobuf::UInt32Value;
        use proto::regex_matcher::{EngineType, GoogleRe2 as ProtoGoogleRe2};

        proto::RegexMatcher {
            regex: self.regex.clone(),
            engine_type: self.google_re2.map(|engine| {
                EngineType::GoogleRe2(ProtoGoogleRe2 {
                    max_program_size: engine.max_program_size.map(|value| UInt32Value { value }),
                })
            }),
        }
    }
}

/// Match against a value located by a key path in the node metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StructMatcher {
    #[serde(default)]
    pub path: Vec<PathSegment>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<ValueMatcher>,
}

/// One key in a metadata path
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathSegment {
    pub key: String,
}

/// Value match; one of the fields is expected to be set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ValueMatcher {
    #[serde(default, alias = "null_match", skip_serializing_if = "Option::is_none")]
    pub null_match: Option<serde_json::Map<String, serde_json::Value>>,

    #[serde(default, alias = "string_match", skip_serializing_if = "Option::is_none")]
    pub string_match: Option<StringMatcher>,

    #[serde(default, alias = "bool_match", skip_serializing_if = "Option::is_none")]
    pub bool_match: Option<bool>,

    #[serde(default, alias = "present_match", skip_serializing_if = "Option::is_none")]
    pub present_match: Option<bool>,
}

impl StringMatcher {
    /// Exact-match shorthand
    pub fn exact<S: Into<String>>(value: S) -> Self {
        Self { exact: Some(value.into()), ..Default::default() }
    }

    fn pattern_count(&self) -> usize {
        [
            self.exact.is_some(),
            self.prefix.is_some(),
            self.suffix.is_some(),
            self.contains.is_some(),
            self.safe_regex.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }

    fn clear_pattern(&mut self) {
        self.exact = None;
        self.prefix = None;
        self.suffix = None;
        self.contains = None;
        self.safe_regex = None;
    }

    /// Merge `other` into `self`; a pattern in `other` replaces ours.
    pub fn merge(&mut self, other: StringMatcher) {
        if other.pattern_count() > 0 {
            self.clear_pattern();
            self.exact = other.exact;
            self.prefix = other.prefix;
            self.suffix = other.suffix;
            self.contains = other.contains;
            self.safe_regex = other.safe_regex;
        }
        if other.ignore_case {
            self.ignore_case = true;
        }
    }

    fn validate(&self, field: &str) -> Result<()> {
        if self.pattern_count() > 1 {
            return Err(Error::config(format!(
                "{} sets more than one of exact, prefix, suffix, contains, safe_regex",
                field
            )));
        }
        Ok(())
    }

    fn to_proto(&self) -> proto::StringMatcher {
        use proto::string_matcher::MatchPattern;

        let pattern = if let Some(exact) = &self.exact {
            Some(MatchPattern::Exact(exact.clone()))
        } else if let Some(prefix) = &self.prefix {
            Some(MatchPattern::Prefix(prefix.clone()))
        } else if let Some(suffix) = &self.suffix {
            Some(MatchPattern::Suffix(suffix.clone()))
        } else if let Some(contains) = &self.contains {
            Some(MatchPattern::Contains(contains.clone()))
        } else {
            self.safe_regex.as_ref().map(|re| MatchPattern::SafeRegex(re.to_proto()))
        };

        proto::StringMatcher {
            match_pattern: pattern,
            ignore_case: self.ignore_case,
        }
    }
}

impl ValueMatcher {
    fn pattern_count(&self) -> usize {
        [
            self.null_match.is_some(),
            self.string_match.is_some(),
            self.bool_match.is_some(),
            self.present_match.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }

    /// Merge `other` into `self` following oneof semantics
    pub fn merge(&mut self, other: ValueMatcher) {
        if let Some(incoming) = other.string_match {
            match self.string_match.as_mut() {
                Some(existing) => existing.merge(incoming),
                None => {
                    *self = ValueMatcher::default();
                    self.string_match = Some(incoming);
                }
            }
        } else if other.pattern_count() > 0 {
            *self = other;
        }
    }

    fn to_proto(&self) -> proto::ValueMatcher {
        use proto::value_matcher::MatchPattern;

        let pattern = if let Some(string_match) = &self.string_match {
            Some(MatchPattern::StringMatch(string_match.to_proto()))
        } else if let Some(value) = self.bool_match {
            Some(MatchPattern::BoolMatch(value))
        } else if let Some(value) = self.present_match {
            Some(MatchPattern::PresentMatch(value))
        } else {
            self.null_match
                .as_ref()
                .map(|_| MatchPattern::NullMatch(proto::value_matcher::NullMatch::default()))
        };

        proto::ValueMatcher { match_pattern: pattern }
    }
}

impl StructMatcher {
    /// Shorthand for a single-key path matched exactly against a string
    pub fn key_exact<K: Into<String>, V: Into<String>>(key: K, value: V) -> Self {
        Self {
            path: vec![PathSegment { key: key.into() }],
            value: Some(ValueMatcher {
                string_match: Some(StringMatcher::exact(value)),
                ..Default::default()
            }),
        }
    }

    fn to_proto(&self) -> proto::StructMatcher {
        use proto::struct_matcher::{path_segment::Segment, PathSegment as ProtoSegment};

        proto::StructMatcher {
            path: self
                .path
                .iter()
                .map(|segment| ProtoSegment { segment: Some(Segment::Key(segment.key.clone())) })
                .collect(),
            value: self.value.as_ref().map(ValueMatcher::to_proto),
        }
    }
}

impl NodeMatcher {
    /// Merge `other` into `self` with protobuf merge semantics
    pub fn merge(&mut self, other: NodeMatcher) {
        if let Some(incoming) = other.node_id {
            match self.node_id.as_mut() {
                Some(existing) => existing.merge(incoming),
                None => self.node_id = Some(incoming),
            }
        }
        self.node_metadatas.extend(other.node_metadatas);
    }

    fn validate(&self, index: usize) -> Result<()> {
        if let Some(node_id) = &self.node_id {
            node_id.validate(&format!("node_matchers[{}].node_id", index))?;
        }
        for (i, metadata) in self.node_metadatas.iter().enumerate() {
            let field = format!("node_matchers[{}].node_metadatas[{}]", index, i);
            if let Some(value) = &metadata.value {
                if value.pattern_count() > 1 {
                    return Err(Error::config(format!("{}.value sets more than one match", field)));
                }
                if let Some(string_match) = &value.string_match {
                    string_match.validate(&field)?;
                }
            }
        }
        Ok(())
    }

    /// Convert to the wire type
    pub fn to_proto(&self) -> proto::NodeMatcher {
        proto::NodeMatcher {
            node_id: self.node_id.as_ref().map(StringMatcher::to_proto),
            node_metadatas: self.node_metadatas.iter().map(StructMatcher::to_proto).collect(),
        }
    }
}

/// Network scope a Traffic Director client belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkScope {
    Network(String),
    MeshScope(String),
}

/// Identity values derived from the resolved matchers on the gcp platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeScope {
    pub project_number: String,
    pub network: NetworkScope,
}

/// Outcome of resolution: the matcher list plus platform identity
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedMatchers {
    pub matchers: Vec<NodeMatcher>,
    pub scope: Option<NodeScope>,
}

impl ResolvedMatchers {
    /// Wire representation of the matcher list
    pub fn to_proto(&self) -> Vec<proto::NodeMatcher> {
        self.matchers.iter().map(NodeMatcher::to_proto).collect()
    }
}

/// Parse one request document (JSON or YAML) into its matcher list
/// Encoding of a request document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestFormat {
    Json,
    Yaml,
    /// JSON when it parses as JSON, YAML otherwise
    Detect,
}

impl RequestFormat {
    pub fn from_path(path: &Path) -> Self {
        let extension = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("json") => Self::Json,
            Some("yaml") | Some("yml") => Self::Yaml,
            _ => Self::Detect,
        }
    }
}

pub fn parse_request_document(text: &str) -> Result<Vec<NodeMatcher>> {
    parse_request_as(text, RequestFormat::Detect)
}

/// Parse a request document in a known encoding. Blank text holds no matchers.
pub fn parse_request_as(text: &str, format: RequestFormat) -> Result<Vec<NodeMatcher>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let tree: serde_json::Value = match format {
        RequestFormat::Json => serde_json::from_str(text)?,
        RequestFormat::Yaml => serde_yaml::from_str(text)?,
        RequestFormat::Detect => match serde_json::from_str(text) {
            Ok(value) => value,
            Err(_) => serde_yaml::from_str(text)?,
        },
    };

    if tree.is_null() {
        return Ok(Vec::new());
    }

    let document: RequestDocument = serde_json::from_value(tree)
        .map_err(|e| Error::serialization("invalid CSDS request", e))?;

    for (index, matcher) in document.node_matchers.iter().enumerate() {
        matcher.validate(index)?;
    }

    Ok(document.node_matchers)
}

/// Merge `overlay` onto `base` entry by entry; extra overlay entries are appended
pub fn merge_positional(base: &mut Vec<NodeMatcher>, overlay: Vec<NodeMatcher>) {
    for (index, matcher) in overlay.into_iter().enumerate() {
        match base.get_mut(index) {
            Some(existing) => existing.merge(matcher),
            None => base.push(matcher),
        }
    }
}

/// Exact value of the first metadata matcher whose path names `key`
pub fn metadata_value<'a>(matchers: &'a [NodeMatcher], key: &str) -> Option<&'a str> {
    matchers
        .iter()
        .flat_map(|matcher| matcher.node_metadatas.iter())
        .find(|metadata| metadata.path.iter().any(|segment| segment.key == key))
        .map(|metadata| {
            metadata
                .value
                .as_ref()
                .and_then(|value| value.string_match.as_ref())
                .and_then(|string_match| string_match.exact.as_deref())
                .unwrap_or_default()
        })
}

fn non_empty_value<'a>(matchers: &'a [NodeMatcher], key: &str) -> Option<&'a str> {
    metadata_value(matchers, key).filter(|value| !value.is_empty())
}

/// Resolves matcher sources for a platform
#[derive(Debug, Clone, Copy)]
pub struct MatcherResolver {
    platform: Platform,
}

impl MatcherResolver {
    pub fn new(platform: Platform) -> Self {
        Self { platform }
    }

    /// Resolve and validate the matcher list. Empty sources count as absent.
    pub fn resolve(&self, file: Option<&Path>, inline: Option<&str>) -> Result<ResolvedMatchers> {
        let file = file.filter(|path| !path.as_os_str().is_empty());
        let inline = inline.filter(|text| !text.trim().is_empty());

        if file.is_none() && inline.is_none() {
            return Err(Error::MissingInput);
        }

        let mut matchers = Vec::new();
        if let Some(path) = file {
            let text =
                std::fs::read_to_string(path).map_err(|e| Error::io_path("read", path, e))?;
            let format = RequestFormat::from_path(path);
            matchers = parse_request_as(&text, format)?;
            debug!(path = %path.display(), ?format, count = matchers.len(), "Parsed request file");
        }

        if let Some(text) = inline {
            let overlay = parse_request_document(text)?;
            debug!(count = overlay.len(), "Merging inline request onto request file");
            merge_positional(&mut matchers, overlay);
        }

        let scope = self.validate(&matchers)?;
        Ok(ResolvedMatchers { matchers, scope })
    }

    /// Check platform-mandatory metadata keys
    pub fn validate(&self, matchers: &[NodeMatcher]) -> Result<Option<NodeScope>> {
        match self.platform {
            Platform::Generic => Ok(None),
            Platform::Gcp => {
                let project_number = non_empty_value(matchers, GCP_PROJECT_NUMBER_KEY)
                    .ok_or_else(|| Error::MissingRequiredField {
                        key: GCP_PROJECT_NUMBER_KEY.to_string(),
                    })?;

                let network = non_empty_value(matchers, GCP_NETWORK_NAME_KEY);
                let mesh_scope = non_empty_value(matchers, GCP_MESH_SCOPE_KEY);

                let network = match (network, mesh_scope) {
                    (Some(_), Some(_)) => {
                        return Err(Error::ConflictingFields {
                            first: GCP_NETWORK_NAME_KEY.to_string(),
                            second: GCP_MESH_SCOPE_KEY.to_string(),
                        })
                    }
                    (Some(name), None) => NetworkScope::Network(name.to_string()),
                    (None, Some(name)) => NetworkScope::MeshScope(name.to_string()),
                    (None, None) => {
                        return Err(Error::MissingRequiredField {
                            key: GCP_NETWORK_NAME_KEY.to_string(),
                        })
                    }
                };

                Ok(Some(NodeScope { project_number: project_number.to_string(), network }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INLINE_JSON: &str = r#"{"node_matchers": [{"node_id": {"exact": "fake_node_id"}, "node_metadatas": [{"path": [{"key": "TRAFFICDIRECTOR_GCP_PROJECT_NUMBER"}], "value": {"string_match": {"exact": "fake_project_number"}}}, {"path": [{"key": "TRAFFICDIRECTOR_NETWORK_NAME"}], "value": {"string_match": {"exact": "fake_network_name"}}}]}]}"#;

    const FILE_YAML: &str = r#"
node_matchers:
  - node_id:
      exact: fake_node_id
    node_metadatas:
      - path:
          - key: TRAFFICDIRECTOR_GCP_PROJECT_NUMBER
        value:
          string_match:
            exact: fake_project_number
      - path:
          - key: TRAFFICDIRECTOR_NETWORK_NAME
        value:
          string_match:
            exact: fake_network_name
"#;

    #[test]
    fn test_json_and_yaml_encodings_agree() {
        let from_json = parse_request_document(INLINE_JSON).unwrap();
        let from_yaml = parse_request_document(FILE_YAML).unwrap();
        assert_eq!(from_json, from_yaml);
        assert_eq!(from_json.len(), 1);
        assert_eq!(from_json[0].node_metadatas.len(), 2);
    }

    #[test]
    fn test_camel_case_proto_json_accepted() {
        let doc = r#"{"nodeMatchers": [{"nodeId": {"prefix": "td-"}, "nodeMetadatas": [{"path": [{"key": "k"}], "value": {"stringMatch": {"exact": "v"}}}]}]}"#;
        let matchers = parse_request_document(doc).unwrap();
        assert_eq!(matchers[0].node_id.as_ref().unwrap().prefix.as_deref(), Some("td-"));
        assert_eq!(metadata_value(&matchers, "k"), Some("v"));
    }

    #[test]
    fn test_regex_engine_settings_kept() {
        let doc = r#"{"node_matchers": [{"node_id": {"safe_regex": {"google_re2": {"max_program_size": 100}, "regex": "td-.*"}}}]}"#;
        let matchers = parse_request_document(doc).unwrap();
        let regex = matchers[0].node_id.as_ref().unwrap().safe_regex.clone().unwrap();
        assert_eq!(regex.google_re2, Some(GoogleRe2 { max_program_size: Some(100) }));

        let proto = matchers[0].to_proto();
        let Some(proto::string_matcher::MatchPattern::SafeRegex(sent)) =
            proto.node_id.unwrap().match_pattern
        else {
            panic!("expected a safe_regex pattern");
        };
        assert_eq!(sent.regex, "td-.*");
        #[allow(deprecated)]
        let engine = match sent.engine_type {
            Some(proto::regex_matcher::EngineType::GoogleRe2(engine)) => engine,
            None => panic!("engine dropped"),
        };
        #[allow(deprecated)]
        let size = engine.max_program_size.map(|v| v.value);
        assert_eq!(size, Some(100));
    }

    #[test]
    fn test_unknown_regex_field_rejected() {
        let doc = r#"{"node_matchers": [{"node_id": {"safe_regex": {"regex": "a", "engine": "pcre"}}}]}"#;
        assert!(matches!(parse_request_document(doc), Err(Error::Serialization { .. })));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(RequestFormat::from_path(Path::new("req.json")), RequestFormat::Json);
        assert_eq!(RequestFormat::from_path(Path::new("req.YAML")), RequestFormat::Yaml);
        assert_eq!(RequestFormat::from_path(Path::new("req.yml")), RequestFormat::Yaml);
        assert_eq!(RequestFormat::from_path(Path::new("request")), RequestFormat::Detect);

        assert!(matches!(parse_request_as(FILE_YAML, RequestFormat::Json), Err(Error::Serialization { .. })));
        assert_eq!(parse_request_as(FILE_YAML, RequestFormat::Yaml).unwrap().len(), 1);
        assert_eq!(parse_request_as(INLINE_JSON, RequestFormat::Yaml).unwrap().len(), 1);
        assert!(parse_request_as("  \n", RequestFormat::Json).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let doc = r#"{"node_matchers": [{"node_name": {"exact": "x"}}]}"#;
        assert!(matches!(parse_request_document(doc), Err(Error::Serialization { .. })));
    }

    #[test]
    fn test_two_patterns_rejected() {
        let doc = r#"{"node_matchers": [{"node_id": {"exact": "x", "prefix": "y"}}]}"#;
        assert!(matches!(parse_request_document(doc), Err(Error::Config(_))));
    }

    #[test]
    fn test_merge_overrides_node_id_and_keeps_metadata() {
        let mut base = parse_request_document(FILE_YAML).unwrap();
        let overlay =
            parse_request_document(r#"{"node_matchers": [{"node_id": {"exact": "from_cli"}}]}"#)
                .unwrap();
        merge_positional(&mut base, overlay);

        assert_eq!(base.len(), 1);
        assert_eq!(base[0].node_id, Some(StringMatcher::exact("from_cli")));
        assert_eq!(base[0].node_metadatas.len(), 2);
    }

    #[test]
    fn test_merge_replaces_oneof_pattern() {
        let mut id = StringMatcher::exact("a");
        id.merge(StringMatcher { prefix: Some("b".into()), ..Default::default() });
        assert_eq!(id.exact, None);
        assert_eq!(id.prefix.as_deref(), Some("b"));

        id.merge(StringMatcher { ignore_case: true, ..Default::default() });
        assert_eq!(id.prefix.as_deref(), Some("b"));
        assert!(id.ignore_case);
    }

    #[test]
    fn test_merge_appends_extra_entries() {
        let mut base = vec![NodeMatcher::default()];
        let overlay = vec![
            NodeMatcher::default(),
            NodeMatcher { node_id: Some(StringMatcher::exact("second")), ..Default::default() },
        ];
        merge_positional(&mut base, overlay);
        assert_eq!(base.len(), 2);
        assert_eq!(base[1].node_id, Some(StringMatcher::exact("second")));
    }

    #[test]
    fn test_missing_input() {
        let resolver = MatcherResolver::new(Platform::Gcp);
        assert!(matches!(resolver.resolve(None, None), Err(Error::MissingInput)));
        assert!(matches!(resolver.resolve(None, Some("  ")), Err(Error::MissingInput)));
    }

    #[test]
    fn test_gcp_scope_from_inline() {
        let resolved = MatcherResolver::new(Platform::Gcp).resolve(None, Some(INLINE_JSON)).unwrap();
        assert_eq!(
            resolved.scope,
            Some(NodeScope {
                project_number: "fake_project_number".into(),
                network: NetworkScope::Network("fake_network_name".into()),
            })
        );
    }

    #[test]
    fn test_gcp_missing_network() {
        let matchers = vec![NodeMatcher {
            node_metadatas: vec![StructMatcher::key_exact(GCP_PROJECT_NUMBER_KEY, "123")],
            ..Default::default()
        }];
        let err = MatcherResolver::new(Platform::Gcp).validate(&matchers).unwrap_err();
        assert!(
            matches!(err, Error::MissingRequiredField { ref key } if key == GCP_NETWORK_NAME_KEY)
        );
    }

    #[test]
    fn test_gcp_mesh_scope_accepted() {
        let matchers = vec![NodeMatcher {
            node_metadatas: vec![
                StructMatcher::key_exact(GCP_PROJECT_NUMBER_KEY, "123"),
                StructMatcher::key_exact(GCP_MESH_SCOPE_KEY, "mesh-a"),
            ],
            ..Default::default()
        }];
        let scope = MatcherResolver::new(Platform::Gcp).validate(&matchers).unwrap().unwrap();
        assert_eq!(scope.network, NetworkScope::MeshScope("mesh-a".into()));
    }

    #[test]
    fn test_gcp_network_and_mesh_scope_conflict() {
        let matchers = vec![NodeMatcher {
            node_metadatas: vec![
                StructMatcher::key_exact(GCP_PROJECT_NUMBER_KEY, "123"),
                StructMatcher::key_exact(GCP_NETWORK_NAME_KEY, "default"),
                StructMatcher::key_exact(GCP_MESH_SCOPE_KEY, "mesh-a"),
            ],
            ..Default::default()
        }];
        let err = MatcherResolver::new(Platform::Gcp).validate(&matchers).unwrap_err();
        assert!(matches!(err, Error::ConflictingFields { .. }));
    }

    #[test]
    fn test_generic_platform_skips_validation() {
        let resolved = MatcherResolver::new(Platform::Generic)
            .resolve(None, Some("node_matchers: [{node_id: {prefix: envoy}}]"))
            .unwrap();
        assert!(resolved.scope.is_none());
        assert_eq!(resolved.matchers.len(), 1);
    }

    #[test]
    fn test_to_proto() {
        use proto::string_matcher::MatchPattern;

        let matchers = parse_request_document(INLINE_JSON).unwrap();
        let wire = matchers[0].to_proto();
        assert_eq!(
            wire.node_id.unwrap().match_pattern,
            Some(MatchPattern::Exact("fake_node_id".into()))
        );
        assert_eq!(wire.node_metadatas.len(), 2);
    }
}
