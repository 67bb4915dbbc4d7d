//! Node matcher resolution from request files and inline requests.

mod common;

use proptest::prelude::*;

use common::fixture_path;
use csds_client::config::{ApiVersion, Platform};
use csds_client::csds::matcher::{
    merge_positional, metadata_value, MatcherResolver, NetworkScope, NodeMatcher, StringMatcher,
    StructMatcher, GCP_MESH_SCOPE_KEY, GCP_NETWORK_NAME_KEY,
};
use csds_client::csds::StatusSchema;
use csds_client::Error;

#[test]
fn file_and_inline_are_merged_positionally() {
    let resolver = MatcherResolver::new(Platform::Gcp);
    let path = fixture_path("request.yaml");
    let inline = r#"{"node_matchers": [{"node_id": {"prefix": "projects/123456789/"}}, {"node_id": {"suffix": "-2"}}]}"#;

    let resolved = resolver.resolve(Some(path.as_path()), Some(inline)).unwrap();

    assert_eq!(resolved.matchers.len(), 2);
    let first = resolved.matchers[0].node_id.as_ref().unwrap();
    assert_eq!(first.prefix.as_deref(), Some("projects/123456789/"));
    assert_eq!(first.exact, None);
    assert_eq!(resolved.matchers[0].node_metadatas.len(), 2);
    assert_eq!(
        resolved.matchers[1].node_id,
        Some(StringMatcher { suffix: Some("-2".into()), ..Default::default() })
    );
}

#[test]
fn empty_inline_is_the_same_as_none() {
    let resolver = MatcherResolver::new(Platform::Gcp);
    let path = fixture_path("request.yaml");

    let without = resolver.resolve(Some(path.as_path()), None).unwrap();
    let with_empty = resolver.resolve(Some(path.as_path()), Some("")).unwrap();
    assert_eq!(without, with_empty);
}

#[test]
fn mesh_scope_request_builds_mesh_node_id() {
    let resolved = MatcherResolver::new(Platform::Gcp)
        .resolve(Some(fixture_path("request_mesh.json").as_path()), None)
        .unwrap();
    let scope = resolved.scope.clone().unwrap();
    assert_eq!(scope.network, NetworkScope::MeshScope("mesh-a".into()));

    let request = StatusSchema::new(ApiVersion::V3).build_request(&resolved);
    let id = request.node.unwrap().id;
    assert!(id.starts_with("projects/123456789/networks/mesh:mesh-a/nodes/"));

    let request = StatusSchema::new(ApiVersion::V2).build_request(&resolved);
    assert!(request.node.is_none());
    assert_eq!(request.node_matchers.len(), 1);
}

#[test]
fn inline_network_conflicts_with_file_mesh_scope() {
    let inline = r#"{"node_matchers": [{"node_metadatas": [{"path": [{"key": "TRAFFICDIRECTOR_NETWORK_NAME"}], "value": {"string_match": {"exact": "default"}}}]}]}"#;
    let err = MatcherResolver::new(Platform::Gcp)
        .resolve(Some(fixture_path("request_mesh.json").as_path()), Some(inline))
        .unwrap_err();

    match err {
        Error::ConflictingFields { first, second } => {
            assert_eq!(first, GCP_NETWORK_NAME_KEY);
            assert_eq!(second, GCP_MESH_SCOPE_KEY);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_project_number() {
    let err = MatcherResolver::new(Platform::Gcp)
        .resolve(None, Some("node_matchers: [{node_id: {exact: a}}]"))
        .unwrap_err();
    assert_eq!(err.to_string(), "missing field TRAFFICDIRECTOR_GCP_PROJECT_NUMBER in NodeMatcher");
}

#[test]
fn missing_request_file_is_io_error() {
    let err = MatcherResolver::new(Platform::Generic)
        .resolve(Some(fixture_path("does-not-exist.yaml").as_path()), None)
        .unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
}

fn string_matcher() -> impl Strategy<Value = StringMatcher> {
    prop_oneof![
        "[a-z]{1,8}".prop_map(StringMatcher::exact),
        "[a-z]{1,8}".prop_map(|p| StringMatcher { prefix: Some(p), ..Default::default() }),
        "[a-z]{1,8}".prop_map(|s| StringMatcher { suffix: Some(s), ..Default::default() }),
    ]
}

fn node_matcher() -> impl Strategy<Value = NodeMatcher> {
    (
        proptest::option::of(string_matcher()),
        proptest::collection::vec(("[A-Z_]{1,12}", "[a-z0-9]{1,8}"), 0..3),
    )
        .prop_map(|(node_id, metadata)| NodeMatcher {
            node_id,
            node_metadatas: metadata
                .into_iter()
                .map(|(k, v)| StructMatcher::key_exact(k, v))
                .collect(),
        })
}

proptest! {
    #[test]
    fn merge_with_empty_overlay_is_identity(base in proptest::collection::vec(node_matcher(), 0..5)) {
        let mut merged = base.clone();
        merge_positional(&mut merged, Vec::new());
        prop_assert_eq!(merged, base);
    }

    #[test]
    fn entries_beyond_overlay_are_untouched(
        base in proptest::collection::vec(node_matcher(), 1..6),
        overlay in proptest::collection::vec(node_matcher(), 0..6),
    ) {
        let mut merged = base.clone();
        merge_positional(&mut merged, overlay.clone());

        prop_assert_eq!(merged.len(), base.len().max(overlay.len()));
        for i in overlay.len()..base.len() {
            prop_assert_eq!(&merged[i], &base[i]);
        }
        for i in base.len()..overlay.len() {
            prop_assert_eq!(&merged[i], &overlay[i]);
        }
    }

    #[test]
    fn merged_metadata_is_concatenated(base in node_matcher(), overlay in node_matcher()) {
        let mut merged = vec![base.clone()];
        merge_positional(&mut merged, vec![overlay.clone()]);

        let expected: Vec<_> =
            base.node_metadatas.iter().chain(overlay.node_metadatas.iter()).cloned().collect();
        prop_assert_eq!(&merged[0].node_metadatas, &expected);
        if overlay.node_id.is_some() {
            prop_assert_eq!(&merged[0].node_id, &overlay.node_id);
        } else {
            prop_assert_eq!(&merged[0].node_id, &base.node_id);
        }
        if let Some(first) = base.node_metadatas.first() {
            let key = &first.path[0].key;
            let alone = [base.clone()];
            prop_assert_eq!(metadata_value(&merged, key), metadata_value(&alone, key));
        }
    }
}
