//! Property-based coverage for the testable properties in §8: merge
//! precedence, tag append-idempotence, and the tag grammar round-trip.

use agentsync::loader::LayeredPackages;
use agentsync::merge::{merge_packages, MergeOptions};
use agentsync::model::{Layer, Package, Resource, SUPPORTED_API_VERSION};
use agentsync::tag::{merge_tags, Tag};
use proptest::prelude::*;

fn scalar_value() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,8}"
}

fn block_with_value(name: &str, layer: Layer, value: &str) -> Resource {
    Resource::from_value(serde_json::json!({
        "apiVersion": SUPPORTED_API_VERSION,
        "kind": "Block",
        "metadata": {"name": name},
        "spec": {"layer": layer.to_string(), "label": "persona", "value": value},
    }))
    .unwrap()
    .unwrap()
}

fn package_of(resource: Resource, layer: Layer) -> Package {
    Package { layer, source: std::path::PathBuf::from("<memory>"), resources: vec![resource] }
}

proptest! {
    /// Property 1 — scalar merge precedence: project overrides org overrides base.
    #[test]
    fn merge_precedence_project_over_org_over_base(
        base_v in scalar_value(), org_v in scalar_value(), project_v in scalar_value(),
        has_org in any::<bool>(), has_project in any::<bool>(),
    ) {
        let mut layered = LayeredPackages::default();
        layered.base = Some(package_of(block_with_value("b", Layer::Base, &base_v), Layer::Base));
        if has_org {
            layered.org = Some(package_of(block_with_value("b", Layer::Org, &org_v), Layer::Org));
        }
        if has_project {
            layered.project = Some(package_of(block_with_value("b", Layer::Project, &project_v), Layer::Project));
        }

        let merged = merge_packages(&layered, &MergeOptions { add_layer_tags: false }).unwrap();
        let resource = merged.desired_state.resources.values().next().unwrap();
        let value = resource.spec.str("value").unwrap();

        let expected = if has_project { &project_v } else if has_org { &org_v } else { &base_v };
        prop_assert_eq!(value, expected.as_str());
    }

    /// Property 2 — merging the same desired/existing tag sets twice is a
    /// no-op the second time.
    #[test]
    fn merge_tags_is_idempotent(
        desired in prop::collection::vec("[a-z][a-z0-9_]{0,6}:[a-z][a-z0-9_]{0,6}", 0..5),
        existing in prop::collection::vec("[a-z][a-z0-9_]{0,6}:[a-z][a-z0-9_]{0,6}", 0..5),
    ) {
        let once = merge_tags(&desired, &existing, true);
        let twice = merge_tags(&desired, &once, true);

        let mut once_sorted = once.clone();
        once_sorted.sort();
        let mut twice_sorted = twice;
        twice_sorted.sort();
        prop_assert_eq!(once_sorted, twice_sorted);
    }

    /// Property 8 — a valid tag always round-trips through parse/format.
    #[test]
    fn tag_grammar_round_trips(
        namespace in "[a-z][a-z0-9-]{0,10}",
        value in "[a-z0-9][a-z0-9-]{0,10}",
        sha in prop::option::of("[a-f0-9]{7,40}"),
    ) {
        let s = match &sha {
            Some(sha) => format!("{namespace}:{value}@{sha}"),
            None => format!("{namespace}:{value}"),
        };
        if let Some(tag) = Tag::parse(&s) {
            prop_assert_eq!(tag.format(), s);
        }
    }
}

#[test]
fn merge_tags_preserves_user_tags_when_requested() {
    let desired = vec!["managed:agentsync".to_owned()];
    let existing = vec!["managed:agentsync".to_owned(), "user:custom".to_owned()];
    let merged = merge_tags(&desired, &existing, true);
    assert!(merged.contains(&"user:custom".to_owned()));
}
