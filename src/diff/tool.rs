//! Tool diff engine (§4.3). Management marker and all other metadata live
//! in tags, not a `metadata` object — tools only expose `tags` remotely.

use agentsync_api::RemoteResource;

use super::ownership::{classify_remote, MarkerLocation};
use super::{Drift, DiffOptions, DiffResult};
use crate::model::{DesiredState, OwnershipClass, PlanAction, ResourceId, ResourceKind, SkipReason};
use crate::tag::{self, TagDiffOptions};

/// Diff all `Tool` resources in desired state against a remote listing.
#[must_use]
pub fn diff(desired: &DesiredState, remote: &[RemoteResource], options: &DiffOptions) -> DiffResult {
    let mut result = DiffResult::default();

    let tools: Vec<_> = desired
        .resources
        .values()
        .filter(|r| r.kind == ResourceKind::Tool)
        .filter(|r| match options.layer {
            None => true,
            Some(l) => r.spec.layer == Some(l),
        })
        .filter(|r| options.name_allowed(&r.metadata.name))
        .collect();
    let desired_names: Vec<&str> = tools.iter().map(|r| r.metadata.name.as_str()).collect();

    for t in &tools {
        let name = &t.metadata.name;
        let id = t.id();
        if !t.spec.managed {
            result.skipped.push(PlanAction::Skip { id, reason: SkipReason::NotManaged });
            continue;
        }
        match remote.iter().find(|r| &r.name == name) {
            None => result.creates.push(PlanAction::Create { id, desired: (*t).clone() }),
            Some(matched) => {
                let (class, _) = classify_remote(matched, MarkerLocation::Tags, &desired_names);
                match class {
                    OwnershipClass::Adopted => {
                        let drift = compute_drift(t, matched, options);
                        result.drift_details.insert(name.clone(), drift.clone());
                        result.updates.push(PlanAction::Adopt {
                            id,
                            desired: super::stamp_remote_id(t, &matched.id),
                            drift: drift.iter().map(ToString::to_string).collect(),
                            original_name: matched.name.clone(),
                        });
                    }
                    OwnershipClass::Managed => {
                        let drift = compute_drift(t, matched, options);
                        if drift.is_empty() {
                            if !options.changes_only {
                                result.skipped.push(PlanAction::Skip { id, reason: SkipReason::NoDrift });
                            }
                        } else {
                            result.drift_details.insert(name.clone(), drift.clone());
                            result.updates.push(PlanAction::Update {
                                id,
                                desired: super::stamp_remote_id(t, &matched.id),
                                drift: drift.iter().map(ToString::to_string).collect(),
                            });
                        }
                    }
                    OwnershipClass::Orphaned | OwnershipClass::Unmanaged => unreachable!(
                        "a remote resource matched by name against desired state always has a desired match"
                    ),
                }
            }
        }
    }

    if options.include_orphans {
        for matched in remote {
            if desired_names.contains(&matched.name.as_str()) {
                continue;
            }
            let (class, _) = classify_remote(matched, MarkerLocation::Tags, &desired_names);
            let id = ResourceId::new(ResourceKind::Tool, matched.name.clone());
            match class {
                OwnershipClass::Orphaned => {
                    result.deletes.push(PlanAction::Delete { id, remote_id: matched.id.clone(), ownership: OwnershipClass::Orphaned });
                }
                OwnershipClass::Unmanaged => {
                    result.skipped.push(PlanAction::Skip { id, reason: SkipReason::Unmanaged });
                }
                OwnershipClass::Managed | OwnershipClass::Adopted => unreachable!(
                    "a remote resource with no name match can only be orphaned or unmanaged"
                ),
            }
        }
    }

    result
}

fn compute_drift(desired: &crate::model::Resource, remote: &RemoteResource, options: &DiffOptions) -> Vec<Drift> {
    let mut drift = Vec::new();

    let desired_source = desired.spec.str("sourceCode").unwrap_or_default();
    let actual_source = remote.fields.get("source_code").and_then(serde_json::Value::as_str).unwrap_or_default();
    if desired_source != actual_source {
        drift.push(Drift::new("source_code", actual_source, desired_source));
    }

    let desired_desc = desired.metadata.description.clone().unwrap_or_default();
    let actual_desc = remote.fields.get("description").and_then(serde_json::Value::as_str).unwrap_or_default();
    if desired_desc != actual_desc {
        drift.push(Drift::new("description", actual_desc, &desired_desc));
    }

    if let Some(desired_schema) = desired.spec.fields.get("jsonSchema") {
        let actual_schema = remote.fields.get("json_schema").cloned().unwrap_or(serde_json::Value::Null);
        if desired_schema != &actual_schema {
            drift.push(Drift::new("json_schema", actual_schema.to_string(), desired_schema.to_string()));
        }
    }

    let desired_type = desired.spec.str("toolType").unwrap_or_default();
    let actual_type = remote.fields.get("tool_type").and_then(serde_json::Value::as_str).unwrap_or_default();
    if desired_type != actual_type {
        drift.push(Drift::new("tool_type", actual_type, desired_type));
    }

    let desired_tags = crate::metadata::ManagedMetadata {
        managed_by: crate::model::RECONCILER_ID.to_owned(),
        layer: desired.spec.layer.unwrap_or(crate::model::Layer::Base),
        package_version: options.package_version.clone(),
        ..Default::default()
    }
    .to_tags();
    let tag_diff = tag::diff(&desired_tags, &remote.tags, &TagDiffOptions { management_only: true, ..Default::default() });
    if !tag_diff.to_add.is_empty() || !tag_diff.to_remove.is_empty() {
        drift.push(Drift::new(
            "tags",
            remote.tags.join(","),
            desired_tags.join(","),
        ));
    }

    drift
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Resource, SUPPORTED_API_VERSION};
    use serde_json::json;

    fn tool(name: &str, source: &str) -> Resource {
        Resource::from_value(json!({
            "apiVersion": SUPPORTED_API_VERSION,
            "kind": "Tool",
            "metadata": {"name": name},
            "spec": {"layer": "org", "toolType": "custom", "sourceType": "python", "sourceCode": source},
        }))
        .unwrap()
        .unwrap()
    }

    fn desired_with(resources: Vec<Resource>) -> DesiredState {
        let mut d = DesiredState::new();
        for r in resources {
            d.insert(r, vec![crate::model::Layer::Org]);
        }
        d
    }

    #[test]
    fn missing_remote_is_a_create() {
        let desired = desired_with(vec![tool("search", "def f(): pass")]);
        let result = diff(&desired, &[], &DiffOptions::new());
        assert_eq!(result.creates.len(), 1);
    }

    #[test]
    fn unmarked_tool_is_always_adoptable() {
        let desired = desired_with(vec![tool("search", "def f(): pass")]);
        let remote = RemoteResource::new("r1", "search").with_field("source_code", json!("def f(): pass"));
        let result = diff(&desired, &[remote], &DiffOptions::new());
        assert_eq!(result.updates.len(), 1);
        assert!(matches!(result.updates[0], PlanAction::Adopt { .. }));
    }

    #[test]
    fn drifted_source_with_managed_tag_is_an_update() {
        let desired = desired_with(vec![tool("search", "def f(): return 2")]);
        let remote = RemoteResource::new("r1", "search")
            .with_tags(vec!["managed:agentsync".to_owned(), "layer:org".to_owned()])
            .with_field("source_code", json!("def f(): return 1"));
        let result = diff(&desired, &[remote], &DiffOptions::new());
        assert_eq!(result.updates.len(), 1);
    }

    #[test]
    fn orphaned_managed_tool_becomes_a_delete() {
        let desired = desired_with(vec![]);
        let remote = RemoteResource::new("r1", "leftover").with_tags(vec!["managed:agentsync".to_owned()]);
        let result = diff(&desired, &[remote], &DiffOptions::new());
        assert_eq!(result.deletes.len(), 1);
    }
}
