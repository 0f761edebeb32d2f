//! Block diff engine (§4.3). Management marker lives in `metadata`.
//! Adoption is restricted to a known label vocabulary so a stray
//! user-authored block never gets silently claimed.

use agentsync_api::RemoteResource;

use super::ownership::{classify_remote, MarkerLocation};
use super::{Drift, DiffOptions, DiffResult};
use crate::model::{DesiredState, OwnershipClass, PlanAction, ResourceKind, SkipReason};

/// Canonical memory block labels every agent carries (§4.3).
const CANONICAL_LABELS: &[&str] = &["project", "decisions", "conventions", "glossary", "human", "persona", "managed_state"];

/// Layer/scope prefixes that also make a label adoption-eligible (§4.3).
const ADOPTABLE_PREFIXES: &[&str] = &["base_", "org_", "project_", "user_", "lane_"];

/// Whether a block's label makes it eligible for adoption. Canonical
/// labels, or any label under one of the layer/scope prefixes, may be
/// adopted; anything else is left alone even if its name matches.
#[must_use]
pub fn is_adoptable_label(label: &str) -> bool {
    CANONICAL_LABELS.contains(&label) || ADOPTABLE_PREFIXES.iter().any(|prefix| label.starts_with(prefix))
}

/// Diff all `Block` resources in desired state against a remote listing.
#[must_use]
pub fn diff(desired: &DesiredState, remote: &[RemoteResource], options: &DiffOptions) -> DiffResult {
    let mut result = DiffResult::default();

    let blocks: Vec<_> = desired
        .resources
        .values()
        .filter(|r| r.kind == ResourceKind::Block)
        .filter(|r| match options.layer {
            None => true,
            Some(l) => r.spec.layer == Some(l),
        })
        .filter(|r| options.name_allowed(&r.metadata.name))
        .collect();
    let desired_names: Vec<&str> = blocks.iter().map(|r| r.metadata.name.as_str()).collect();

    for block in &blocks {
        let name = &block.metadata.name;
        let id = block.id();
        if !block.spec.managed {
            result.skipped.push(PlanAction::Skip { id, reason: SkipReason::NotManaged });
            continue;
        }
        match remote.iter().find(|r| &r.name == name) {
            None => result.creates.push(PlanAction::Create { id, desired: (*block).clone() }),
            Some(matched) => {
                let (class, _) = classify_remote(matched, MarkerLocation::Metadata, &desired_names);
                match class {
                    OwnershipClass::Adopted => {
                        if is_adoptable_label(block.spec.str("label").unwrap_or_default()) {
                            let drift = compute_drift(block, matched, options);
                            result.drift_details.insert(name.clone(), drift.clone());
                            result.updates.push(PlanAction::Adopt {
                                id,
                                desired: super::stamp_remote_id(block, &matched.id),
                                drift: drift.iter().map(ToString::to_string).collect(),
                                original_name: matched.name.clone(),
                            });
                        } else {
                            result.skipped.push(PlanAction::Skip { id, reason: SkipReason::Unmanaged });
                        }
                    }
                    OwnershipClass::Managed => {
                        let drift = compute_drift(block, matched, options);
                        if drift.is_empty() {
                            if !options.changes_only {
                                result.skipped.push(PlanAction::Skip { id, reason: SkipReason::NoDrift });
                            }
                        } else {
                            result.drift_details.insert(name.clone(), drift.clone());
                            result.updates.push(PlanAction::Update {
                                id,
                                desired: super::stamp_remote_id(block, &matched.id),
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
            let (class, _) = classify_remote(matched, MarkerLocation::Metadata, &desired_names);
            let id = crate::model::ResourceId::new(ResourceKind::Block, matched.name.clone());
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

    let desired_value = desired.spec.str("value").unwrap_or_default();
    let actual_value = remote.fields.get("value").and_then(serde_json::Value::as_str).unwrap_or_default();
    if desired_value != actual_value {
        drift.push(Drift::new("value", actual_value, desired_value));
    }

    let desired_desc = desired.metadata.description.clone().unwrap_or_default();
    let actual_desc = remote.fields.get("description").and_then(serde_json::Value::as_str).unwrap_or_default();
    if desired_desc != actual_desc {
        drift.push(Drift::new("description", actual_desc, &desired_desc));
    }

    if let Some(desired_limit) = desired.spec.fields.get("limit").and_then(serde_json::Value::as_u64) {
        let actual_limit = remote.fields.get("limit").and_then(serde_json::Value::as_u64).unwrap_or(0);
        if desired_limit != actual_limit {
            drift.push(Drift::new("limit", actual_limit.to_string(), desired_limit.to_string()));
        }
    }

    if let Some(version) = &options.package_version {
        let stamp = crate::metadata::ManagedMetadata::from_metadata_map(&remote.metadata);
        let actual_version = stamp.and_then(|s| s.package_version).unwrap_or_default();
        if &actual_version != version {
            drift.push(Drift::new("package_version", actual_version, version));
        }
    }

    drift
}
