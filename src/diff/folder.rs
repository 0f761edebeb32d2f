//! Folder diff engine (§4.3). Management marker lives in `metadata`, same
//! as blocks. Folders never exist at the base layer (§4.2 constraint).

use agentsync_api::RemoteResource;

use super::ownership::{classify_remote, MarkerLocation};
use super::{Drift, DiffOptions, DiffResult};
use crate::model::{DesiredState, OwnershipClass, PlanAction, ResourceId, ResourceKind, SkipReason};

/// Diff all `Folder` resources in desired state against a remote listing.
#[must_use]
pub fn diff(desired: &DesiredState, remote: &[RemoteResource], options: &DiffOptions) -> DiffResult {
    let mut result = DiffResult::default();

    let folders: Vec<_> = desired
        .resources
        .values()
        .filter(|r| r.kind == ResourceKind::Folder)
        .filter(|r| match options.layer {
            None => true,
            Some(l) => r.spec.layer == Some(l),
        })
        .filter(|r| options.name_allowed(&r.metadata.name))
        .collect();
    let desired_names: Vec<&str> = folders.iter().map(|r| r.metadata.name.as_str()).collect();

    for folder in &folders {
        let name = &folder.metadata.name;
        let id = folder.id();
        if !folder.spec.managed {
            result.skipped.push(PlanAction::Skip { id, reason: SkipReason::NotManaged });
            continue;
        }
        match remote.iter().find(|r| &r.name == name) {
            None => result.creates.push(PlanAction::Create { id, desired: (*folder).clone() }),
            Some(matched) => {
                let (class, _) = classify_remote(matched, MarkerLocation::Metadata, &desired_names);
                match class {
                    OwnershipClass::Adopted => {
                        let drift = compute_drift(folder, matched, options);
                        result.drift_details.insert(name.clone(), drift.clone());
                        result.updates.push(PlanAction::Adopt {
                            id,
                            desired: super::stamp_remote_id(folder, &matched.id),
                            drift: drift.iter().map(ToString::to_string).collect(),
                            original_name: matched.name.clone(),
                        });
                    }
                    OwnershipClass::Managed => {
                        let drift = compute_drift(folder, matched, options);
                        if drift.is_empty() {
                            if !options.changes_only {
                                result.skipped.push(PlanAction::Skip { id, reason: SkipReason::NoDrift });
                            }
                        } else {
                            result.drift_details.insert(name.clone(), drift.clone());
                            result.updates.push(PlanAction::Update {
                                id,
                                desired: super::stamp_remote_id(folder, &matched.id),
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
            let id = ResourceId::new(ResourceKind::Folder, matched.name.clone());
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

    let desired_desc = desired.metadata.description.clone().unwrap_or_default();
    let actual_desc = remote.fields.get("description").and_then(serde_json::Value::as_str).unwrap_or_default();
    if desired_desc != actual_desc {
        drift.push(Drift::new("description", actual_desc, &desired_desc));
    }

    let desired_instructions = desired.spec.str("instructions").unwrap_or_default();
    let actual_instructions = remote.fields.get("instructions").and_then(serde_json::Value::as_str).unwrap_or_default();
    if desired_instructions != actual_instructions {
        drift.push(Drift::new("instructions", actual_instructions, desired_instructions));
    }

    if let Some(desired_model) = desired.spec.path("embeddingConfig.model").and_then(serde_json::Value::as_str) {
        let actual_model = remote
            .fields
            .get("embedding_config")
            .and_then(|v| v.get("model"))
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default();
        if desired_model != actual_model {
            drift.push(Drift::new("embedding_config.model", actual_model, desired_model));
        }
    }

    if let Some(desired_chunk) = desired.spec.path("embeddingConfig.chunkSize").and_then(serde_json::Value::as_u64) {
        let actual_chunk = remote
            .fields
            .get("embedding_config")
            .and_then(|v| v.get("chunk_size"))
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(0);
        if desired_chunk != actual_chunk {
            drift.push(Drift::new("embedding_config.chunk_size", actual_chunk.to_string(), desired_chunk.to_string()));
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
