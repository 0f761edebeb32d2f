//! The Reconcile Planner (§4.4): stitches the per-kind diff engines into
//! one [`ReconcilePlan`], gating deletes behind `allow_delete`.

use agentsync_api::RemoteResource;

use crate::diff::{self, DiffOptions};
use crate::model::{DesiredState, PlanAction, ReconcilePlan, SkipReason};

/// The remote listing each per-kind diff engine needs. MCP servers are
/// excluded — they are observed, never reconciled (§4.3).
#[derive(Clone, Debug, Default)]
pub struct RemoteInventory {
    /// Remote blocks, across every agent or org scope queried.
    pub blocks: Vec<RemoteResource>,
    /// Remote tools.
    pub tools: Vec<RemoteResource>,
    /// Remote folders.
    pub folders: Vec<RemoteResource>,
}

/// Options controlling what the planner is allowed to propose.
#[derive(Clone, Debug, Default)]
pub struct ReconcileOptions {
    /// Whether orphaned/managed resources may be proposed for deletion.
    /// When `false`, every delete is downgraded to a skip (§4.4).
    pub allow_delete: bool,
    /// Filters forwarded to each per-kind diff engine.
    pub diff_options: DiffOptions,
}

/// Build a full reconcile plan across blocks, tools, and folders.
#[must_use]
pub fn plan(desired: &DesiredState, remote: &RemoteInventory, options: &ReconcileOptions) -> ReconcilePlan {
    let mut merged = ReconcilePlan::default();

    for result in [
        diff::block::diff(desired, &remote.blocks, &options.diff_options),
        diff::tool::diff(desired, &remote.tools, &options.diff_options),
        diff::folder::diff(desired, &remote.folders, &options.diff_options),
    ] {
        merged.creates.extend(result.creates);
        merged.updates.extend(result.updates);
        merged.skipped.extend(result.skipped);

        for action in result.deletes {
            if options.allow_delete {
                merged.deletes.push(action);
            } else {
                merged.skipped.push(PlanAction::Skip {
                    id: action.id().clone(),
                    reason: SkipReason::DeleteNotAllowed,
                });
            }
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Layer, Resource, SUPPORTED_API_VERSION};
    use serde_json::json;
    use std::collections::HashMap;

    fn block(name: &str) -> Resource {
        Resource::from_value(json!({
            "apiVersion": SUPPORTED_API_VERSION,
            "kind": "Block",
            "metadata": {"name": name},
            "spec": {"layer": "base", "label": "persona", "value": "v1"},
        }))
        .unwrap()
        .unwrap()
    }

    fn desired_with(resources: Vec<Resource>) -> DesiredState {
        let mut d = DesiredState::new();
        for r in resources {
            d.insert(r, vec![Layer::Base]);
        }
        d
    }

    #[test]
    fn delete_without_allow_delete_becomes_a_skip() {
        let desired = desired_with(vec![]);
        let mut meta = HashMap::new();
        meta.insert("managed_by".to_owned(), json!("agentsync"));
        let remote = RemoteInventory {
            blocks: vec![RemoteResource::new("r1", "leftover").with_metadata(meta)],
            ..Default::default()
        };
        let result = plan(&desired, &remote, &ReconcileOptions::default());
        assert!(result.deletes.is_empty());
        assert!(result
            .skipped
            .iter()
            .any(|a| matches!(a, PlanAction::Skip { reason: SkipReason::DeleteNotAllowed, .. })));
    }

    #[test]
    fn delete_with_allow_delete_is_proposed() {
        let desired = desired_with(vec![]);
        let mut meta = HashMap::new();
        meta.insert("managed_by".to_owned(), json!("agentsync"));
        let remote = RemoteInventory {
            blocks: vec![RemoteResource::new("r1", "leftover").with_metadata(meta)],
            ..Default::default()
        };
        let options = ReconcileOptions { allow_delete: true, ..Default::default() };
        let result = plan(&desired, &remote, &options);
        assert_eq!(result.deletes.len(), 1);
    }

    #[test]
    fn create_is_proposed_for_new_block() {
        let desired = desired_with(vec![block("decisions")]);
        let remote = RemoteInventory::default();
        let result = plan(&desired, &remote, &ReconcileOptions::default());
        assert_eq!(result.creates.len(), 1);
    }
}
