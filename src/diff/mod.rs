//! Diff Engines (§4.3): one per resource kind, each comparing a
//! [`DesiredState`](crate::model::DesiredState) entry against the matching
//! [`RemoteResource`](agentsync_api::RemoteResource) and producing typed
//! [`PlanAction`](crate::model::PlanAction)s plus per-field drift.

pub mod block;
pub mod folder;
pub mod mcp;
mod ownership;
pub mod tool;

pub use ownership::classify_remote;

use std::collections::BTreeMap;

use crate::model::{Layer, Resource, ResourceStatus};

/// Clone a desired resource and stamp the remote id matched against it, so
/// the apply executor knows which remote record an `Update`/`Adopt`
/// targets without re-querying by name.
#[must_use]
pub fn stamp_remote_id(resource: &Resource, remote_id: &str) -> Resource {
    let mut stamped = resource.clone();
    let mut status = stamped.status.unwrap_or_default();
    status.remote_id = Some(remote_id.to_owned());
    stamped.status = Some(status);
    stamped
}

/// A single drifted field, carried for display/reporting (§4.3).
#[derive(Clone, Debug, PartialEq)]
pub struct Drift {
    /// What drifted: `"value"`, `"description"`, `"source_code"`, ...
    pub field: String,
    /// The remote's current value, rendered for display.
    pub actual: String,
    /// The manifest's desired value, rendered for display.
    pub desired: String,
}

impl Drift {
    /// Build a drift record.
    #[must_use]
    pub fn new(field: impl Into<String>, actual: impl Into<String>, desired: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            actual: actual.into(),
            desired: desired.into(),
        }
    }
}

impl std::fmt::Display for Drift {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {:?} -> {:?}", self.field, self.actual, self.desired)
    }
}

/// Filters accepted by every diff engine (§4.3 Operations).
#[derive(Clone, Debug, Default)]
pub struct DiffOptions {
    /// Include orphaned remote resources (not in desired state) in the
    /// result. Defaults to `true`.
    pub include_orphans: bool,
    /// Only report resources that actually drifted; suppress in-sync ones.
    pub changes_only: bool,
    /// Restrict to resources whose desired layer matches.
    pub layer: Option<Layer>,
    /// Restrict to these resource names.
    pub names: Option<Vec<String>>,
    /// The manifest package version (sha) being diffed against, stamped
    /// into any `Create`/`Update`/`Adopt` action's desired metadata.
    pub package_version: Option<String>,
}

impl DiffOptions {
    /// The default options: orphans included, all resources, no filters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            include_orphans: true,
            ..Default::default()
        }
    }

    fn name_allowed(&self, name: &str) -> bool {
        match &self.names {
            None => true,
            Some(names) => names.iter().any(|n| n == name),
        }
    }
}

/// The result of diffing one resource kind across desired state and the
/// remote listing.
#[derive(Clone, Debug, Default)]
pub struct DiffResult {
    /// Actions to create a resource that exists only in desired state.
    pub creates: Vec<crate::model::PlanAction>,
    /// Actions to update or adopt a resource that exists in both.
    pub updates: Vec<crate::model::PlanAction>,
    /// Actions to delete (or skip deleting) an orphaned remote resource.
    pub deletes: Vec<crate::model::PlanAction>,
    /// Actions explicitly skipped, with a reason.
    pub skipped: Vec<crate::model::PlanAction>,
    /// Drift details keyed by resource name, for resources under `updates`.
    pub drift_details: BTreeMap<String, Vec<Drift>>,
}

impl DiffResult {
    /// Merge all four buckets into one [`crate::model::ReconcilePlan`].
    #[must_use]
    pub fn into_plan(self) -> crate::model::ReconcilePlan {
        crate::model::ReconcilePlan {
            creates: self.creates,
            updates: self.updates,
            deletes: self.deletes,
            skipped: self.skipped,
        }
    }
}
