//! The reconcile planner's output (§4.4 Reconcile planning).

use std::fmt;

use super::ownership::OwnershipClass;
use super::resource::Resource;
use super::types::ResourceId;

/// Why a planned action was skipped instead of executed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// The resource is `unmanaged` — never touched.
    Unmanaged,
    /// The resource would be deleted but `allow_delete` was not set.
    DeleteNotAllowed,
    /// The manifest marked the resource `managed: false`.
    NotManaged,
    /// The desired and observed states are already identical.
    NoDrift,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unmanaged => "resource is unmanaged",
            Self::DeleteNotAllowed => "delete requires allow_delete",
            Self::NotManaged => "resource is marked managed: false",
            Self::NoDrift => "no drift from desired state",
        };
        f.write_str(s)
    }
}

/// A single planned mutation, or a recorded reason one was withheld.
#[derive(Clone, Debug, PartialEq)]
pub enum PlanAction {
    /// Create a resource that does not exist remotely.
    Create {
        /// Identity of the resource to create.
        id: ResourceId,
        /// The desired resource to send to the remote.
        desired: Resource,
    },
    /// Update a resource that exists but has drifted.
    Update {
        /// Identity of the resource to update.
        id: ResourceId,
        /// The desired resource to converge towards.
        desired: Resource,
        /// Human-readable field-level drift description.
        drift: Vec<String>,
    },
    /// Bring an unmanaged remote under management: stamp metadata and
    /// apply any content drift in the same operation (§4.4).
    Adopt {
        /// Identity of the resource to adopt.
        id: ResourceId,
        /// The desired resource to converge towards.
        desired: Resource,
        /// Human-readable field-level drift description.
        drift: Vec<String>,
        /// The remote's current name/label, preserved as `original_name`.
        original_name: String,
    },
    /// Delete a resource no manifest claims any more.
    Delete {
        /// Identity of the resource to delete.
        id: ResourceId,
        /// The remote platform's opaque id for this resource.
        remote_id: String,
        /// Ownership class backing the decision to allow deletion.
        ownership: OwnershipClass,
    },
    /// An action that was considered but withheld.
    Skip {
        /// Identity of the resource that was not acted on.
        id: ResourceId,
        /// Why it was skipped.
        reason: SkipReason,
    },
}

impl PlanAction {
    /// The resource identity this action concerns.
    #[must_use]
    pub fn id(&self) -> &ResourceId {
        match self {
            Self::Create { id, .. }
            | Self::Update { id, .. }
            | Self::Adopt { id, .. }
            | Self::Delete { id, .. }
            | Self::Skip { id, .. } => id,
        }
    }
}

/// The full reconcile plan, bucketed by action kind for easy reporting
/// and for the apply executor to walk in creates-then-updates-then-deletes
/// order (§4.4).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReconcilePlan {
    /// Resources to create.
    pub creates: Vec<PlanAction>,
    /// Resources to update.
    pub updates: Vec<PlanAction>,
    /// Resources to delete.
    pub deletes: Vec<PlanAction>,
    /// Actions considered and withheld.
    pub skipped: Vec<PlanAction>,
}

impl ReconcilePlan {
    /// Total number of mutating actions (creates + updates + deletes).
    #[must_use]
    pub fn mutation_count(&self) -> usize {
        self.creates.len() + self.updates.len() + self.deletes.len()
    }

    /// Whether the plan has nothing to do.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mutation_count() == 0
    }

    /// Iterate every action across all buckets, in apply order.
    pub fn all_actions(&self) -> impl Iterator<Item = &PlanAction> {
        self.creates
            .iter()
            .chain(self.updates.iter())
            .chain(self.deletes.iter())
            .chain(self.skipped.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::ResourceKind;

    #[test]
    fn empty_plan_has_no_mutations() {
        assert!(ReconcilePlan::default().is_empty());
    }

    #[test]
    fn mutation_count_excludes_skips() {
        let id = ResourceId::new(ResourceKind::Block, "x");
        let mut plan = ReconcilePlan::default();
        plan.skipped.push(PlanAction::Skip {
            id: id.clone(),
            reason: SkipReason::NoDrift,
        });
        assert_eq!(plan.mutation_count(), 0);
        assert!(plan.is_empty());
    }

    #[test]
    fn all_actions_preserves_bucket_order() {
        let id = ResourceId::new(ResourceKind::Block, "x");
        let mut plan = ReconcilePlan::default();
        plan.deletes.push(PlanAction::Delete {
            id: id.clone(),
            remote_id: "r1".to_owned(),
            ownership: OwnershipClass::Managed,
        });
        plan.skipped.push(PlanAction::Skip {
            id: id.clone(),
            reason: SkipReason::Unmanaged,
        });
        let kinds: Vec<_> = plan.all_actions().collect();
        assert_eq!(kinds.len(), 2);
    }
}
