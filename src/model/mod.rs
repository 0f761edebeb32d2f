//! The manifest domain model: resources, packages, merged desired state,
//! ownership classification, reconcile plans, and agent upgrade plans.

pub mod desired_state;
pub mod ownership;
pub mod package;
pub mod plan;
pub mod resource;
pub mod types;
pub mod upgrade;

pub use desired_state::DesiredState;
pub use ownership::OwnershipClass;
pub use package::Package;
pub use plan::{PlanAction, ReconcilePlan, SkipReason};
pub use resource::{Metadata, MergeStrategy, Resource, ResourceStatus, Spec};
pub use types::{ErrorKind, Layer, ResourceId, ResourceKind, ValidationError, RECONCILER_ID, SUPPORTED_API_VERSION};
pub use upgrade::{
    AppliedState, AttachableKind, Channel, ChangeClass, Role, UpgradeAction, UpgradeActionKind,
    UpgradePlan, UpgradeSummary, UpgradeType,
};
