//! The agent upgrade subsystem (§4.5, §4.6, §4.8): resolve a role into a
//! resource bundle, plan the attach/detach/config actions an agent needs
//! to converge onto it, and apply that plan against the remote platform.

pub mod applier;
pub mod planner;
pub mod roles;

pub use applier::{apply_upgrade_plan, can_proceed_with_upgrade, ActionOutcome, ApplyUpgradeOptions, ApplyUpgradeResult, ExecutedAction};
pub use planner::{plan, AgentState, PlanOptions};
pub use roles::{resolve, BuiltinToolset, ResourceBundle, RoleContext};
