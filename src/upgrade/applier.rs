//! The Agent Upgrade Applier (§4.6). Executes an [`UpgradePlan`] against
//! one agent: precondition gate, per-action dispatch with idempotent
//! attach/detach, atomic applied-tag finalization.

use agentsync_api::{AgentsClient, ApiClient, ApiError, RemoteResource};

use crate::model::{AppliedState, AttachableKind, ChangeClass, UpgradeAction, UpgradeActionKind, UpgradePlan, UpgradeType};
use crate::tag;

use super::planner::AgentState;

/// Scoping flags for one apply pass (§4.6 Operation).
#[derive(Clone, Debug, Default)]
pub struct ApplyUpgradeOptions {
    /// Override the breaking/pinned gate.
    pub force: bool,
    /// Compute outcomes but issue no remote calls.
    pub dry_run: bool,
    /// Timestamp (RFC 3339) recorded as `lastUpgradeAt`.
    pub now: String,
}

/// What happened to a single dispatched action.
#[derive(Clone, Debug, PartialEq)]
pub enum ActionOutcome {
    /// The action's remote call succeeded (or was already satisfied).
    Applied,
    /// Withheld: gated by the safety precondition, a predefined skip, or
    /// dry-run.
    NotExecuted {
        /// Why it was withheld.
        reason: String,
    },
    /// The remote call failed.
    Failed {
        /// The error text.
        error: String,
    },
}

/// One action's outcome, carried alongside enough identity to report on.
#[derive(Clone, Debug, PartialEq)]
pub struct ExecutedAction {
    /// The action that was (or wasn't) executed.
    pub action: UpgradeActionKind,
    /// Which attachable kind it concerned.
    pub resource_kind: AttachableKind,
    /// The resource's manifest name, for reporting.
    pub resource_name: String,
    /// What happened.
    pub outcome: ActionOutcome,
}

/// The full result of applying one agent's upgrade plan.
#[derive(Clone, Debug, PartialEq)]
pub struct ApplyUpgradeResult {
    /// The plan this result executed.
    pub plan_id: String,
    /// The agent this result concerns.
    pub agent_id: String,
    /// True only if no action failed and nothing was withheld by gating.
    pub success: bool,
    /// Whether this was a dry run (no remote calls at all).
    pub dry_run: bool,
    /// The agent's applied-version record after this pass.
    pub applied_state: AppliedState,
    /// Per-action outcomes, in plan order.
    pub results: Vec<ExecutedAction>,
    /// Breaking actions withheld by the safety gate.
    pub skipped_actions: Vec<UpgradeAction>,
    /// Fatal errors that stopped the whole pass, if any.
    pub errors: Vec<String>,
}

/// Whether a plan may proceed without `force` (§4.6 Precondition check).
///
/// # Errors
/// Returns the human-readable refusal reason.
pub fn can_proceed_with_upgrade(plan: &UpgradePlan, force: bool) -> Result<(), String> {
    if force {
        return Ok(());
    }
    if plan.channel == crate::model::Channel::Pinned {
        return Err("pinned channel requires --force".to_owned());
    }
    if plan.has_breaking_changes {
        return Err("breaking change requires --force".to_owned());
    }
    Ok(())
}

/// Apply an upgrade plan to one agent (§4.6 Operation).
///
/// Safe actions always execute. Breaking actions execute only when
/// [`can_proceed_with_upgrade`] permits it; otherwise they land in
/// `skipped_actions` and `success` is forced to `false`.
pub fn apply_upgrade_plan<C: ApiClient>(
    client: &C,
    agent: &AgentState,
    plan: &UpgradePlan,
    options: &ApplyUpgradeOptions,
) -> ApplyUpgradeResult {
    let gate = can_proceed_with_upgrade(plan, options.force);
    let mut results = Vec::new();
    let mut skipped_actions = Vec::new();
    let mut any_failed = false;

    for action in &plan.actions {
        if action.action == UpgradeActionKind::Skip {
            results.push(ExecutedAction {
                action: action.action,
                resource_kind: action.resource_kind,
                resource_name: action.resource_name.clone(),
                outcome: ActionOutcome::NotExecuted { reason: action.reason.clone() },
            });
            continue;
        }

        if action.class == ChangeClass::Breaking {
            if let Err(reason) = &gate {
                skipped_actions.push(action.clone());
                results.push(ExecutedAction {
                    action: action.action,
                    resource_kind: action.resource_kind,
                    resource_name: action.resource_name.clone(),
                    outcome: ActionOutcome::NotExecuted { reason: reason.clone() },
                });
                continue;
            }
        }

        if options.dry_run {
            results.push(ExecutedAction {
                action: action.action,
                resource_kind: action.resource_kind,
                resource_name: action.resource_name.clone(),
                outcome: ActionOutcome::NotExecuted { reason: "dry run".to_owned() },
            });
            continue;
        }

        let outcome = execute(client, &agent.agent_id, action);
        if matches!(outcome, ActionOutcome::Failed { .. }) {
            any_failed = true;
        }
        results.push(ExecutedAction {
            action: action.action,
            resource_kind: action.resource_kind,
            resource_name: action.resource_name.clone(),
            outcome,
        });
    }

    let applied_state = build_applied_state(plan, options);

    if !options.dry_run {
        finalize(client, agent, plan, gate.is_ok());
    }

    ApplyUpgradeResult {
        plan_id: plan.plan_id.clone(),
        agent_id: agent.agent_id.clone(),
        success: !any_failed && skipped_actions.is_empty(),
        dry_run: options.dry_run,
        applied_state,
        results,
        skipped_actions,
        errors: Vec::new(),
    }
}

fn execute<C: ApiClient>(client: &C, agent_id: &str, action: &UpgradeAction) -> ActionOutcome {
    let resource_id = action.resource_id.as_deref().unwrap_or_default();
    let result = match (action.action, action.resource_kind) {
        (UpgradeActionKind::Attach, AttachableKind::Block) => client.agents().attach_block(agent_id, resource_id),
        (UpgradeActionKind::Detach, AttachableKind::Block) => tolerate_not_found(client.agents().detach_block(agent_id, resource_id)),
        (UpgradeActionKind::Attach, AttachableKind::Tool) => client.agents().attach_tool(agent_id, resource_id),
        (UpgradeActionKind::Detach, AttachableKind::Tool) => tolerate_not_found(client.agents().detach_tool(agent_id, resource_id)),
        (UpgradeActionKind::Attach, AttachableKind::Folder) => client.agents().attach_folder(agent_id, resource_id),
        (UpgradeActionKind::Detach, AttachableKind::Folder) => tolerate_not_found(client.agents().detach_folder(agent_id, resource_id)),
        (UpgradeActionKind::Attach, AttachableKind::Identity) => client.agents().attach_identity(agent_id, resource_id),
        (UpgradeActionKind::Detach, AttachableKind::Identity) => {
            tolerate_not_found(client.agents().detach_identity(agent_id, resource_id))
        }
        (UpgradeActionKind::UpdateConfig, _) => Ok(()),
        _ => return ActionOutcome::Failed { error: "unsupported action type".to_owned() },
    };
    match result {
        Ok(()) => ActionOutcome::Applied,
        Err(e) => ActionOutcome::Failed { error: e.to_string() },
    }
}

/// Detaching something already gone is a success, not a failure (§4.6
/// Idempotency: "block lookups must tolerate not found on detach").
fn tolerate_not_found(result: Result<(), ApiError>) -> Result<(), ApiError> {
    match result {
        Err(ApiError::NotFound(_)) => Ok(()),
        other => other,
    }
}

fn build_applied_state(plan: &UpgradePlan, options: &ApplyUpgradeOptions) -> AppliedState {
    let mut applied_packages = std::collections::BTreeMap::new();
    for (layer, sha) in &plan.target_versions {
        applied_packages.insert(*layer, sha.clone());
    }
    let upgrade_type = if options.force {
        UpgradeType::BreakingManual
    } else {
        UpgradeType::SafeAuto
    };
    AppliedState {
        applied_packages,
        last_upgrade_type: Some(upgrade_type),
        last_upgrade_at: Some(options.now.clone()),
    }
}

/// Write applied-version tags atomically, plus role/channel/management
/// tags, after every non-gated action has run (§4.6 Finalization).
fn finalize<C: ApiClient>(client: &C, agent: &AgentState, plan: &UpgradePlan, gate_passed: bool) {
    if !gate_passed && plan.has_breaking_changes {
        return;
    }

    let mut tags = agent.tags.clone();
    for (layer, sha) in &plan.target_versions {
        tags = tag::update_applied_tags(&tags, &layer.to_string(), sha);
    }

    let mut desired_management_tags = vec![
        format!("managed:{}", crate::model::RECONCILER_ID),
        format!("role:{}", plan.role.tag_value()),
        format!("channel:{}", plan.channel),
    ];
    desired_management_tags.extend(tags.iter().filter(|t| t.starts_with("applied:")).cloned());

    let merged = tag::merge_tags(&desired_management_tags, &agent.tags, true);

    let mut body = RemoteResource::new(agent.agent_id.clone(), agent.name.clone());
    body.tags = merged;
    let _ = client.agents().update(&agent.agent_id, &body);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Channel, Role, UpgradeSummary};
    use std::collections::BTreeMap;

    fn sample_plan(has_breaking: bool) -> UpgradePlan {
        let mut actions = vec![UpgradeAction {
            action: UpgradeActionKind::Attach,
            resource_kind: AttachableKind::Block,
            resource_id: Some("b1".to_owned()),
            resource_name: "decisions".to_owned(),
            class: ChangeClass::Safe,
            reason: "missing".to_owned(),
        }];
        if has_breaking {
            actions.push(UpgradeAction {
                action: UpgradeActionKind::Detach,
                resource_kind: AttachableKind::Tool,
                resource_id: Some("t1".to_owned()),
                resource_name: "old-tool".to_owned(),
                class: ChangeClass::Breaking,
                reason: "removed".to_owned(),
            });
        }
        UpgradePlan {
            plan_id: "plan-1".to_owned(),
            agent_id: "a1".to_owned(),
            role: Role::LaneDev,
            channel: Channel::Stable,
            target_versions: BTreeMap::new(),
            actions,
            summary: UpgradeSummary::default(),
            has_breaking_changes: has_breaking,
            is_up_to_date: false,
            errors: vec![],
            warnings: vec![],
        }
    }

    #[test]
    fn safe_plan_proceeds_without_force() {
        assert!(can_proceed_with_upgrade(&sample_plan(false), false).is_ok());
    }

    #[test]
    fn breaking_plan_refused_without_force() {
        assert!(can_proceed_with_upgrade(&sample_plan(true), false).is_err());
    }

    #[test]
    fn breaking_plan_proceeds_with_force() {
        assert!(can_proceed_with_upgrade(&sample_plan(true), true).is_ok());
    }

    #[test]
    fn pinned_channel_refused_without_force_even_if_otherwise_safe() {
        let mut plan = sample_plan(false);
        plan.channel = Channel::Pinned;
        let err = can_proceed_with_upgrade(&plan, false).unwrap_err();
        assert!(err.contains("pinned"));
    }
}
