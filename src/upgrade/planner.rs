//! The Agent Upgrade Planner (§4.5). Computes, for one agent, the attach/
//! update/detach actions needed to converge it onto its role's resource
//! bundle and the requested channel/target versions. Pure — no remote
//! calls; the Applier (§4.6) executes what this produces.

use std::collections::{BTreeMap, BTreeSet};

use sha2::{Digest, Sha256};

use crate::model::{
    AttachableKind, ChangeClass, Channel, Layer, ResourceId, Role, UpgradeAction, UpgradeActionKind, UpgradePlan,
    UpgradeSummary,
};

use super::roles::ResourceBundle;

/// What the planner knows about one agent's current remote state.
#[derive(Clone, Debug, Default)]
pub struct AgentState {
    /// The agent's remote id.
    pub agent_id: String,
    /// The agent's display name, for reporting.
    pub name: String,
    /// The agent's current namespaced tags.
    pub tags: Vec<String>,
    /// Remote ids of blocks currently attached.
    pub attached_blocks: BTreeSet<String>,
    /// Remote ids of tools currently attached.
    pub attached_tools: BTreeSet<String>,
    /// Remote ids of folders currently attached.
    pub attached_folders: BTreeSet<String>,
}

/// Scoping and target-version inputs for one plan (§4.5 Inputs).
#[derive(Clone, Debug)]
pub struct PlanOptions {
    /// The role this agent resolves to.
    pub role: Role,
    /// The channel this agent is on.
    pub channel: Channel,
    /// The commit sha targeted per layer.
    pub target_versions: BTreeMap<Layer, String>,
}

/// Compute an [`UpgradePlan`] for one agent (§4.5 Process).
///
/// `remote_ids` maps a bundle member's manifest identity to the remote id
/// it was created under; a bundle member with no entry here has not been
/// reconciled yet and is recorded as a skip, not an attach.
#[must_use]
pub fn plan(
    agent: &AgentState,
    bundle: &ResourceBundle,
    remote_ids: &BTreeMap<ResourceId, String>,
    options: &PlanOptions,
) -> UpgradePlan {
    let mut actions = Vec::new();

    plan_kind(&bundle.blocks, &agent.attached_blocks, remote_ids, AttachableKind::Block, &mut actions);
    plan_kind(&bundle.tools, &agent.attached_tools, remote_ids, AttachableKind::Tool, &mut actions);
    plan_kind(&bundle.folders, &agent.attached_folders, remote_ids, AttachableKind::Folder, &mut actions);

    if let Some(config_action) = config_drift(agent, options) {
        actions.push(config_action);
    }

    let mut summary = UpgradeSummary::default();
    for action in &actions {
        if action.action != UpgradeActionKind::Skip {
            summary.record(action);
        }
    }

    let has_detach = actions.iter().any(|a| a.action == UpgradeActionKind::Detach);
    let has_breaking_changes = has_detach || options.channel == Channel::Pinned;
    let is_up_to_date = summary.total_changes() == 0;

    UpgradePlan {
        plan_id: compute_plan_id(agent, options),
        agent_id: agent.agent_id.clone(),
        role: options.role.clone(),
        channel: options.channel,
        target_versions: options.target_versions.clone(),
        actions,
        summary,
        has_breaking_changes,
        is_up_to_date,
        errors: Vec::new(),
        warnings: Vec::new(),
    }
}

/// Compute the attach/detach actions for one attachable kind: a manifest
/// member not yet reconciled (no `remote_ids` entry) is recorded as a
/// skip rather than an attach, since there is nothing to attach yet.
fn plan_kind(
    should_be_attached: &[ResourceId],
    attached: &BTreeSet<String>,
    remote_ids: &BTreeMap<ResourceId, String>,
    kind: AttachableKind,
    actions: &mut Vec<UpgradeAction>,
) {
    let mut desired_remote_ids: BTreeSet<String> = BTreeSet::new();

    for id in should_be_attached {
        match remote_ids.get(id) {
            None => actions.push(UpgradeAction {
                action: UpgradeActionKind::Skip,
                resource_kind: kind,
                resource_id: None,
                resource_name: id.name.clone(),
                class: ChangeClass::Safe,
                reason: "not yet reconciled to the remote; nothing to attach".to_owned(),
            }),
            Some(remote_id) => {
                desired_remote_ids.insert(remote_id.clone());
                if !attached.contains(remote_id) {
                    actions.push(UpgradeAction {
                        action: UpgradeActionKind::Attach,
                        resource_kind: kind,
                        resource_id: Some(remote_id.clone()),
                        resource_name: id.name.clone(),
                        class: ChangeClass::Safe,
                        reason: "missing from agent's role bundle".to_owned(),
                    });
                }
            }
        }
    }

    for remote_id in attached {
        if !desired_remote_ids.contains(remote_id) {
            actions.push(UpgradeAction {
                action: UpgradeActionKind::Detach,
                resource_kind: kind,
                resource_id: Some(remote_id.clone()),
                resource_name: remote_id.clone(),
                class: ChangeClass::Breaking,
                reason: "no longer part of the agent's role bundle".to_owned(),
            });
        }
    }
}

fn config_drift(agent: &AgentState, options: &PlanOptions) -> Option<UpgradeAction> {
    let desired_role_tag = format!("role:{}", options.role.tag_value());
    let desired_channel_tag = format!("channel:{}", options.channel);
    let needs_update = !agent.tags.iter().any(|t| t == &desired_role_tag) || !agent.tags.iter().any(|t| t == &desired_channel_tag);
    if !needs_update {
        return None;
    }
    let class = if options.channel == Channel::Pinned {
        ChangeClass::Breaking
    } else {
        ChangeClass::Safe
    };
    Some(UpgradeAction {
        action: UpgradeActionKind::UpdateConfig,
        resource_kind: AttachableKind::Identity,
        resource_id: None,
        resource_name: agent.name.clone(),
        class,
        reason: format!("role/channel tags drifted (role:{}, channel:{})", options.role.tag_value(), options.channel),
    })
}

fn compute_plan_id(agent: &AgentState, options: &PlanOptions) -> String {
    let mut hasher = Sha256::new();
    hasher.update(agent.agent_id.as_bytes());
    hasher.update(options.role.tag_value().as_bytes());
    hasher.update(options.channel.to_string().as_bytes());
    for (layer, sha) in &options.target_versions {
        hasher.update(layer.to_string().as_bytes());
        hasher.update(sha.as_bytes());
    }
    let digest = hasher.finalize();
    format!("plan-{:x}", digest.iter().take(8).fold(0_u64, |acc, b| (acc << 8) | u64::from(*b)))
}

#[cfg(test)]
mod tests {
    use super::super::roles::ResourceBundle;
    use super::*;
    use crate::model::ResourceKind;

    fn bundle_with_block(name: &str) -> ResourceBundle {
        ResourceBundle {
            blocks: vec![ResourceId::new(ResourceKind::Block, name)],
            ..Default::default()
        }
    }

    fn base_options() -> PlanOptions {
        PlanOptions {
            role: Role::LaneDev,
            channel: Channel::Stable,
            target_versions: BTreeMap::new(),
        }
    }

    #[test]
    fn missing_attachment_is_a_safe_attach() {
        let bundle = bundle_with_block("decisions");
        let mut remote_ids = BTreeMap::new();
        remote_ids.insert(ResourceId::new(ResourceKind::Block, "decisions"), "b1".to_owned());
        let agent = AgentState {
            agent_id: "a1".to_owned(),
            tags: vec!["role:lane-dev".to_owned(), "channel:stable".to_owned()],
            ..Default::default()
        };
        let plan_result = plan(&agent, &bundle, &remote_ids, &base_options());
        assert_eq!(plan_result.summary.safe_changes, 1);
        assert!(!plan_result.has_breaking_changes);
        assert!(!plan_result.is_up_to_date);
    }

    #[test]
    fn unreconciled_bundle_member_is_skipped_not_attached() {
        let bundle = bundle_with_block("decisions");
        let agent = AgentState {
            agent_id: "a1".to_owned(),
            tags: vec!["role:lane-dev".to_owned(), "channel:stable".to_owned()],
            ..Default::default()
        };
        let plan_result = plan(&agent, &bundle, &BTreeMap::new(), &base_options());
        assert!(plan_result.actions.iter().all(|a| a.action == UpgradeActionKind::Skip));
        assert!(plan_result.is_up_to_date);
    }

    #[test]
    fn extra_attachment_is_a_breaking_detach() {
        let bundle = ResourceBundle::default();
        let agent = AgentState {
            agent_id: "a1".to_owned(),
            tags: vec!["role:lane-dev".to_owned(), "channel:stable".to_owned()],
            attached_blocks: BTreeSet::from(["b1".to_owned()]),
            ..Default::default()
        };
        let plan_result = plan(&agent, &bundle, &BTreeMap::new(), &base_options());
        assert!(plan_result.has_breaking_changes);
        assert_eq!(plan_result.summary.breaking_changes, 1);
    }

    #[test]
    fn in_sync_agent_has_no_changes() {
        let bundle = bundle_with_block("decisions");
        let mut remote_ids = BTreeMap::new();
        remote_ids.insert(ResourceId::new(ResourceKind::Block, "decisions"), "b1".to_owned());
        let agent = AgentState {
            agent_id: "a1".to_owned(),
            tags: vec!["role:lane-dev".to_owned(), "channel:stable".to_owned()],
            attached_blocks: BTreeSet::from(["b1".to_owned()]),
            ..Default::default()
        };
        let plan_result = plan(&agent, &bundle, &remote_ids, &base_options());
        assert!(plan_result.is_up_to_date);
        assert!(!plan_result.has_breaking_changes);
    }

    #[test]
    fn pinned_channel_makes_whole_plan_breaking_even_when_in_sync() {
        let bundle = bundle_with_block("decisions");
        let mut remote_ids = BTreeMap::new();
        remote_ids.insert(ResourceId::new(ResourceKind::Block, "decisions"), "b1".to_owned());
        let agent = AgentState {
            agent_id: "a1".to_owned(),
            tags: vec!["role:lane-dev".to_owned(), "channel:pinned".to_owned()],
            attached_blocks: BTreeSet::from(["b1".to_owned()]),
            ..Default::default()
        };
        let options = PlanOptions {
            channel: Channel::Pinned,
            ..base_options()
        };
        let plan_result = plan(&agent, &bundle, &remote_ids, &options);
        assert!(plan_result.has_breaking_changes);
    }

    #[test]
    fn plan_id_is_deterministic_for_the_same_inputs() {
        let bundle = bundle_with_block("decisions");
        let remote_ids = BTreeMap::new();
        let agent = AgentState {
            agent_id: "a1".to_owned(),
            tags: vec![],
            ..Default::default()
        };
        let p1 = plan(&agent, &bundle, &remote_ids, &base_options());
        let p2 = plan(&agent, &bundle, &remote_ids, &base_options());
        assert_eq!(p1.plan_id, p2.plan_id);
    }
}
