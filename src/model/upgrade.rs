//! Types for the agent upgrade subsystem (§4.5–§4.6, §4.8, §4.10).

use std::collections::BTreeMap;
use std::fmt;

use super::types::{ErrorKind, Layer, ValidationError};

/// Release channel governing upgrade aggressiveness (§4.7, GLOSSARY).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Ordinary rollout target.
    Stable,
    /// Early rollout target.
    Beta,
    /// Receives no automatic upgrades; only a forced apply moves it.
    Pinned,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Stable => "stable",
            Self::Beta => "beta",
            Self::Pinned => "pinned",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Channel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stable" => Ok(Self::Stable),
            "beta" => Ok(Self::Beta),
            "pinned" => Ok(Self::Pinned),
            other => Err(ValidationError {
                kind: ErrorKind::Tag,
                value: other.to_owned(),
                reason: "must be one of: stable, beta, pinned".to_owned(),
            }),
        }
    }
}

/// An agent role (§4.8 Role-based selection). Resolves to a predefined
/// bundle of desired blocks/tools/folders; a generic catch-all covers
/// any role value a manifest introduces without engine support.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// A development-lane agent.
    LaneDev,
    /// An agent that curates a single repo's conventions.
    RepoCurator,
    /// An agent that curates org-wide conventions.
    OrgCurator,
    /// A supervisory agent overseeing others.
    Supervisor,
    /// The generic role, or any unrecognized `role:<value>`.
    Agent(String),
}

impl Role {
    /// Parse a `role:<value>` tag's value portion.
    #[must_use]
    pub fn from_tag_value(value: &str) -> Self {
        match value {
            "lane-dev" => Self::LaneDev,
            "repo-curator" => Self::RepoCurator,
            "org-curator" => Self::OrgCurator,
            "supervisor" => Self::Supervisor,
            other => Self::Agent(other.to_owned()),
        }
    }

    /// Render back to the tag value this role was parsed from.
    #[must_use]
    pub fn tag_value(&self) -> &str {
        match self {
            Self::LaneDev => "lane-dev",
            Self::RepoCurator => "repo-curator",
            Self::OrgCurator => "org-curator",
            Self::Supervisor => "supervisor",
            Self::Agent(s) => s,
        }
    }
}

/// Whether a candidate upgrade action preserves or reduces agent
/// capability (§4.5 Safety classification).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeClass {
    /// Attaches something, or expands/adds content. Always permitted.
    Safe,
    /// Detaches something, removes a field, reduces a limit, or touches
    /// a pinned agent. Requires `force`.
    Breaking,
}

impl ChangeClass {
    /// Whether this class of change may proceed without `force`.
    #[must_use]
    pub const fn allowed_without_force(self) -> bool {
        matches!(self, Self::Safe)
    }
}

/// Which attachable resource kind an upgrade action concerns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttachableKind {
    /// A memory block.
    Block,
    /// A tool function.
    Tool,
    /// A knowledge folder.
    Folder,
    /// A user identity.
    Identity,
    /// An MCP-derived source, attached without full reconciliation.
    Source,
}

impl fmt::Display for AttachableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Block => "block",
            Self::Tool => "tool",
            Self::Folder => "folder",
            Self::Identity => "identity",
            Self::Source => "source",
        };
        f.write_str(s)
    }
}

/// What an [`UpgradeAction`] does to an agent (§4.6 per-action dispatch).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpgradeActionKind {
    /// Attach a resource currently missing from the agent.
    Attach,
    /// Update a resource already attached but drifted.
    Update,
    /// Detach a resource the agent should no longer carry.
    Detach,
    /// Update the agent's own configuration (model, system prompt, ...).
    UpdateConfig,
    /// An action considered and withheld; carries no remote effect.
    Skip,
}

/// A single step of an agent's upgrade (§4.5, §4.6).
#[derive(Clone, Debug, PartialEq)]
pub struct UpgradeAction {
    /// What this action does.
    pub action: UpgradeActionKind,
    /// Which kind of attachable resource it concerns.
    pub resource_kind: AttachableKind,
    /// The remote id of the resource involved, if known.
    pub resource_id: Option<String>,
    /// The resource's manifest name, for reporting.
    pub resource_name: String,
    /// Safe or breaking.
    pub class: ChangeClass,
    /// Human-readable justification.
    pub reason: String,
}

/// Per-kind attach/update/detach tallies plus the overall counts that
/// back `hasBreakingChanges`/`isUpToDate` (§3 UpgradePlan.summary).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpgradeSummary {
    /// Count of actions classified safe.
    pub safe_changes: usize,
    /// Count of actions classified breaking.
    pub breaking_changes: usize,
    /// Count of resources already in the desired state.
    pub unchanged: usize,
    /// Per-`(kind, action)` tallies, e.g. `(Block, Attach) -> 2`.
    pub per_kind: BTreeMap<(AttachableKind, UpgradeActionKindOrd), usize>,
}

/// An ordinal mirror of [`UpgradeActionKind`] so it can key a `BTreeMap`
/// (the kind itself carries no data, so this is just for `Ord`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum UpgradeActionKindOrd {
    /// Mirrors [`UpgradeActionKind::Attach`].
    Attach,
    /// Mirrors [`UpgradeActionKind::Update`].
    Update,
    /// Mirrors [`UpgradeActionKind::Detach`].
    Detach,
    /// Mirrors [`UpgradeActionKind::UpdateConfig`].
    UpdateConfig,
    /// Mirrors [`UpgradeActionKind::Skip`].
    Skip,
}

impl From<UpgradeActionKind> for UpgradeActionKindOrd {
    fn from(kind: UpgradeActionKind) -> Self {
        match kind {
            UpgradeActionKind::Attach => Self::Attach,
            UpgradeActionKind::Update => Self::Update,
            UpgradeActionKind::Detach => Self::Detach,
            UpgradeActionKind::UpdateConfig => Self::UpdateConfig,
            UpgradeActionKind::Skip => Self::Skip,
        }
    }
}

impl UpgradeSummary {
    /// Total number of actual changes (safe + breaking).
    #[must_use]
    pub const fn total_changes(&self) -> usize {
        self.safe_changes + self.breaking_changes
    }

    /// Record one action into the tallies.
    pub fn record(&mut self, action: &UpgradeAction) {
        match action.class {
            ChangeClass::Safe => self.safe_changes += 1,
            ChangeClass::Breaking => self.breaking_changes += 1,
        }
        *self
            .per_kind
            .entry((action.resource_kind, action.action.into()))
            .or_insert(0) += 1;
    }
}

/// A single agent's full upgrade plan (§3 UpgradePlan).
#[derive(Clone, Debug, PartialEq)]
pub struct UpgradePlan {
    /// A unique id for this plan, for audit correlation.
    pub plan_id: String,
    /// The agent this plan targets.
    pub agent_id: String,
    /// The agent's resolved role.
    pub role: Role,
    /// The agent's channel.
    pub channel: Channel,
    /// The package version (commit sha) targeted per layer.
    pub target_versions: BTreeMap<Layer, String>,
    /// Ordered actions to take.
    pub actions: Vec<UpgradeAction>,
    /// Aggregated counts.
    pub summary: UpgradeSummary,
    /// Whether any action is breaking, or the channel is pinned.
    pub has_breaking_changes: bool,
    /// Whether the agent already matches the desired state.
    pub is_up_to_date: bool,
    /// Errors encountered while building the plan (does not abort it).
    pub errors: Vec<String>,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

impl UpgradePlan {
    /// Actions that are not `Skip` and may be dispatched to the applier.
    pub fn runnable(&self) -> impl Iterator<Item = &UpgradeAction> {
        self.actions
            .iter()
            .filter(|a| a.action != UpgradeActionKind::Skip)
    }

    /// Whether the plan has any change at all (mirrors `hasChanges`).
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.summary.total_changes() > 0
    }
}

/// Why the most recent upgrade to an agent was applied (§3 AppliedState).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpgradeType {
    /// Applied automatically because every action was safe.
    SafeAuto,
    /// Applied only because the operator passed `force`.
    BreakingManual,
}

/// The persisted record of what was last synced to an agent, mirrored by
/// `applied:<layer>@<sha>` tags on the remote (§3 AppliedState).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AppliedState {
    /// Package version applied per layer.
    pub applied_packages: BTreeMap<Layer, String>,
    /// How the most recent upgrade was authorized.
    pub last_upgrade_type: Option<UpgradeType>,
    /// When the most recent upgrade completed (RFC 3339).
    pub last_upgrade_at: Option<String>,
}

impl AppliedState {
    /// Render the `applied:<layer>@<sha>` tag value for one layer.
    #[must_use]
    pub fn tag_value(layer: Layer, sha: &str) -> String {
        format!("applied:{layer}@{sha}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applied_state_tag_value_format() {
        assert_eq!(AppliedState::tag_value(Layer::Org, "abc123"), "applied:org@abc123");
    }

    #[test]
    fn safe_changes_bypass_force() {
        assert!(ChangeClass::Safe.allowed_without_force());
        assert!(!ChangeClass::Breaking.allowed_without_force());
    }

    #[test]
    fn role_roundtrips_through_tag_value() {
        for (tag, role) in [
            ("lane-dev", Role::LaneDev),
            ("repo-curator", Role::RepoCurator),
            ("org-curator", Role::OrgCurator),
            ("supervisor", Role::Supervisor),
        ] {
            assert_eq!(Role::from_tag_value(tag), role);
            assert_eq!(Role::from_tag_value(tag).tag_value(), tag);
        }
    }

    #[test]
    fn unrecognized_role_falls_back_to_generic() {
        assert_eq!(Role::from_tag_value("experiment"), Role::Agent("experiment".to_owned()));
    }

    #[test]
    fn channel_roundtrips() {
        for s in ["stable", "beta", "pinned"] {
            assert_eq!(s.parse::<Channel>().unwrap().to_string(), s);
        }
    }

    #[test]
    fn runnable_excludes_skip_actions() {
        let plan = UpgradePlan {
            plan_id: "p1".to_owned(),
            agent_id: "a1".to_owned(),
            role: Role::LaneDev,
            channel: Channel::Stable,
            target_versions: BTreeMap::new(),
            actions: vec![
                UpgradeAction {
                    action: UpgradeActionKind::Attach,
                    resource_kind: AttachableKind::Block,
                    resource_id: None,
                    resource_name: "decisions".to_owned(),
                    class: ChangeClass::Safe,
                    reason: "missing".to_owned(),
                },
                UpgradeAction {
                    action: UpgradeActionKind::Skip,
                    resource_kind: AttachableKind::Tool,
                    resource_id: Some("t1".to_owned()),
                    resource_name: "search".to_owned(),
                    class: ChangeClass::Safe,
                    reason: "unchanged".to_owned(),
                },
            ],
            summary: UpgradeSummary::default(),
            has_breaking_changes: false,
            is_up_to_date: false,
            errors: vec![],
            warnings: vec![],
        };
        assert_eq!(plan.runnable().count(), 1);
    }

    #[test]
    fn summary_records_tallies() {
        let mut summary = UpgradeSummary::default();
        summary.record(&UpgradeAction {
            action: UpgradeActionKind::Attach,
            resource_kind: AttachableKind::Block,
            resource_id: None,
            resource_name: "x".to_owned(),
            class: ChangeClass::Safe,
            reason: String::new(),
        });
        summary.record(&UpgradeAction {
            action: UpgradeActionKind::Detach,
            resource_kind: AttachableKind::Tool,
            resource_id: None,
            resource_name: "y".to_owned(),
            class: ChangeClass::Breaking,
            reason: String::new(),
        });
        assert_eq!(summary.safe_changes, 1);
        assert_eq!(summary.breaking_changes, 1);
        assert_eq!(summary.total_changes(), 2);
    }
}
