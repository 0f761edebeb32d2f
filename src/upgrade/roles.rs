//! Role-based resource selection (§4.8). Resolution is pure: given a role
//! and a context, return the bundle of desired resources an agent of that
//! role should carry. No remote calls, no mutation.

use std::collections::BTreeSet;

use crate::model::{DesiredState, Layer, ResourceId, ResourceKind, Role};

/// Canonical blocks every role carries, mirroring
/// [`crate::diff::block::is_adoptable_label`]'s vocabulary.
const UNIVERSAL_BLOCK_LABELS: &[&str] = &["persona", "human", "system_instructions"];

/// A built-in tool set a role may pull in wholesale, keyed by the `toolset`
/// label a `Tool` resource's `metadata.labels` carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum BuiltinToolset {
    /// Memory read/write/search tools.
    Memory,
    /// Messaging/notification tools.
    Communication,
}

impl BuiltinToolset {
    const fn label_value(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Communication => "communication",
        }
    }
}

/// Which built-in toolsets a role pulls in, beyond any MCP-derived tools.
fn toolsets_for_role(role: &Role) -> &'static [BuiltinToolset] {
    match role {
        Role::LaneDev | Role::Supervisor => &[BuiltinToolset::Memory, BuiltinToolset::Communication],
        Role::RepoCurator | Role::OrgCurator => &[BuiltinToolset::Memory],
        Role::Agent(_) => &[],
    }
}

/// The org/project scope and available MCP servers a role resolves
/// against (§4.8 "given role + context").
#[derive(Clone, Debug, Default)]
pub struct RoleContext {
    /// The org scope, if this agent is org-scoped.
    pub org: Option<String>,
    /// The project scope, if this agent is project-scoped.
    pub project: Option<String>,
    /// MCP server names currently available to attach tools from.
    pub available_mcp_servers: Vec<String>,
}

/// The resolved set of resources a role should carry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResourceBundle {
    /// Desired blocks this agent should have attached.
    pub blocks: Vec<ResourceId>,
    /// Desired tools this agent should have attached.
    pub tools: Vec<ResourceId>,
    /// Desired folders this agent should have attached.
    pub folders: Vec<ResourceId>,
}

/// Resolve a role against desired state and context into a resource
/// bundle. Pure — the same inputs always produce the same bundle.
#[must_use]
pub fn resolve(role: &Role, desired: &DesiredState, context: &RoleContext) -> ResourceBundle {
    let toolsets: BTreeSet<&'static str> = toolsets_for_role(role).iter().map(|t| t.label_value()).collect();

    let mut bundle = ResourceBundle::default();

    for resource in desired.resources.values() {
        if !in_scope(resource.spec.layer, context) {
            continue;
        }
        match resource.kind {
            ResourceKind::Block => {
                let label = resource.spec.str("label").unwrap_or_default();
                if UNIVERSAL_BLOCK_LABELS.contains(&label) || label.starts_with("custom_") {
                    bundle.blocks.push(resource.id());
                }
            }
            ResourceKind::Tool => {
                let toolset = resource.metadata.labels.get("toolset").map(String::as_str);
                let mcp_server = resource.metadata.labels.get("mcp_server").map(String::as_str);
                let from_toolset = toolset.is_some_and(|t| toolsets.contains(t));
                let from_mcp = mcp_server.is_some_and(|s| context.available_mcp_servers.iter().any(|a| a == s));
                if from_toolset || from_mcp {
                    bundle.tools.push(resource.id());
                }
            }
            ResourceKind::Folder => {
                bundle.folders.push(resource.id());
            }
            _ => {}
        }
    }

    bundle
}

fn in_scope(layer: Option<Layer>, context: &RoleContext) -> bool {
    match layer {
        None | Some(Layer::Base) => true,
        Some(Layer::Org) => context.org.is_some(),
        Some(Layer::Project) => context.project.is_some(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Resource, SUPPORTED_API_VERSION};
    use serde_json::json;

    fn block(name: &str, label: &str) -> Resource {
        Resource::from_value(json!({
            "apiVersion": SUPPORTED_API_VERSION,
            "kind": "Block",
            "metadata": {"name": name},
            "spec": {"layer": "base", "label": label, "value": "v"},
        }))
        .unwrap()
        .unwrap()
    }

    fn tool(name: &str, labels: serde_json::Value) -> Resource {
        Resource::from_value(json!({
            "apiVersion": SUPPORTED_API_VERSION,
            "kind": "Tool",
            "metadata": {"name": name, "labels": labels},
            "spec": {"layer": "org", "toolType": "custom"},
        }))
        .unwrap()
        .unwrap()
    }

    fn desired_with(resources: Vec<Resource>) -> DesiredState {
        let mut d = DesiredState::new();
        for r in resources {
            let layer = r.spec.layer.unwrap();
            d.insert(r, vec![layer]);
        }
        d
    }

    #[test]
    fn universal_blocks_attach_to_every_role() {
        let desired = desired_with(vec![block("persona", "persona"), block("scratch", "scratchpad")]);
        let bundle = resolve(&Role::Agent("generic".to_owned()), &desired, &RoleContext::default());
        assert_eq!(bundle.blocks.len(), 1);
    }

    #[test]
    fn lane_dev_pulls_memory_and_communication_toolsets() {
        let desired = desired_with(vec![
            tool("recall", json!({"toolset": "memory"})),
            tool("notify", json!({"toolset": "communication"})),
            tool("unrelated", json!({"toolset": "analytics"})),
        ]);
        let context = RoleContext {
            org: Some("acme".to_owned()),
            ..Default::default()
        };
        let bundle = resolve(&Role::LaneDev, &desired, &context);
        assert_eq!(bundle.tools.len(), 2);
    }

    #[test]
    fn repo_curator_excludes_communication_toolset() {
        let desired = desired_with(vec![
            tool("recall", json!({"toolset": "memory"})),
            tool("notify", json!({"toolset": "communication"})),
        ]);
        let context = RoleContext {
            org: Some("acme".to_owned()),
            ..Default::default()
        };
        let bundle = resolve(&Role::RepoCurator, &desired, &context);
        assert_eq!(bundle.tools, vec![ResourceId::new(ResourceKind::Tool, "recall")]);
    }

    #[test]
    fn mcp_derived_tool_requires_server_availability() {
        let desired = desired_with(vec![tool("web_search", json!({"mcp_server": "brave"}))]);
        let context = RoleContext {
            org: Some("acme".to_owned()),
            available_mcp_servers: vec!["brave".to_owned()],
            ..Default::default()
        };
        let bundle = resolve(&Role::Agent("generic".to_owned()), &desired, &context);
        assert_eq!(bundle.tools.len(), 1);

        let bundle_unavailable = resolve(&Role::Agent("generic".to_owned()), &desired, &RoleContext {
            org: Some("acme".to_owned()),
            ..Default::default()
        });
        assert!(bundle_unavailable.tools.is_empty());
    }

    #[test]
    fn project_layer_resources_excluded_without_project_context() {
        let mut project_block = block("proj-notes", "custom_notes");
        project_block.spec.layer = Some(Layer::Project);
        let desired = desired_with(vec![project_block]);
        let bundle = resolve(&Role::Agent("generic".to_owned()), &desired, &RoleContext::default());
        assert!(bundle.blocks.is_empty());
    }
}
