//! Foundation types shared by every resource kind.
//!
//! Mirrors the newtype-with-validator pattern the teacher uses for its own
//! identifiers ([`crate::model::types::GitOid`]-style): a thin wrapper
//! around a `String` that can only be constructed through a validating
//! constructor, with a [`ValidationError`] describing exactly what failed.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The fixed `apiVersion` literal every manifest `Resource` must carry.
pub const SUPPORTED_API_VERSION: &str = "agentsync/v1";

/// The management marker value stamped as `managed_by` (blocks/folders)
/// or `managed:<id>` (tools/agents) onto every remote resource this
/// engine owns (§3 `ManagedMetadata`, GLOSSARY "Management marker").
pub const RECONCILER_ID: &str = "agentsync";

/// Manifest layer precedence: `project` overrides `org` overrides `base`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    /// Lowest precedence.
    Base,
    /// Middle precedence.
    Org,
    /// Highest precedence.
    Project,
}

impl Default for Layer {
    fn default() -> Self {
        Self::Base
    }
}

impl Layer {
    /// All layers in ascending precedence order.
    pub const ALL: [Self; 3] = [Self::Base, Self::Org, Self::Project];

    /// The `_layer:<name>` tag value used for provenance tagging (§4.2).
    #[must_use]
    pub const fn tag_name(self) -> &'static str {
        match self {
            Self::Base => "_layer:base",
            Self::Org => "_layer:org",
            Self::Project => "_layer:project",
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Base => "base",
            Self::Org => "org",
            Self::Project => "project",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Layer {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "base" => Ok(Self::Base),
            "org" => Ok(Self::Org),
            "project" => Ok(Self::Project),
            other => Err(ValidationError {
                kind: ErrorKind::Layer,
                value: other.to_owned(),
                reason: "must be one of: base, org, project".to_owned(),
            }),
        }
    }
}

/// The resource kind tag (§3 Resource).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    /// A memory block.
    Block,
    /// A tool function.
    Tool,
    /// A knowledge-source folder.
    Folder,
    /// An MCP server attachment.
    McpServer,
    /// An agent template.
    Template,
    /// A user identity.
    Identity,
    /// An agent tag policy.
    AgentPolicy,
}

impl ResourceKind {
    /// The `kind:` literal as it appears in manifests.
    #[must_use]
    pub const fn manifest_kind(self) -> &'static str {
        match self {
            Self::Block => "Block",
            Self::Tool => "Tool",
            Self::Folder => "Folder",
            Self::McpServer => "MCPServer",
            Self::Template => "Template",
            Self::Identity => "Identity",
            Self::AgentPolicy => "AgentPolicy",
        }
    }

    /// Parse a manifest `kind:` literal.
    #[must_use]
    pub fn from_manifest_kind(s: &str) -> Option<Self> {
        match s {
            "Block" => Some(Self::Block),
            "Tool" => Some(Self::Tool),
            "Folder" => Some(Self::Folder),
            "MCPServer" => Some(Self::McpServer),
            "Template" => Some(Self::Template),
            "Identity" => Some(Self::Identity),
            "AgentPolicy" => Some(Self::AgentPolicy),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.manifest_kind())
    }
}

/// A `(kind, name)` identity — the key resources are addressed by, both
/// within a single package and after the three-layer merge (§3 Resource).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId {
    /// The resource kind.
    pub kind: ResourceKind,
    /// The resource name (`metadata.name`).
    pub name: String,
}

impl ResourceId {
    /// Build a new identity.
    #[must_use]
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.kind, self.name)
    }
}

/// What kind of value failed validation, for error classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// A manifest layer literal.
    Layer,
    /// A resource's `apiVersion`.
    ApiVersion,
    /// A resource's `kind`.
    Kind,
    /// A required field was missing.
    RequiredField,
    /// A namespaced tag (§4.7 grammar).
    Tag,
}

/// A single validation failure, carrying enough context to build an
/// actionable error message (mirrors [`crate::error::SyncError`]'s
/// "self-contained variant" design).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationError {
    /// What category of value failed.
    pub kind: ErrorKind,
    /// The value that failed validation.
    pub value: String,
    /// Why it failed.
    pub reason: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {:?} '{}': {}", self.kind, self.value, self.reason)
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn layer_roundtrips_through_display_and_from_str() {
        for layer in Layer::ALL {
            let s = layer.to_string();
            assert_eq!(Layer::from_str(&s).unwrap(), layer);
        }
    }

    #[test]
    fn layer_precedence_ordering() {
        assert!(Layer::Base < Layer::Org);
        assert!(Layer::Org < Layer::Project);
    }

    #[test]
    fn layer_from_str_rejects_unknown() {
        assert!(Layer::from_str("staging").is_err());
    }

    #[test]
    fn resource_kind_roundtrips_through_manifest_literal() {
        let kinds = [
            ResourceKind::Block,
            ResourceKind::Tool,
            ResourceKind::Folder,
            ResourceKind::McpServer,
            ResourceKind::Template,
            ResourceKind::Identity,
            ResourceKind::AgentPolicy,
        ];
        for kind in kinds {
            let literal = kind.manifest_kind();
            assert_eq!(ResourceKind::from_manifest_kind(literal), Some(kind));
        }
    }

    #[test]
    fn resource_id_display() {
        let id = ResourceId::new(ResourceKind::Block, "decisions");
        assert_eq!(id.to_string(), "Block.decisions");
    }
}
