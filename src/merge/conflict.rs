//! Merge conflict taxonomy (§4.2 Conflict detection, §7 `MergeConflict`).

use std::fmt;

use crate::model::{Layer, ResourceId};

/// Which category of conflict was detected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConflictKind {
    /// A field's value type changed between layers (string vs number vs
    /// array, ...).
    TypeConflict,
    /// Two layers define the same `(kind, name)` with incompatible
    /// identifying fields.
    ResourceIdentityConflict,
    /// A post-merge structural invariant was violated.
    ConstraintViolation,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::TypeConflict => "type_conflict",
            Self::ResourceIdentityConflict => "resource_identity_conflict",
            Self::ConstraintViolation => "constraint_violation",
        };
        f.write_str(s)
    }
}

/// A single merge conflict, fatal to the merge that produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeConflict {
    /// Which category of conflict this is.
    pub kind: ConflictKind,
    /// The conflicting resource's `(kind, name)`, rendered as `Kind.name`.
    pub path: String,
    /// Which layers were involved.
    pub layers: Vec<Layer>,
    /// An actionable suggestion for the operator.
    pub suggestion: String,
}

impl MergeConflict {
    /// Build a resource-identity conflict for two layers disagreeing on
    /// an identifying field.
    #[must_use]
    pub fn identity(id: &ResourceId, layers: Vec<Layer>, field: &str) -> Self {
        Self {
            kind: ConflictKind::ResourceIdentityConflict,
            path: id.to_string(),
            layers,
            suggestion: format!("layers disagree on identifying field '{field}'; align the manifests or split the resource"),
        }
    }

    /// Build a type conflict for a field whose value type changed
    /// between layers.
    #[must_use]
    pub fn field_type(id: &ResourceId, layers: Vec<Layer>, field: &str) -> Self {
        Self {
            kind: ConflictKind::TypeConflict,
            path: format!("{id}.{field}"),
            layers,
            suggestion: format!("field '{field}' changes type across layers; keep its type consistent"),
        }
    }

    /// Build a post-merge constraint violation.
    #[must_use]
    pub fn constraint(id: &ResourceId, detail: &str) -> Self {
        Self {
            kind: ConflictKind::ConstraintViolation,
            path: id.to_string(),
            layers: vec![],
            suggestion: detail.to_owned(),
        }
    }
}

impl fmt::Display for MergeConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}: {}", self.kind, self.path, self.suggestion)
    }
}

impl std::error::Error for MergeConflict {}
