//! Unified error type for the reconciliation core.
//!
//! Defines [`SyncError`], the error every top-level entry point returns.
//! Error messages are agent-friendly: each variant includes a clear
//! description of what went wrong and, where there's an obvious next
//! step, actionable guidance.
//!
//! `agentsync-api::ApiError` stays `thiserror`-based at the remote
//! boundary; this module wraps it rather than reimplementing it.

use std::fmt;

use agentsync_api::ApiError;

use crate::loader::LoaderError;
use crate::merge::MergeConflict;

/// Unified error type for reconciliation runs.
///
/// Each variant is designed to be self-contained: an agent receiving this
/// error should be able to understand what happened and what to do next
/// without additional context.
#[derive(Debug)]
pub enum SyncError {
    /// Loading or validating a manifest package failed.
    Package(LoaderError),

    /// Merging layered packages hit an unresolvable conflict.
    Merge(MergeConflict),

    /// A remote API call failed.
    Api(ApiError),

    /// No credential could be resolved when one was required.
    CredentialMissing {
        /// Names of the providers that were attempted, in order.
        tried: Vec<String>,
    },

    /// Apply or upgrade was blocked by a safety gate (breaking changes or
    /// a pinned channel) without `force`.
    PreconditionRefused {
        /// Why the gate refused to proceed.
        reason: String,
    },

    /// A single action within a plan failed; does not by itself abort the
    /// run — `continueOnFailure` governs that at the caller.
    ActionFailed {
        /// What the action was trying to do.
        action: String,
        /// Why it failed.
        detail: String,
    },
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Package(err) => write!(f, "{err}"),
            Self::Merge(err) => {
                write!(f, "{err}\n  To fix: resolve the conflicting manifest entries and retry.")
            }
            Self::Api(err) => write!(f, "remote request failed: {err}"),
            Self::CredentialMissing { tried } => {
                write!(
                    f,
                    "no credential could be resolved (tried: {})\n  To fix: set one of the supported credential env vars, or configure a credential helper.",
                    tried.join(", ")
                )
            }
            Self::PreconditionRefused { reason } => {
                write!(f, "refused: {reason}\n  To fix: pass --force if this change is intentional.")
            }
            Self::ActionFailed { action, detail } => {
                write!(f, "action '{action}' failed: {detail}")
            }
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Package(err) => Some(err),
            Self::Merge(err) => Some(err),
            Self::Api(err) => Some(err),
            Self::CredentialMissing { .. } | Self::PreconditionRefused { .. } | Self::ActionFailed { .. } => None,
        }
    }
}

impl From<LoaderError> for SyncError {
    fn from(err: LoaderError) -> Self {
        Self::Package(err)
    }
}

impl From<MergeConflict> for SyncError {
    fn from(err: MergeConflict) -> Self {
        Self::Merge(err)
    }
}

impl From<ApiError> for SyncError {
    fn from(err: ApiError) -> Self {
        Self::Api(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::ConflictKind;
    use crate::model::{Layer, ResourceId, ResourceKind};

    #[test]
    fn display_package_delegates_to_loader_error() {
        let err = SyncError::Package(LoaderError::NotFound { path: "manifests/".into() });
        assert!(format!("{err}").contains("manifest path not found"));
    }

    #[test]
    fn display_merge_includes_fix_hint() {
        let id = ResourceId::new(ResourceKind::Tool, "foo");
        let conflict = MergeConflict::identity(&id, vec![Layer::Base, Layer::Project], "toolType");
        let err = SyncError::Merge(conflict);
        let msg = format!("{err}");
        assert!(msg.contains("resource_identity_conflict"));
        assert!(msg.contains("To fix"));
    }

    #[test]
    fn display_credential_missing_lists_tried_providers() {
        let err = SyncError::CredentialMissing {
            tried: vec!["env".to_owned(), "helper".to_owned()],
        };
        let msg = format!("{err}");
        assert!(msg.contains("env, helper"));
    }

    #[test]
    fn display_precondition_refused() {
        let err = SyncError::PreconditionRefused {
            reason: "breaking change requires --force".to_owned(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("breaking change"));
        assert!(msg.contains("--force"));
    }

    #[test]
    fn display_action_failed() {
        let err = SyncError::ActionFailed {
            action: "attach block b1".to_owned(),
            detail: "not found".to_owned(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("attach block b1"));
        assert!(msg.contains("not found"));
    }

    #[test]
    fn error_source_package() {
        let err = SyncError::Package(LoaderError::NotFound { path: "x".into() });
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn error_source_credential_missing_is_none() {
        let err = SyncError::CredentialMissing { tried: vec![] };
        assert!(std::error::Error::source(&err).is_none());
    }

    #[test]
    fn from_loader_error() {
        let err: SyncError = LoaderError::NotFound { path: "x".into() }.into();
        assert!(matches!(err, SyncError::Package(_)));
    }

    #[test]
    fn from_merge_conflict() {
        let id = ResourceId::new(ResourceKind::Tool, "foo");
        let conflict = MergeConflict::constraint(&id, "bad");
        assert!(matches!(conflict.kind, ConflictKind::ConstraintViolation));
        let err: SyncError = conflict.into();
        assert!(matches!(err, SyncError::Merge(_)));
    }
}
