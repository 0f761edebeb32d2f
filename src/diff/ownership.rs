//! Bridges a raw [`RemoteResource`](agentsync_api::RemoteResource) into an
//! [`OwnershipClass`](crate::model::OwnershipClass), the shared first step
//! of every per-kind diff engine (§4.3).

use agentsync_api::RemoteResource;

use crate::metadata::ManagedMetadata;
use crate::model::{ownership, OwnershipClass};

/// Whether `RemoteResource` carries its management marker in `metadata`
/// (blocks, folders) or in `tags` (tools, agents).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarkerLocation {
    /// Read `managed_by` out of `metadata`.
    Metadata,
    /// Read `managed:<id>` out of `tags`.
    Tags,
}

/// Classify a remote resource against a set of desired names, returning
/// the ownership class and the parsed management stamp, if any.
#[must_use]
pub fn classify_remote(
    remote: &RemoteResource,
    marker: MarkerLocation,
    desired_names: &[&str],
) -> (OwnershipClass, Option<ManagedMetadata>) {
    let stamp = match marker {
        MarkerLocation::Metadata => ManagedMetadata::from_metadata_map(&remote.metadata),
        MarkerLocation::Tags => ManagedMetadata::from_tags(&remote.tags),
    };
    let has_desired_match = desired_names.iter().any(|n| *n == remote.name);
    let class = ownership::classify(stamp.is_some(), has_desired_match);
    (class, stamp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn managed_tag_and_match_is_managed() {
        let r = RemoteResource::new("id", "decisions").with_tags(vec!["managed:agentsync".to_owned()]);
        let (class, stamp) = classify_remote(&r, MarkerLocation::Tags, &["decisions"]);
        assert_eq!(class, OwnershipClass::Managed);
        assert!(stamp.is_some());
    }

    #[test]
    fn no_tag_no_match_is_unmanaged() {
        let r = RemoteResource::new("id", "scratchpad");
        let (class, _) = classify_remote(&r, MarkerLocation::Tags, &["decisions"]);
        assert_eq!(class, OwnershipClass::Unmanaged);
    }

    #[test]
    fn no_tag_with_match_is_adopted() {
        let r = RemoteResource::new("id", "decisions");
        let (class, _) = classify_remote(&r, MarkerLocation::Tags, &["decisions"]);
        assert_eq!(class, OwnershipClass::Adopted);
    }

    #[test]
    fn tag_without_match_is_orphaned() {
        let r = RemoteResource::new("id", "old-block").with_tags(vec!["managed:agentsync".to_owned()]);
        let (class, _) = classify_remote(&r, MarkerLocation::Tags, &["decisions"]);
        assert_eq!(class, OwnershipClass::Orphaned);
    }
}
