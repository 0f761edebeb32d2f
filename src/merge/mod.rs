//! Three-layer precedence merge (§4.2 Merge Engine).

mod conflict;
mod engine;
mod strategy;

pub use conflict::{ConflictKind, MergeConflict};
pub use strategy::{default_strategy_for, resolve_array};

use crate::loader::LayeredPackages;
use crate::model::DesiredState;

/// Options controlling a [`merge_packages`] call.
#[derive(Clone, Debug)]
pub struct MergeOptions {
    /// Whether to append `_layer:<source>` provenance tags (§4.2 Layer
    /// tagging). Defaults to `true`.
    pub add_layer_tags: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self { add_layer_tags: true }
    }
}

/// The result of a successful merge: the combined desired state plus any
/// non-fatal warnings (e.g. a no-op `_delete`).
#[derive(Clone, Debug, Default)]
pub struct MergeOutput {
    /// The merged desired state.
    pub desired_state: DesiredState,
    /// Non-fatal warnings surfaced during the merge.
    pub warnings: Vec<String>,
}

/// Compose up to three layer packages into a single [`DesiredState`]
/// (§4.2).
///
/// # Errors
/// Returns [`MergeConflict`] on the first detected type conflict,
/// resource-identity conflict, or post-merge constraint violation.
pub fn merge_packages(packages: &LayeredPackages, options: &MergeOptions) -> Result<MergeOutput, MergeConflict> {
    engine::merge(packages, options)
}
