//! The merged, three-layer output a package precedence merge produces.

use std::collections::BTreeMap;

use super::resource::Resource;
use super::types::{Layer, ResourceId};

/// Provenance for a single merged resource: which layers contributed a
/// field to its final shape, lowest to highest precedence.
pub type LayerTags = Vec<Layer>;

/// The fully merged view of all three layers (§4.2 Merge).
///
/// Every resource here has already had conflicts resolved and its
/// `_merge` collection strategies applied; `layer_tags` records which
/// layers touched each resource so the tag subsystem can stamp
/// `layer:<name>` provenance tags on apply.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DesiredState {
    /// Merged resources keyed by identity.
    pub resources: BTreeMap<ResourceId, Resource>,
    /// Which layers contributed to each resource, ascending precedence.
    pub layer_tags: BTreeMap<ResourceId, LayerTags>,
}

impl DesiredState {
    /// An empty desired state (no packages merged yet).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a merged resource along with the layers that contributed.
    pub fn insert(&mut self, resource: Resource, layers: LayerTags) {
        let id = resource.id();
        self.resources.insert(id.clone(), resource);
        self.layer_tags.insert(id, layers);
    }

    /// Look up a resource by identity.
    #[must_use]
    pub fn get(&self, id: &ResourceId) -> Option<&Resource> {
        self.resources.get(id)
    }

    /// The highest-precedence layer that contributed to a resource, if
    /// any layer did.
    #[must_use]
    pub fn top_layer(&self, id: &ResourceId) -> Option<Layer> {
        self.layer_tags.get(id).and_then(|layers| layers.iter().max().copied())
    }
}
