//! A single layer's worth of loaded, validated resources.

use std::path::PathBuf;

use super::resource::Resource;
use super::types::{Layer, ResourceId};

/// All the resources loaded from one layer's manifest tree.
#[derive(Clone, Debug, PartialEq)]
pub struct Package {
    /// Which layer this package represents.
    pub layer: Layer,
    /// The directory (or single file) the package was loaded from.
    pub source: PathBuf,
    /// The resources defined at this layer, in load order.
    pub resources: Vec<Resource>,
}

impl Package {
    /// Build an empty package for a layer with no manifests on disk.
    #[must_use]
    pub fn empty(layer: Layer, source: PathBuf) -> Self {
        Self {
            layer,
            source,
            resources: Vec::new(),
        }
    }

    /// Look up a resource by identity within this package.
    #[must_use]
    pub fn get(&self, id: &ResourceId) -> Option<&Resource> {
        self.resources.iter().find(|r| r.id() == *id)
    }

    /// Iterate resource identities defined at this layer.
    pub fn ids(&self) -> impl Iterator<Item = ResourceId> + '_ {
        self.resources.iter().map(Resource::id)
    }
}
