//! Manifest loader (§4.1): reads a directory tree or single file,
//! parses multi-document YAML/JSON, assembles [`Resource`] values, and
//! validates per-kind required fields.

mod error;
mod validate;
mod walk;

pub use error::LoaderError;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_yaml::Value as YamlValue;

use crate::model::{Layer, Package, Resource, ResourceId};

/// Options controlling a single [`load_package`] call.
#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    /// The layer to assign resources that don't set `spec.layer`
    /// themselves.
    pub default_layer: Layer,
}

/// Walk `path` (a directory or a single file) and load every resource it
/// defines into one [`Package`] tagged with `options.default_layer`
/// unless a resource overrides it via `spec.layer`.
///
/// # Errors
/// Returns [`LoaderError::NotFound`] if `path` does not exist,
/// [`LoaderError::Parse`] for malformed YAML/JSON, or
/// [`LoaderError::Validation`] for an aggregated list of per-resource
/// validation failures.
pub fn load_package(path: &Path, options: &LoadOptions) -> Result<Package, LoaderError> {
    if !path.exists() {
        return Err(LoaderError::NotFound { path: path.to_path_buf() });
    }

    let files = walk::manifest_files(path)?;
    let mut resources = Vec::new();
    let mut errors = Vec::new();

    for file in files {
        match load_file(&file) {
            Ok(mut docs) => resources.append(&mut docs),
            Err(LoaderError::Parse { path, detail }) => errors.push(format!("{}: {detail}", path.display())),
            Err(other) => return Err(other),
        }
    }

    if !errors.is_empty() {
        return Err(LoaderError::Parse {
            path: path.to_path_buf(),
            detail: errors.join("; "),
        });
    }

    for resource in &mut resources {
        if resource.spec.layer.is_none() {
            resource.spec.layer = Some(options.default_layer);
        }
    }

    let layer = package_layer(&resources, options.default_layer);
    let package = Package {
        layer,
        source: path.to_path_buf(),
        resources,
    };

    validate_package(&package)?;
    Ok(package)
}

/// The most specific layer present among a set of resources, falling
/// back to `default_layer` when the set is empty (§4.1 layer inference).
fn package_layer(resources: &[Resource], default_layer: Layer) -> Layer {
    resources
        .iter()
        .filter_map(|r| r.spec.layer)
        .max()
        .unwrap_or(default_layer)
}

fn load_file(path: &Path) -> Result<Vec<Resource>, LoaderError> {
    let text = std::fs::read_to_string(path).map_err(|e| LoaderError::Parse {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
        == Some("json");

    let docs: Vec<YamlValue> = if is_json {
        vec![serde_json::from_str(&text).map_err(|e| LoaderError::Parse {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?]
    } else {
        serde_yaml::Deserializer::from_str(&text)
            .map(|doc| YamlValue::deserialize(doc).map_err(|e| LoaderError::Parse {
                path: path.to_path_buf(),
                detail: e.to_string(),
            }))
            .collect::<Result<Vec<_>, _>>()?
    };

    let mut resources = Vec::new();
    for doc in docs {
        let json_value: serde_json::Value = serde_json::to_value(&doc).map_err(|e| LoaderError::Parse {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        if let Some(resource) = Resource::from_value(json_value).map_err(|e| LoaderError::Validation {
            messages: vec![format!("{}: {e}", path.display())],
        })? {
            resources.push(resource);
        }
    }
    Ok(resources)
}

/// A set of loaded layer packages, keyed by layer (§4.1
/// `loadLayeredPackages`).
#[derive(Clone, Debug, Default)]
pub struct LayeredPackages {
    /// The base layer's package, if a path was given for it.
    pub base: Option<Package>,
    /// The org layer's package, if a path was given for it.
    pub org: Option<Package>,
    /// The project layer's package, if a path was given for it.
    pub project: Option<Package>,
}

impl LayeredPackages {
    /// Iterate the loaded packages ascending precedence.
    pub fn iter(&self) -> impl Iterator<Item = &Package> {
        [self.base.as_ref(), self.org.as_ref(), self.project.as_ref()]
            .into_iter()
            .flatten()
    }
}

/// Load each provided path with its layer assigned as a default.
///
/// # Errors
/// Propagates the first [`LoaderError`] encountered, in `base, org,
/// project` order.
pub fn load_layered_packages(paths: &BTreeMap<Layer, PathBuf>) -> Result<LayeredPackages, LoaderError> {
    let mut layered = LayeredPackages::default();
    for layer in Layer::ALL {
        let Some(path) = paths.get(&layer) else { continue };
        let package = load_package(
            path,
            &LoadOptions {
                default_layer: layer,
            },
        )?;
        match layer {
            Layer::Base => layered.base = Some(package),
            Layer::Org => layered.org = Some(package),
            Layer::Project => layered.project = Some(package),
        }
    }
    Ok(layered)
}

/// Validate an already-loaded package: unique `(kind, name)`, and
/// per-kind required fields (§4.1).
///
/// # Errors
/// Returns [`LoaderError::Validation`] with every violation found,
/// rather than failing on the first.
pub fn validate_package(package: &Package) -> Result<(), LoaderError> {
    let mut errors = Vec::new();

    let mut seen: BTreeMap<ResourceId, ()> = BTreeMap::new();
    for resource in &package.resources {
        let id = resource.id();
        if seen.insert(id.clone(), ()).is_some() {
            errors.push(format!("duplicate resource {id} in package"));
        }
        if let Err(e) = validate::required_fields(resource) {
            errors.push(e);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(LoaderError::Validation { messages: errors })
    }
}
