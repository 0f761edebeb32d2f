//! The [`Resource`] type — a tagged sum over the seven manifest kinds.
//!
//! The source system duck-types resources as plain objects with
//! `apiVersion`/`kind`/`metadata`/`spec` fields (§9 Re-architecture). Here
//! that becomes a single struct with a [`ResourceKind`] tag and a `spec`
//! that mixes a handful of typed, universally-meaningful fields (`layer`,
//! `managed`, `_merge`) with an open `fields` map for everything else —
//! the merge engine and diff engines need to walk arbitrary field paths
//! generically across seven different schemas, so kind-specific structure
//! lives in validation and diff code, not in the type itself.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::types::{ErrorKind, Layer, ResourceId, ResourceKind, ValidationError, SUPPORTED_API_VERSION};

/// `metadata` common to every resource kind.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Metadata {
    /// The resource name — half of its `(kind, name)` identity.
    pub name: String,
    /// Optional human-readable description.
    pub description: Option<String>,
    /// String labels.
    pub labels: BTreeMap<String, String>,
    /// Arbitrary annotations.
    pub annotations: BTreeMap<String, Value>,
}

/// A field-path merge strategy declared under a resource's `_merge` map
/// (§4.2 Collection merge strategies).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeStrategy {
    /// Concatenate then dedupe; `!value` removes a matching element.
    Append,
    /// Higher layer's value wins outright.
    Replace,
    /// Merge object array elements by `id | name | label`.
    MergeByKey,
}

/// The kind-specific portion of a resource.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Spec {
    /// Which manifest layer this resource belongs to. `None` until the
    /// loader resolves it from the caller's default or an explicit value.
    pub layer: Option<Layer>,
    /// Whether the engine should manage this resource (default `true`).
    pub managed: bool,
    /// Per-field-path merge strategy overrides (`_merge`).
    pub merge_overrides: BTreeMap<String, MergeStrategy>,
    /// Every other field, kind-specific (`value`, `sourceCode`,
    /// `jsonSchema`, `embeddingConfig`, ...).
    pub fields: Map<String, Value>,
}

impl Spec {
    /// Read a string field.
    #[must_use]
    pub fn str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    /// Read a bool field.
    #[must_use]
    pub fn bool(&self, field: &str) -> Option<bool> {
        self.fields.get(field).and_then(Value::as_bool)
    }

    /// Read a nested field by dotted path (`"jsonSchema.function.name"`).
    #[must_use]
    pub fn path(&self, path: &str) -> Option<&Value> {
        let mut current = self.fields.get(path.split('.').next()?)?;
        for segment in path.split('.').skip(1) {
            current = current.get(segment)?;
        }
        Some(current)
    }

    /// Read the resource's tag list (`fields["tags"]`), if present.
    #[must_use]
    pub fn tags(&self) -> Vec<String> {
        self.fields
            .get("tags")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(str::to_owned))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Replace the resource's tag list.
    pub fn set_tags(&mut self, tags: Vec<String>) {
        self.fields.insert(
            "tags".to_owned(),
            Value::Array(tags.into_iter().map(Value::String).collect()),
        );
    }
}

/// Read-only status stamped onto resources loaded back from the remote.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResourceStatus {
    /// The remote platform's opaque id, once created.
    pub remote_id: Option<String>,
    /// Creation timestamp (RFC 3339), if known.
    pub created_at: Option<String>,
    /// Last-update timestamp (RFC 3339), if known.
    pub updated_at: Option<String>,
}

/// A single manifest resource (§3 Resource).
#[derive(Clone, Debug, PartialEq)]
pub struct Resource {
    /// Must equal [`SUPPORTED_API_VERSION`].
    pub api_version: String,
    /// The resource kind tag.
    pub kind: ResourceKind,
    /// Common metadata.
    pub metadata: Metadata,
    /// Kind-specific spec.
    pub spec: Spec,
    /// Read-only remote status, if this resource was hydrated from a
    /// listing rather than loaded from a manifest.
    pub status: Option<ResourceStatus>,
    /// Whether the highest-precedence layer that defined this resource
    /// marked it `_delete: true` (top-level, not a spec field).
    pub delete: bool,
}

impl Resource {
    /// This resource's `(kind, name)` identity.
    #[must_use]
    pub fn id(&self) -> ResourceId {
        ResourceId::new(self.kind, self.metadata.name.clone())
    }

    /// Parse a single YAML/JSON document into a `Resource`.
    ///
    /// Returns `Ok(None)` for documents that are not resources at all
    /// (missing `apiVersion`/`kind`/`metadata` — §4.1 "non-Resource
    /// documents are silently skipped"), and `Err` for documents that look
    /// like a resource but fail structural or `apiVersion` validation.
    ///
    /// # Errors
    /// Returns [`ValidationError`] for a malformed or unsupported document.
    pub fn from_value(value: Value) -> Result<Option<Self>, ValidationError> {
        let Value::Object(mut root) = value else {
            return Ok(None);
        };

        let (Some(api_version), Some(kind_str), Some(metadata_value)) = (
            root.remove("apiVersion").and_then(|v| v.as_str().map(str::to_owned)),
            root.remove("kind").and_then(|v| v.as_str().map(str::to_owned)),
            root.remove("metadata"),
        ) else {
            return Ok(None);
        };

        if api_version != SUPPORTED_API_VERSION {
            return Err(ValidationError {
                kind: ErrorKind::ApiVersion,
                value: api_version,
                reason: format!("expected '{SUPPORTED_API_VERSION}'"),
            });
        }

        let kind = ResourceKind::from_manifest_kind(&kind_str).ok_or_else(|| ValidationError {
            kind: ErrorKind::Kind,
            value: kind_str.clone(),
            reason: "unrecognized resource kind".to_owned(),
        })?;

        let metadata = parse_metadata(metadata_value)?;

        let delete = root
            .remove("_delete")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        let spec_value = root.remove("spec").unwrap_or(Value::Object(Map::new()));
        let spec = parse_spec(spec_value)?;

        Ok(Some(Self {
            api_version,
            kind,
            metadata,
            spec,
            status: None,
            delete,
        }))
    }
}

fn parse_metadata(value: Value) -> Result<Metadata, ValidationError> {
    let Value::Object(mut obj) = value else {
        return Err(ValidationError {
            kind: ErrorKind::RequiredField,
            value: "metadata".to_owned(),
            reason: "must be an object".to_owned(),
        });
    };
    let name = obj
        .remove("name")
        .and_then(|v| v.as_str().map(str::to_owned))
        .ok_or_else(|| ValidationError {
            kind: ErrorKind::RequiredField,
            value: "metadata.name".to_owned(),
            reason: "is required".to_owned(),
        })?;
    let description = obj
        .remove("description")
        .and_then(|v| v.as_str().map(str::to_owned));
    let labels = obj
        .remove("labels")
        .and_then(|v| v.as_object().cloned())
        .map(|m| {
            m.into_iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k, s.to_owned())))
                .collect()
        })
        .unwrap_or_default();
    let annotations = obj
        .remove("annotations")
        .and_then(|v| v.as_object().cloned())
        .map(|m| m.into_iter().collect())
        .unwrap_or_default();
    Ok(Metadata {
        name,
        description,
        labels,
        annotations,
    })
}

fn parse_spec(value: Value) -> Result<Spec, ValidationError> {
    let Value::Object(mut obj) = value else {
        return Err(ValidationError {
            kind: ErrorKind::RequiredField,
            value: "spec".to_owned(),
            reason: "must be an object".to_owned(),
        });
    };

    let layer = match obj.remove("layer") {
        Some(Value::String(s)) => Some(s.parse::<Layer>()?),
        Some(other) => {
            return Err(ValidationError {
                kind: ErrorKind::Layer,
                value: other.to_string(),
                reason: "spec.layer must be a string".to_owned(),
            })
        }
        None => None,
    };

    let managed = obj.remove("managed").and_then(|v| v.as_bool()).unwrap_or(true);

    let merge_overrides = obj
        .remove("_merge")
        .and_then(|v| v.as_object().cloned())
        .map(|m| {
            m.into_iter()
                .filter_map(|(k, v)| {
                    v.as_str()
                        .and_then(|s| serde_json::from_value(Value::String(s.to_owned())).ok())
                        .map(|strategy| (k, strategy))
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(Spec {
        layer,
        managed,
        merge_overrides,
        fields: obj,
    })
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}
