//! `ManagedMetadata` (§3): the record stamped onto every remote resource
//! this engine owns, however that kind encodes it on the wire.

use std::collections::HashMap;

use serde_json::Value;

use crate::model::{Layer, RECONCILER_ID};

/// The management record. Blocks and folders carry this in their
/// `metadata` object; tools and agents carry it as namespaced tags
/// instead (§6.2 Applied state).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ManagedMetadata {
    /// Always [`RECONCILER_ID`] once stamped.
    pub managed_by: String,
    /// Which layer last wrote this resource.
    pub layer: Layer,
    /// The org scope, if any.
    pub org: Option<String>,
    /// The project scope, if any.
    pub project: Option<String>,
    /// The commit sha of the package version last applied.
    pub package_version: Option<String>,
    /// RFC 3339 timestamp of the last successful sync.
    pub last_synced: Option<String>,
    /// The manifest's description, mirrored for observability.
    pub description: Option<String>,
    /// The manifest path this resource was loaded from.
    pub source_path: Option<String>,
    /// RFC 3339 timestamp this resource was adopted, if it was.
    pub adopted_at: Option<String>,
    /// The remote's name/label at the moment of adoption.
    pub original_name: Option<String>,
}

impl ManagedMetadata {
    /// Build a fresh stamp for a first-time create.
    #[must_use]
    pub fn new(layer: Layer, now: &str) -> Self {
        Self {
            managed_by: RECONCILER_ID.to_owned(),
            layer,
            last_synced: Some(now.to_owned()),
            ..Default::default()
        }
    }

    /// Render as a `metadata` object (blocks, folders).
    #[must_use]
    pub fn to_metadata_map(&self) -> HashMap<String, Value> {
        let mut map = HashMap::new();
        map.insert("managed_by".to_owned(), Value::String(self.managed_by.clone()));
        map.insert("layer".to_owned(), Value::String(self.layer.to_string()));
        insert_opt(&mut map, "org", &self.org);
        insert_opt(&mut map, "project", &self.project);
        insert_opt(&mut map, "package_version", &self.package_version);
        insert_opt(&mut map, "last_synced", &self.last_synced);
        insert_opt(&mut map, "description", &self.description);
        insert_opt(&mut map, "source_path", &self.source_path);
        insert_opt(&mut map, "adopted_at", &self.adopted_at);
        insert_opt(&mut map, "original_name", &self.original_name);
        map
    }

    /// Parse back from a `metadata` object. Returns `None` if it carries
    /// no `managed_by` marker at all (§4.3 ownership classification).
    #[must_use]
    pub fn from_metadata_map(map: &HashMap<String, Value>) -> Option<Self> {
        let managed_by = map.get("managed_by")?.as_str()?.to_owned();
        let layer = map.get("layer").and_then(Value::as_str).and_then(|s| s.parse().ok()).unwrap_or(Layer::Base);
        Some(Self {
            managed_by,
            layer,
            org: str_field(map, "org"),
            project: str_field(map, "project"),
            package_version: str_field(map, "package_version"),
            last_synced: str_field(map, "last_synced"),
            description: str_field(map, "description"),
            source_path: str_field(map, "source_path"),
            adopted_at: str_field(map, "adopted_at"),
            original_name: str_field(map, "original_name"),
        })
    }

    /// Render as namespaced tags (tools, agents).
    #[must_use]
    pub fn to_tags(&self) -> Vec<String> {
        let mut tags = vec![
            format!("managed:{}", self.managed_by),
            self.layer.tag_name().to_owned(),
        ];
        if let Some(org) = &self.org {
            tags.push(format!("org:{org}"));
        }
        if let Some(project) = &self.project {
            tags.push(format!("project:{project}"));
        }
        if let Some(version) = &self.package_version {
            tags.push(format!("package_version:{version}"));
        }
        if let Some(ts) = &self.last_synced {
            tags.push(format!("last_synced:{ts}"));
        }
        tags
    }

    /// Parse back from a tag set. Returns `None` if no `managed:<id>`
    /// tag is present.
    #[must_use]
    pub fn from_tags(tags: &[String]) -> Option<Self> {
        let managed_by = tags
            .iter()
            .find_map(|t| t.strip_prefix("managed:"))?
            .to_owned();
        let layer = tags
            .iter()
            .find_map(|t| t.strip_prefix("layer:"))
            .and_then(|v| v.parse().ok())
            .unwrap_or(Layer::Base);
        let org = tags.iter().find_map(|t| t.strip_prefix("org:")).map(str::to_owned);
        let project = tags.iter().find_map(|t| t.strip_prefix("project:")).map(str::to_owned);
        let package_version = tags.iter().find_map(|t| t.strip_prefix("package_version:")).map(str::to_owned);
        let last_synced = tags.iter().find_map(|t| t.strip_prefix("last_synced:")).map(str::to_owned);
        Some(Self {
            managed_by,
            layer,
            org,
            project,
            package_version,
            last_synced,
            description: None,
            source_path: None,
            adopted_at: None,
            original_name: None,
        })
    }
}

fn insert_opt(map: &mut HashMap<String, Value>, key: &str, value: &Option<String>) {
    if let Some(v) = value {
        map.insert(key.to_owned(), Value::String(v.clone()));
    }
}

fn str_field(map: &HashMap<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_map_roundtrip() {
        let meta = ManagedMetadata {
            managed_by: RECONCILER_ID.to_owned(),
            layer: Layer::Project,
            org: Some("acme".to_owned()),
            package_version: Some("abc1234".to_owned()),
            ..Default::default()
        };
        let map = meta.to_metadata_map();
        let parsed = ManagedMetadata::from_metadata_map(&map).unwrap();
        assert_eq!(parsed.layer, Layer::Project);
        assert_eq!(parsed.org.as_deref(), Some("acme"));
    }

    #[test]
    fn tags_roundtrip() {
        let meta = ManagedMetadata {
            managed_by: RECONCILER_ID.to_owned(),
            layer: Layer::Org,
            package_version: Some("deadbee".to_owned()),
            ..Default::default()
        };
        let tags = meta.to_tags();
        let parsed = ManagedMetadata::from_tags(&tags).unwrap();
        assert_eq!(parsed.layer, Layer::Org);
        assert_eq!(parsed.package_version.as_deref(), Some("deadbee"));
    }

    #[test]
    fn missing_marker_yields_none() {
        assert!(ManagedMetadata::from_metadata_map(&HashMap::new()).is_none());
        assert!(ManagedMetadata::from_tags(&[]).is_none());
    }
}
