//! The merge fold itself (§4.2 Precedence & composition, Conflict
//! detection, Layer tagging).

use std::collections::BTreeMap;

use serde_json::Value;

use super::conflict::MergeConflict;
use super::strategy::{default_strategy_for, resolve_array};
use super::{MergeOptions, MergeOutput};
use crate::loader::LayeredPackages;
use crate::model::{DesiredState, Layer, Metadata, MergeStrategy, Resource, ResourceId, ResourceKind, Spec};

/// Fields whose identity must agree across layers for a given kind; a
/// disagreement is a resource-identity conflict (§4.2, S5).
fn identifying_fields(kind: ResourceKind) -> &'static [&'static str] {
    match kind {
        ResourceKind::Tool => &["toolType"],
        _ => &[],
    }
}

pub fn merge(packages: &LayeredPackages, options: &MergeOptions) -> Result<MergeOutput, MergeConflict> {
    let mut groups: BTreeMap<ResourceId, Vec<(Layer, Resource)>> = BTreeMap::new();

    for package in packages.iter() {
        for resource in &package.resources {
            groups.entry(resource.id()).or_default().push((package.layer, resource.clone()));
        }
    }

    let mut desired_state = DesiredState::new();
    let mut warnings = Vec::new();

    for (id, mut layered) in groups {
        layered.sort_by_key(|(layer, _)| *layer);

        let contributing: Vec<Layer> = layered.iter().map(|(l, _)| *l).collect();
        let mut iter = layered.into_iter();
        let (_, mut merged) = iter.next().expect("group is non-empty");
        let mut seen_layers = vec![contributing[0]];

        for (layer, next) in iter {
            merged = merge_two(&id, merged, next, &seen_layers)?;
            seen_layers.push(layer);
        }

        if merged.delete {
            if contributing.len() == 1 {
                warnings.push(format!("{id}: _delete has no effect; no lower layer defines this resource"));
            }
            continue;
        }

        check_constraints(&id, &merged)?;

        if options.add_layer_tags && matches!(merged.kind, ResourceKind::Block | ResourceKind::Tool | ResourceKind::Template) {
            let mut tags = merged.spec.tags();
            for layer in &contributing {
                let tag = layer.tag_name().to_owned();
                if !tags.contains(&tag) {
                    tags.push(tag);
                }
            }
            merged.spec.set_tags(tags);
        }

        desired_state.insert(merged, contributing);
    }

    Ok(MergeOutput { desired_state, warnings })
}

fn merge_two(id: &ResourceId, lower: Resource, higher: Resource, lower_layers: &[Layer]) -> Result<Resource, MergeConflict> {
    for &field in identifying_fields(lower.kind) {
        if let (Some(lv), Some(hv)) = (lower.spec.fields.get(field), higher.spec.fields.get(field)) {
            if lv != hv {
                let mut layers = lower_layers.to_vec();
                if let Some(hl) = higher.spec.layer {
                    layers.push(hl);
                }
                return Err(MergeConflict::identity(id, layers, field));
            }
        }
    }

    let mut overrides = lower.spec.merge_overrides.clone();
    overrides.extend(higher.spec.merge_overrides.clone());

    let mut fields = lower.spec.fields.clone();
    for (key, value) in &higher.spec.fields {
        if value.is_null() {
            fields.remove(key);
            continue;
        }
        match (fields.get(key).cloned(), value) {
            (Some(Value::Array(lower_arr)), Value::Array(higher_arr)) => {
                let strategy: MergeStrategy = overrides.get(key).copied().unwrap_or_else(|| default_strategy_for(key));
                let merged_arr = resolve_array(strategy, &lower_arr, higher_arr);
                fields.insert(key.clone(), Value::Array(merged_arr));
            }
            (Some(lv), hv) if std::mem::discriminant(&lv) != std::mem::discriminant(hv) => {
                let mut layers = lower_layers.to_vec();
                if let Some(hl) = higher.spec.layer {
                    layers.push(hl);
                }
                return Err(MergeConflict::field_type(id, layers, key));
            }
            _ => {
                fields.insert(key.clone(), value.clone());
            }
        }
    }

    Ok(Resource {
        api_version: higher.api_version,
        kind: higher.kind,
        metadata: merge_metadata(&lower.metadata, &higher.metadata),
        spec: Spec {
            layer: higher.spec.layer.or(lower.spec.layer),
            managed: higher.spec.managed,
            merge_overrides: overrides,
            fields,
        },
        status: higher.status.or(lower.status),
        delete: higher.delete,
    })
}

fn merge_metadata(lower: &Metadata, higher: &Metadata) -> Metadata {
    let mut labels = lower.labels.clone();
    labels.extend(higher.labels.clone());
    let mut annotations = lower.annotations.clone();
    annotations.extend(higher.annotations.clone());
    Metadata {
        name: higher.name.clone(),
        description: higher.description.clone().or_else(|| lower.description.clone()),
        labels,
        annotations,
    }
}

fn check_constraints(id: &ResourceId, resource: &Resource) -> Result<(), MergeConflict> {
    match resource.kind {
        ResourceKind::Tool => {
            if let Some(schema_name) = resource.spec.path("jsonSchema.function.name").and_then(Value::as_str) {
                if schema_name != resource.metadata.name {
                    return Err(MergeConflict::constraint(
                        id,
                        "jsonSchema.function.name must equal metadata.name after merge",
                    ));
                }
            }
        }
        ResourceKind::Block => {
            if resource.spec.bool("isTemplate") == Some(true) && resource.spec.str("templateName").is_none() {
                return Err(MergeConflict::constraint(id, "isTemplate requires templateName after merge"));
            }
        }
        ResourceKind::Folder | ResourceKind::Identity => {
            if resource.spec.layer == Some(Layer::Base) {
                return Err(MergeConflict::constraint(id, "must not have layer = base after merge"));
            }
        }
        ResourceKind::McpServer => {
            if resource.spec.layer != Some(Layer::Org) {
                return Err(MergeConflict::constraint(id, "must have layer = org after merge"));
            }
        }
        ResourceKind::Template | ResourceKind::AgentPolicy => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::LayeredPackages;
    use crate::model::{Package, SUPPORTED_API_VERSION};
    use serde_json::json;
    use std::path::PathBuf;

    fn block(name: &str, value: &str) -> Resource {
        Resource::from_value(json!({
            "apiVersion": SUPPORTED_API_VERSION,
            "kind": "Block",
            "metadata": {"name": name},
            "spec": {"layer": "base", "label": name, "value": value},
        }))
        .unwrap()
        .unwrap()
    }

    fn tool(name: &str, tool_type: &str) -> Resource {
        Resource::from_value(json!({
            "apiVersion": SUPPORTED_API_VERSION,
            "kind": "Tool",
            "metadata": {"name": name},
            "spec": {"layer": "base", "toolType": tool_type, "sourceType": "python", "sourceCode": "x"},
        }))
        .unwrap()
        .unwrap()
    }

    fn layered(base: Vec<Resource>, project: Vec<Resource>) -> LayeredPackages {
        LayeredPackages {
            base: Some(Package {
                layer: Layer::Base,
                source: PathBuf::from("/base"),
                resources: base,
            }),
            org: None,
            project: Some(Package {
                layer: Layer::Project,
                source: PathBuf::from("/project"),
                resources: project,
            }),
        }
    }

    #[test]
    fn project_wins_scalar_precedence() {
        let mut b = block("decisions", "v1");
        b.spec.layer = Some(Layer::Base);
        let mut p = block("decisions", "v2");
        p.spec.layer = Some(Layer::Project);
        let packages = layered(vec![b], vec![p]);
        let result = merge(&packages, &MergeOptions::default()).unwrap();
        let id = ResourceId::new(ResourceKind::Block, "decisions");
        assert_eq!(result.desired_state.get(&id).unwrap().spec.str("value"), Some("v2"));
    }

    #[test]
    fn conflicting_tool_type_is_a_merge_conflict() {
        let mut b = tool("foo", "custom");
        b.spec.layer = Some(Layer::Base);
        let mut p = tool("foo", "external");
        p.spec.layer = Some(Layer::Project);
        let packages = layered(vec![b], vec![p]);
        let err = merge(&packages, &MergeOptions::default()).unwrap_err();
        assert_eq!(err.kind, super::super::ConflictKind::ResourceIdentityConflict);
        assert_eq!(err.path, "Tool.foo");
    }

    #[test]
    fn layer_tags_are_appended_by_default() {
        let mut b = block("decisions", "v1");
        b.spec.layer = Some(Layer::Base);
        let packages = layered(vec![b], vec![]);
        let result = merge(&packages, &MergeOptions::default()).unwrap();
        let id = ResourceId::new(ResourceKind::Block, "decisions");
        let tags = result.desired_state.get(&id).unwrap().spec.tags();
        assert!(tags.contains(&"_layer:base".to_owned()));
    }

    #[test]
    fn delete_with_single_contributing_layer_warns() {
        let mut b = block("temp", "v1");
        b.spec.layer = Some(Layer::Base);
        b.delete = true;
        let packages = layered(vec![b], vec![]);
        let result = merge(&packages, &MergeOptions::default()).unwrap();
        assert!(!result.warnings.is_empty());
        let id = ResourceId::new(ResourceKind::Block, "temp");
        assert!(result.desired_state.get(&id).is_none());
    }

    #[test]
    fn delete_at_higher_layer_removes_resource_without_warning() {
        let mut b = block("temp", "v1");
        b.spec.layer = Some(Layer::Base);
        let mut p = block("temp", "v1");
        p.spec.layer = Some(Layer::Project);
        p.delete = true;
        let packages = layered(vec![b], vec![p]);
        let result = merge(&packages, &MergeOptions::default()).unwrap();
        assert!(result.warnings.is_empty());
        let id = ResourceId::new(ResourceKind::Block, "temp");
        assert!(result.desired_state.get(&id).is_none());
    }

    #[test]
    fn template_requires_template_name_post_merge() {
        let mut b = Resource::from_value(json!({
            "apiVersion": SUPPORTED_API_VERSION,
            "kind": "Block",
            "metadata": {"name": "x"},
            "spec": {"layer": "base", "label": "x", "value": "v", "isTemplate": true},
        }))
        .unwrap()
        .unwrap();
        b.spec.layer = Some(Layer::Base);
        let packages = layered(vec![b], vec![]);
        let err = merge(&packages, &MergeOptions::default()).unwrap_err();
        assert_eq!(err.kind, super::super::ConflictKind::ConstraintViolation);
    }
}
