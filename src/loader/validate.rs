//! Per-kind required-field validation (§4.1).

use crate::model::{Resource, ResourceKind};

/// Check a resource's kind-specific required fields.
///
/// # Errors
/// Returns a human-readable message naming the resource and the
/// missing/invalid field.
pub fn required_fields(resource: &Resource) -> Result<(), String> {
    let id = resource.id();
    match resource.kind {
        ResourceKind::Block => {
            require_str(resource, "label", &id)?;
            require_str(resource, "value", &id)?;
            if resource.spec.bool("isTemplate") == Some(true) {
                require_str(resource, "templateName", &id)?;
            }
            Ok(())
        }
        ResourceKind::Tool => {
            let source_type = require_str(resource, "sourceType", &id)?;
            if !["python", "typescript"].contains(&source_type) {
                return Err(format!("{id}: sourceType must be one of python, typescript"));
            }
            require_str(resource, "sourceCode", &id)?;
            let schema_type = resource
                .spec
                .path("jsonSchema.type")
                .and_then(serde_json::Value::as_str)
                .ok_or_else(|| format!("{id}: jsonSchema.type is required"))?;
            if schema_type != "function" {
                return Err(format!("{id}: jsonSchema.type must equal \"function\""));
            }
            let schema_name = resource
                .spec
                .path("jsonSchema.function.name")
                .and_then(serde_json::Value::as_str)
                .ok_or_else(|| format!("{id}: jsonSchema.function.name is required"))?;
            if schema_name != resource.metadata.name {
                return Err(format!(
                    "{id}: jsonSchema.function.name ({schema_name}) must equal metadata.name ({})",
                    resource.metadata.name
                ));
            }
            Ok(())
        }
        ResourceKind::McpServer => {
            if resource.spec.layer != Some(crate::model::Layer::Org) {
                return Err(format!("{id}: McpServer must have layer = org"));
            }
            let server_type = require_str(resource, "serverType", &id)?;
            match server_type {
                "stdio" => {
                    resource
                        .spec
                        .path("stdioConfig.command")
                        .and_then(serde_json::Value::as_str)
                        .ok_or_else(|| format!("{id}: stdioConfig.command is required for stdio servers"))?;
                }
                "sse" | "http" => {
                    require_str(resource, "serverUrl", &id)?;
                }
                other => return Err(format!("{id}: unsupported serverType '{other}'")),
            }
            Ok(())
        }
        ResourceKind::Folder => {
            if resource.spec.layer == Some(crate::model::Layer::Base) {
                return Err(format!("{id}: Folder must not have layer = base"));
            }
            resource
                .spec
                .path("embeddingConfig.model")
                .and_then(serde_json::Value::as_str)
                .ok_or_else(|| format!("{id}: embeddingConfig.model is required"))?;
            Ok(())
        }
        ResourceKind::Template => {
            require_str(resource, "baseTemplateId", &id)?;
            require_str(resource, "templateId", &id)?;
            resource
                .spec
                .path("agent.name")
                .and_then(serde_json::Value::as_str)
                .ok_or_else(|| format!("{id}: agent.name is required"))?;
            resource
                .spec
                .path("agent.modelConfig.model")
                .and_then(serde_json::Value::as_str)
                .ok_or_else(|| format!("{id}: agent.modelConfig.model is required"))?;
            Ok(())
        }
        ResourceKind::Identity | ResourceKind::AgentPolicy => Ok(()),
    }
}

fn require_str<'a>(resource: &'a Resource, field: &str, id: &crate::model::ResourceId) -> Result<&'a str, String> {
    resource
        .spec
        .str(field)
        .ok_or_else(|| format!("{id}: {field} is required"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Metadata, Spec, SUPPORTED_API_VERSION};
    use serde_json::json;

    fn resource_from(kind: ResourceKind, layer: crate::model::Layer, fields: serde_json::Map<String, serde_json::Value>) -> Resource {
        Resource {
            api_version: SUPPORTED_API_VERSION.to_owned(),
            kind,
            metadata: Metadata {
                name: "res".to_owned(),
                ..Default::default()
            },
            spec: Spec {
                layer: Some(layer),
                managed: true,
                merge_overrides: Default::default(),
                fields,
            },
            status: None,
            delete: false,
        }
    }

    #[test]
    fn block_requires_label_and_value() {
        let resource = resource_from(ResourceKind::Block, crate::model::Layer::Base, serde_json::Map::new());
        assert!(required_fields(&resource).is_err());
    }

    #[test]
    fn block_with_fields_passes() {
        let mut fields = serde_json::Map::new();
        fields.insert("label".to_owned(), json!("decisions"));
        fields.insert("value".to_owned(), json!("v"));
        let resource = resource_from(ResourceKind::Block, crate::model::Layer::Base, fields);
        assert!(required_fields(&resource).is_ok());
    }

    #[test]
    fn templated_block_requires_template_name() {
        let mut fields = serde_json::Map::new();
        fields.insert("label".to_owned(), json!("decisions"));
        fields.insert("value".to_owned(), json!("v"));
        fields.insert("isTemplate".to_owned(), json!(true));
        let resource = resource_from(ResourceKind::Block, crate::model::Layer::Base, fields);
        assert!(required_fields(&resource).is_err());
    }

    #[test]
    fn tool_schema_name_must_match_metadata_name() {
        let mut fields = serde_json::Map::new();
        fields.insert("sourceType".to_owned(), json!("python"));
        fields.insert("sourceCode".to_owned(), json!("def f(): pass"));
        fields.insert(
            "jsonSchema".to_owned(),
            json!({"type": "function", "function": {"name": "other"}}),
        );
        let resource = Resource {
            api_version: SUPPORTED_API_VERSION.to_owned(),
            kind: ResourceKind::Tool,
            metadata: Metadata {
                name: "search".to_owned(),
                ..Default::default()
            },
            spec: Spec {
                layer: Some(crate::model::Layer::Org),
                managed: true,
                merge_overrides: Default::default(),
                fields,
            },
            status: None,
            delete: false,
        };
        assert!(required_fields(&resource).is_err());
    }

    #[test]
    fn mcp_server_must_be_org_layer() {
        let mut fields = serde_json::Map::new();
        fields.insert("serverType".to_owned(), json!("stdio"));
        fields.insert("stdioConfig".to_owned(), json!({"command": "npx foo"}));
        let resource = resource_from(ResourceKind::McpServer, crate::model::Layer::Project, fields);
        assert!(required_fields(&resource).is_err());
    }

    #[test]
    fn folder_must_not_be_base_layer() {
        let mut fields = serde_json::Map::new();
        fields.insert("embeddingConfig".to_owned(), json!({"model": "text-embedding-3"}));
        let resource = resource_from(ResourceKind::Folder, crate::model::Layer::Base, fields);
        assert!(required_fields(&resource).is_err());
    }

    #[test]
    fn folder_at_org_layer_with_embedding_model_passes() {
        let mut fields = serde_json::Map::new();
        fields.insert("embeddingConfig".to_owned(), json!({"model": "text-embedding-3"}));
        let resource = resource_from(ResourceKind::Folder, crate::model::Layer::Org, fields);
        assert!(required_fields(&resource).is_ok());
    }
}
