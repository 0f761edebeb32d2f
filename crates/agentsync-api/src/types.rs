//! Wire-level value types shared by the sub-client traits (§6.3).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Pagination ordering direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

/// Field to order a paginated listing by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderBy {
    /// Order by creation timestamp.
    CreatedAt,
    /// Order by resource name.
    Name,
}

/// Cursor-based pagination parameters accepted by list endpoints.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    /// Maximum number of results to return.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Return results before this cursor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    /// Return results after this cursor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
    /// Sort direction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<Order>,
    /// Sort field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<OrderBy>,
}

/// A raw remote resource as returned by a list/retrieve endpoint.
///
/// The reconciliation core treats this as an opaque JSON document plus the
/// identifying fields it needs; sub-clients are free to also expose
/// strongly-typed accessors on top, but the plan/diff/apply code only reads
/// through [`RemoteResource`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RemoteResource {
    /// The remote platform's opaque resource id.
    pub id: String,
    /// Display name (blocks call this `label`; most other kinds call it
    /// `name` — callers normalize before constructing this value).
    pub name: String,
    /// Free-form metadata object (empty for tools, which carry everything
    /// in `tags` instead).
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    /// Tags attached to the resource (namespaced strings, §4.7).
    #[serde(default)]
    pub tags: Vec<String>,
    /// The remainder of the resource's fields, keyed by field name, used
    /// for drift comparison (`value`, `description`, `source_code`, ...).
    #[serde(flatten)]
    pub fields: HashMap<String, serde_json::Value>,
}

impl RemoteResource {
    /// Convenience constructor for tests and adapters.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            metadata: HashMap::new(),
            tags: Vec::new(),
            fields: HashMap::new(),
        }
    }

    /// Builder-style setter for a single field value, used heavily in tests.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Builder-style setter for the metadata map.
    #[must_use]
    pub fn with_metadata(mut self, metadata: HashMap<String, serde_json::Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Builder-style setter for tags.
    #[must_use]
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}
