//! Concrete request types, one per operation kind.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::foundation::ResourcePath;

/// The seven operation kinds understood by a [`RequestHandler`](crate::RequestHandler).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestType {
    Action,
    Create,
    Delete,
    Patch,
    Query,
    Read,
    Update,
}

impl RequestType {
    /// Returns the lowercase name of this operation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Action => "action",
            Self::Create => "create",
            Self::Delete => "delete",
            Self::Patch => "patch",
            Self::Query => "query",
            Self::Read => "read",
            Self::Update => "update",
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Behaviour common to every request.
///
/// This trait is object safe so that matchers can inspect any request through
/// `&dyn Request`. Producing a rewritten copy requires a concrete type, see
/// [`Request::copy_with_path`].
pub trait Request: fmt::Debug + Send + Sync + 'static {
    /// Returns the operation kind.
    fn request_type(&self) -> RequestType;

    /// Returns the resource path this request is addressed to.
    fn resource_path(&self) -> &ResourcePath;

    /// Replaces the resource path.
    fn set_resource_path(&mut self, path: ResourcePath);

    /// Returns the fields the caller wants in the response; empty means all.
    fn fields(&self) -> &[String];

    /// Returns a copy of this request addressed to `path`.
    ///
    /// The original is left untouched.
    fn copy_with_path(&self, path: ResourcePath) -> Self
    where
        Self: Sized + Clone,
    {
        let mut copy = self.clone();
        copy.set_resource_path(path);
        copy
    }
}

macro_rules! impl_request {
    ($($ty:ident => $kind:ident),* $(,)?) => {
        $(
            impl Request for $ty {
                fn request_type(&self) -> RequestType {
                    RequestType::$kind
                }

                fn resource_path(&self) -> &ResourcePath {
                    &self.resource_path
                }

                fn set_resource_path(&mut self, path: ResourcePath) {
                    self.resource_path = path;
                }

                fn fields(&self) -> &[String] {
                    &self.fields
                }
            }

            impl $ty {
                /// Adds a field to return in the response.
                pub fn with_field(mut self, field: impl Into<String>) -> Self {
                    self.fields.push(field.into());
                    self
                }
            }
        )*
    };
}

impl_request!(
    ActionRequest => Action,
    CreateRequest => Create,
    DeleteRequest => Delete,
    PatchRequest => Patch,
    QueryRequest => Query,
    ReadRequest => Read,
    UpdateRequest => Update,
);

// =============================================================================
// Action
// =============================================================================

/// Performs a named action against a collection or instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub resource_path: ResourcePath,
    /// The action to perform, e.g. `reset-password`.
    pub action: String,
    /// Optional action payload.
    #[serde(default)]
    pub content: Option<Value>,
    /// Free-form parameters.
    #[serde(default)]
    pub additional_parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub fields: Vec<String>,
}

impl ActionRequest {
    pub fn new(path: impl Into<ResourcePath>, action: impl Into<String>) -> Self {
        Self {
            resource_path: path.into(),
            action: action.into(),
            content: None,
            additional_parameters: BTreeMap::new(),
            fields: Vec::new(),
        }
    }

    pub fn with_content(mut self, content: Value) -> Self {
        self.content = Some(content);
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.additional_parameters.insert(name.into(), value.into());
        self
    }
}

// =============================================================================
// Create
// =============================================================================

/// Creates a new resource, optionally with a client-assigned id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateRequest {
    pub resource_path: ResourcePath,
    /// Client supplied identifier for the new resource.
    #[serde(default)]
    pub new_resource_id: Option<String>,
    pub content: Value,
    #[serde(default)]
    pub fields: Vec<String>,
}

impl CreateRequest {
    pub fn new(path: impl Into<ResourcePath>, content: Value) -> Self {
        Self {
            resource_path: path.into(),
            new_resource_id: None,
            content,
            fields: Vec::new(),
        }
    }

    pub fn with_new_resource_id(mut self, id: impl Into<String>) -> Self {
        self.new_resource_id = Some(id.into());
        self
    }
}

// =============================================================================
// Delete
// =============================================================================

/// Deletes an existing resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub resource_path: ResourcePath,
    /// Expected revision; `None` deletes unconditionally.
    #[serde(default)]
    pub revision: Option<String>,
    #[serde(default)]
    pub fields: Vec<String>,
}

impl DeleteRequest {
    pub fn new(path: impl Into<ResourcePath>) -> Self {
        Self {
            resource_path: path.into(),
            revision: None,
            fields: Vec::new(),
        }
    }

    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }
}

// =============================================================================
// Patch
// =============================================================================

/// The kind of a single field-level patch operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOperationKind {
    Add,
    Remove,
    Replace,
    Increment,
}

/// A single field-level change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    pub operation: PatchOperationKind,
    /// JSON pointer to the targeted field.
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl PatchOperation {
    pub fn add(field: impl Into<String>, value: Value) -> Self {
        Self::new(PatchOperationKind::Add, field, Some(value))
    }

    pub fn remove(field: impl Into<String>) -> Self {
        Self::new(PatchOperationKind::Remove, field, None)
    }

    pub fn replace(field: impl Into<String>, value: Value) -> Self {
        Self::new(PatchOperationKind::Replace, field, Some(value))
    }

    pub fn increment(field: impl Into<String>, amount: Value) -> Self {
        Self::new(PatchOperationKind::Increment, field, Some(amount))
    }

    fn new(operation: PatchOperationKind, field: impl Into<String>, value: Option<Value>) -> Self {
        Self {
            operation,
            field: field.into(),
            value,
        }
    }
}

/// Applies a list of field-level operations to a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchRequest {
    pub resource_path: ResourcePath,
    #[serde(default)]
    pub revision: Option<String>,
    pub operations: Vec<PatchOperation>,
    #[serde(default)]
    pub fields: Vec<String>,
}

impl PatchRequest {
    pub fn new(path: impl Into<ResourcePath>, operations: Vec<PatchOperation>) -> Self {
        Self {
            resource_path: path.into(),
            revision: None,
            operations,
            fields: Vec::new(),
        }
    }

    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }
}

// =============================================================================
// Query
// =============================================================================

/// A sort key: a field and a direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: String,
    pub ascending: bool,
}

impl SortKey {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ascending: true,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ascending: false,
        }
    }

    /// Parses `+field`, `-field` or `field` (ascending).
    pub fn parse(key: &str) -> Self {
        match key.strip_prefix('-') {
            Some(field) => Self::descending(field),
            None => Self::ascending(key.strip_prefix('+').unwrap_or(key)),
        }
    }
}

/// Searches a collection; matches are streamed before the terminal result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub resource_path: ResourcePath,
    /// Filter expression, interpreted by the provider.
    #[serde(default)]
    pub query_filter: Option<String>,
    /// Identifier of a predefined query.
    #[serde(default)]
    pub query_id: Option<String>,
    /// Native query expression.
    #[serde(default)]
    pub query_expression: Option<String>,
    #[serde(default)]
    pub sort_keys: Vec<SortKey>,
    /// Requested page size; `0` means no paging.
    #[serde(default)]
    pub page_size: u32,
    #[serde(default)]
    pub paged_results_cookie: Option<String>,
    #[serde(default)]
    pub paged_results_offset: u32,
    #[serde(default)]
    pub additional_parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub fields: Vec<String>,
}

impl QueryRequest {
    pub fn new(path: impl Into<ResourcePath>) -> Self {
        Self {
            resource_path: path.into(),
            query_filter: None,
            query_id: None,
            query_expression: None,
            sort_keys: Vec::new(),
            page_size: 0,
            paged_results_cookie: None,
            paged_results_offset: 0,
            additional_parameters: BTreeMap::new(),
            fields: Vec::new(),
        }
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.query_filter = Some(filter.into());
        self
    }

    pub fn with_query_id(mut self, id: impl Into<String>) -> Self {
        self.query_id = Some(id.into());
        self
    }

    pub fn with_sort_key(mut self, key: SortKey) -> Self {
        self.sort_keys.push(key);
        self
    }

    pub fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = size;
        self
    }

    pub fn with_paged_results_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.paged_results_cookie = Some(cookie.into());
        self
    }
}

// =============================================================================
// Read
// =============================================================================

/// Reads a single resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadRequest {
    pub resource_path: ResourcePath,
    #[serde(default)]
    pub fields: Vec<String>,
}

impl ReadRequest {
    pub fn new(path: impl Into<ResourcePath>) -> Self {
        Self {
            resource_path: path.into(),
            fields: Vec::new(),
        }
    }
}

// =============================================================================
// Update
// =============================================================================

/// Replaces the content of an existing resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateRequest {
    pub resource_path: ResourcePath,
    #[serde(default)]
    pub revision: Option<String>,
    pub content: Value,
    #[serde(default)]
    pub fields: Vec<String>,
}

impl UpdateRequest {
    pub fn new(path: impl Into<ResourcePath>, content: Value) -> Self {
        Self {
            resource_path: path.into(),
            revision: None,
            content,
            fields: Vec::new(),
        }
    }

    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_copy_with_path_leaves_original() {
        let original = UpdateRequest::new("users/42", json!({"a": 1})).with_revision("7");
        let copy = original.copy_with_path(ResourcePath::parse("42"));
        assert_eq!(original.resource_path().to_string(), "users/42");
        assert_eq!(copy.resource_path().to_string(), "42");
        assert_eq!(copy.revision.as_deref(), Some("7"));
        assert_eq!(copy.content, original.content);
    }

    #[test]
    fn test_request_types() {
        let requests: Vec<Box<dyn Request>> = vec![
            Box::new(ActionRequest::new("a", "go")),
            Box::new(CreateRequest::new("a", json!({}))),
            Box::new(DeleteRequest::new("a")),
            Box::new(PatchRequest::new("a", vec![PatchOperation::remove("/x")])),
            Box::new(QueryRequest::new("a")),
            Box::new(ReadRequest::new("a").with_field("name")),
            Box::new(UpdateRequest::new("a", json!({}))),
        ];
        let names: Vec<_> = requests.iter().map(|r| r.request_type().as_str()).collect();
        assert_eq!(
            names,
            ["action", "create", "delete", "patch", "query", "read", "update"]
        );
        assert_eq!(requests[5].fields(), ["name"]);
    }

    #[test]
    fn test_sort_key_parse() {
        assert_eq!(SortKey::parse("-age"), SortKey::descending("age"));
        assert_eq!(SortKey::parse("+name"), SortKey::ascending("name"));
        assert_eq!(SortKey::parse("name"), SortKey::ascending("name"));
    }
}
