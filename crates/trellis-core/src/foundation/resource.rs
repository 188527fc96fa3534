//! Result payloads returned by successful operations.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A resource returned by create, read, update, delete and patch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// The resource identifier, if it has one.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// The resource revision used for optimistic concurrency.
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    /// The resource content.
    #[serde(default)]
    pub content: Value,
}

impl Resource {
    /// Creates a new resource.
    pub fn new(id: Option<String>, revision: Option<String>, content: Value) -> Self {
        Self {
            id,
            revision,
            content,
        }
    }

    /// Convenience constructor for a resource with an id and no revision.
    pub fn with_id(id: impl Into<String>, content: Value) -> Self {
        Self::new(Some(id.into()), None, content)
    }
}

/// The terminal result of a query.
///
/// Matches themselves are streamed to a
/// [`QueryResourceHandler`](crate::QueryResourceHandler) before this value is
/// delivered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Opaque cookie for requesting the next page, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paged_results_cookie: Option<String>,
    /// Estimated remaining results, `-1` when unknown.
    #[serde(default = "unknown_remaining")]
    pub remaining_paged_results: i64,
}

fn unknown_remaining() -> i64 {
    -1
}

impl QueryResult {
    /// A result that has no further pages.
    pub fn complete() -> Self {
        Self {
            paged_results_cookie: None,
            remaining_paged_results: -1,
        }
    }

    /// A result that has more pages behind `cookie`.
    pub fn paged(cookie: impl Into<String>, remaining: i64) -> Self {
        Self {
            paged_results_cookie: Some(cookie.into()),
            remaining_paged_results: remaining,
        }
    }

    /// Returns `true` when there are no further pages to fetch.
    pub fn is_complete(&self) -> bool {
        self.paged_results_cookie.is_none()
    }
}
