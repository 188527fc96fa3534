//! The request context chain.
//!
//! A [`Context`] is a persistent, immutable, singly-linked list of nodes. Each
//! routing hop that has something to record pushes a new node in front of the
//! chain it received and passes the new head on; nodes are never modified after
//! construction, so a chain can be shared across threads without locking.
//!
//! ```text
//! router("42")  ──▶  router("users")  ──▶  server(conn)  ──▶  root(id)
//!   (newest)                                                  (oldest)
//! ```
//!
//! Lookups walk from the newest node to the oldest, so an inner hop shadows
//! what an outer hop recorded under the same name.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::connection::BoxedConnection;
use crate::foundation::ResourcePath;

/// Logical name of the root node.
pub const ROOT_CONTEXT: &str = "root";
/// Logical name of nodes recording the server side of a request.
pub const SERVER_CONTEXT: &str = "server";
/// Logical name of server nodes created for in-process calls.
pub const INTERNAL_SERVER_CONTEXT: &str = "internalServer";
/// Logical name of nodes recording a routing decision.
pub const ROUTER_CONTEXT: &str = "router";

/// Server-side information about how a request entered the resource tree.
#[derive(Clone)]
pub struct ServerContext {
    connection: Option<BoxedConnection>,
    external: bool,
}

impl ServerContext {
    /// The connection that can be used to re-enter the resource tree.
    pub fn connection(&self) -> Option<&BoxedConnection> {
        self.connection.as_ref()
    }

    /// Returns `true` if the request originated outside the process.
    pub fn is_external(&self) -> bool {
        self.external
    }
}

impl fmt::Debug for ServerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerContext")
            .field("has_connection", &self.connection.is_some())
            .field("external", &self.external)
            .finish()
    }
}

/// The outcome of one routing decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterContext {
    matched: ResourcePath,
    remaining: ResourcePath,
    variables: BTreeMap<String, String>,
}

impl RouterContext {
    /// The portion of the path consumed by the matched route.
    pub fn matched_path(&self) -> &ResourcePath {
        &self.matched
    }

    /// The portion of the path left for the next hop.
    pub fn remaining_path(&self) -> &ResourcePath {
        &self.remaining
    }

    /// Template variables bound by this hop only.
    pub fn variables(&self) -> &BTreeMap<String, String> {
        &self.variables
    }
}

/// Data carried by a single context node.
#[derive(Debug, Clone)]
pub enum ContextData {
    /// The oldest node of every chain.
    Root,
    /// Server-side entry point.
    Server(ServerContext),
    /// A routing decision.
    Router(RouterContext),
    /// Arbitrary named attributes.
    Attributes(BTreeMap<String, Value>),
}

struct ContextNode {
    id: Arc<str>,
    name: Cow<'static, str>,
    parent: Option<Context>,
    data: ContextData,
}

/// A handle to the head of a context chain. Cloning is cheap.
#[derive(Clone)]
pub struct Context {
    node: Arc<ContextNode>,
}

impl Context {
    /// Creates a root context with a random id.
    pub fn root() -> Self {
        Self::root_with_id(uuid::Uuid::new_v4().to_string())
    }

    /// Creates a root context with the given id.
    pub fn root_with_id(id: impl Into<String>) -> Self {
        Self {
            node: Arc::new(ContextNode {
                id: Arc::from(id.into()),
                name: Cow::Borrowed(ROOT_CONTEXT),
                parent: None,
                data: ContextData::Root,
            }),
        }
    }

    /// Pushes a server node for a request that arrived from outside the process.
    pub fn server(&self, connection: Option<BoxedConnection>) -> Self {
        self.push(
            SERVER_CONTEXT,
            ContextData::Server(ServerContext {
                connection,
                external: true,
            }),
        )
    }

    /// Pushes a server node for a request made from within the process.
    pub fn internal_server(&self, connection: Option<BoxedConnection>) -> Self {
        self.push(
            INTERNAL_SERVER_CONTEXT,
            ContextData::Server(ServerContext {
                connection,
                external: false,
            }),
        )
    }

    /// Pushes a routing decision.
    pub fn router(
        &self,
        matched: ResourcePath,
        remaining: ResourcePath,
        variables: BTreeMap<String, String>,
    ) -> Self {
        self.push(
            ROUTER_CONTEXT,
            ContextData::Router(RouterContext {
                matched,
                remaining,
                variables,
            }),
        )
    }

    /// Pushes a node of named attributes.
    pub fn with_attributes(
        &self,
        name: impl Into<Cow<'static, str>>,
        attributes: BTreeMap<String, Value>,
    ) -> Self {
        self.push(name, ContextData::Attributes(attributes))
    }

    /// Pushes a node holding a single attribute.
    pub fn with_attribute(&self, key: impl Into<String>, value: Value) -> Self {
        let mut attributes = BTreeMap::new();
        attributes.insert(key.into(), value);
        self.with_attributes("attributes", attributes)
    }

    fn push(&self, name: impl Into<Cow<'static, str>>, data: ContextData) -> Self {
        Self {
            node: Arc::new(ContextNode {
                id: Arc::clone(&self.node.id),
                name: name.into(),
                parent: Some(self.clone()),
                data,
            }),
        }
    }

    // ─── Node accessors ──────────────────────────────────────────────────────

    /// The request id, inherited from the root.
    pub fn id(&self) -> &str {
        &self.node.id
    }

    /// The logical name of this node.
    pub fn name(&self) -> &str {
        &self.node.name
    }

    /// The next older node.
    pub fn parent(&self) -> Option<&Context> {
        self.node.parent.as_ref()
    }

    /// The data carried by this node only.
    pub fn data(&self) -> &ContextData {
        &self.node.data
    }

    /// Returns `true` if this node itself is a server node.
    pub fn is_server(&self) -> bool {
        matches!(self.node.data, ContextData::Server(_))
    }

    /// Returns `true` if both handles point at the same node.
    pub fn ptr_eq(&self, other: &Context) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }

    // ─── Chain lookups ───────────────────────────────────────────────────────

    /// Iterates from this node to the root.
    pub fn iter(&self) -> ContextIter<'_> {
        ContextIter { next: Some(self) }
    }

    /// Number of nodes in the chain.
    pub fn depth(&self) -> usize {
        self.iter().count()
    }

    /// Finds the newest node with the given logical name.
    pub fn find(&self, name: &str) -> Option<&Context> {
        self.iter().find(|c| c.name() == name)
    }

    /// Returns `true` if any node has the given logical name.
    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// The newest server node in the chain.
    pub fn as_server(&self) -> Option<&ServerContext> {
        self.iter().find_map(|c| match c.data() {
            ContextData::Server(server) => Some(server),
            _ => None,
        })
    }

    /// The newest routing decision in the chain.
    pub fn as_router(&self) -> Option<&RouterContext> {
        self.iter().find_map(|c| match c.data() {
            ContextData::Router(router) => Some(router),
            _ => None,
        })
    }

    /// Looks up a template variable bound by any routing hop, newest first.
    pub fn uri_template_variable(&self, name: &str) -> Option<&str> {
        self.iter().find_map(|c| match c.data() {
            ContextData::Router(router) => router.variables.get(name).map(String::as_str),
            _ => None,
        })
    }

    /// All template variables bound along the chain; inner hops win.
    pub fn uri_template_variables(&self) -> BTreeMap<String, String> {
        let routers: Vec<_> = self
            .iter()
            .filter_map(|c| match c.data() {
                ContextData::Router(router) => Some(router),
                _ => None,
            })
            .collect();

        let mut merged = BTreeMap::new();
        for router in routers.into_iter().rev() {
            merged.extend(router.variables.clone());
        }
        merged
    }

    /// Looks up an attribute, newest first.
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.iter().find_map(|c| match c.data() {
            ContextData::Attributes(attrs) => attrs.get(key),
            _ => None,
        })
    }

    /// Returns `true` if the newest server node records an internal call.
    pub fn is_internal(&self) -> bool {
        self.as_server().is_some_and(|s| !s.is_external())
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("data", self.data())
            .field("parent", &self.parent())
            .finish()
    }
}

/// Iterator over a context chain, newest node first.
pub struct ContextIter<'a> {
    next: Option<&'a Context>,
}

impl<'a> Iterator for ContextIter<'a> {
    type Item = &'a Context;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent();
        Some(current)
    }
}
