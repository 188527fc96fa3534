//! # Trellis Router
//!
//! Routing for the Trellis resource tree.
//!
//! - [`Router`]: dispatches each request to the best matching route, rewriting
//!   the resource path to what the route did not consume
//! - [`UriRouteMatcher`]: exact or prefix matching against URI templates with
//!   `{variable}` segments
//! - [`new_collection`] / [`new_singleton`]: adapt resource providers into
//!   handlers
//! - [`InternalConnection`] / [`InternalConnectionFactory`]: in-process
//!   connections onto a handler
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use trellis_core::{Context, ReadRequest};
//! use trellis_router::{Router, internal_connection};
//!
//! let router = Router::new();
//! router.add_collection("users", Arc::new(UserStore::default()))?;
//!
//! let connection = internal_connection(router);
//! let user = connection.read(Context::root(), ReadRequest::new("users/42")).await?;
//! ```

pub mod connection;
pub mod matcher;
pub mod resources;
pub mod router;
pub mod template;

pub use connection::{
    InternalConnection, InternalConnectionFactory, internal_connection,
    internal_connection_factory,
};
pub use matcher::{
    IncomparableRouteMatch, RouteMatch, RouteMatcher, RoutingMode, UriRouteMatch, UriRouteMatcher,
};
pub use resources::{ID_VARIABLE, QueryGuard, SingletonHandler, new_collection, new_singleton};
pub use router::{RouteId, Router};
pub use template::{TemplateError, TemplateSegment, UriTemplate};
