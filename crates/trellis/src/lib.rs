//! # Trellis
//!
//! A resource router and asynchronous dispatch layer.
//!
//! ## Overview
//!
//! Every resource is addressed by a path. Requests are handed to a
//! [`RequestHandler`](core::RequestHandler), usually a
//! [`Router`](router::Router) that picks the most specific route and forwards
//! the request with the consumed part of the path removed. Results come back
//! as a [`Promise`](core::Promise).
//!
//! ```text
//! ┌────────────┐     ┌────────────┐     ┌──────────────────────────┐
//! │ Connection │────▶│   Router   │────▶│ "users"    (collection)  │──▶ provider
//! │ (internal) │     │            │────▶│ "settings" (singleton)   │──▶ provider
//! └────────────┘     └────────────┘────▶│ ...        (any handler) │
//!                                       └──────────────────────────┘
//! ```
//!
//! - **Core**: request model, context chain, promises and provider contracts
//! - **Router**: URI template matching, path rewriting and provider adapters
//! - **Runtime**: configuration, logging and bootstrap of a resource tree
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use trellis::prelude::*;
//!
//! let router = Router::new();
//! router.add_collection("users", Arc::new(UserStore::default()))?;
//! router.add_singleton("settings", Arc::new(Settings::default()))?;
//!
//! let connection = internal_connection(router);
//! let user = connection
//!     .read(Context::root(), ReadRequest::new("users/42"))
//!     .await?;
//! ```
//!
//! ## Features
//!
//! - `toml-config`: TOML configuration files (default)
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use trellis_core as core;
pub use trellis_router as router;
pub use trellis_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use trellis::prelude::*;
/// ```
pub mod prelude {
    // Runtime - configured entry point
    pub use trellis_runtime::{Bootstrap, HandlerRegistry, TrellisRuntime};

    // Routing
    pub use trellis_router::{
        RoutingMode, Router, UriRouteMatcher, internal_connection, internal_connection_factory,
        new_collection, new_singleton,
    };

    // Requests and results
    pub use trellis_core::{
        ActionRequest, CreateRequest, DeleteRequest, PatchOperation, PatchRequest, QueryRequest,
        QueryResult, ReadRequest, Request, RequestType, Resource, ResourcePath, UpdateRequest,
    };

    // Contracts for custom handlers and providers
    pub use trellis_core::{
        CollectionResourceProvider, Connection, ConnectionFactory, Context, Promise,
        QueryResourceHandler, RequestHandler, ResourceError, ResourceResult,
        SingletonResourceProvider, when,
    };
}
