//! # Trellis Core
//!
//! The building blocks of the Trellis resource router.
//!
//! This crate holds everything a resource provider or a boundary adapter needs
//! to know about, and nothing about how requests are routed:
//!
//! - **Request Model**: one request type per operation ([`ReadRequest`],
//!   [`QueryRequest`], ...) addressed by a [`ResourcePath`]
//! - **Results**: [`Resource`], [`QueryResult`] and the [`ResourceError`] taxonomy
//! - **Context Chain**: the immutable per-request trail of [`Context`] nodes
//! - **Promises**: the single-assignment [`Promise`] and the [`when`] combinator
//! - **Contracts**: [`RequestHandler`], the two provider shapes, and the
//!   [`Connection`] / [`ConnectionFactory`] pair
//!
//! ## Data Flow
//!
//! ```text
//! ┌────────────┐     ┌────────────┐     ┌────────────┐     ┌────────────┐
//! │ Connection │────▶│   Router   │────▶│   Router   │────▶│  Provider  │
//! │            │◀────│ (RequestH.)│◀────│ (RequestH.)│◀────│  adapter   │
//! └────────────┘     └────────────┘     └────────────┘     └────────────┘
//!        ▲                      Promise<T> flows back
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use trellis_core::{Context, Promise, ReadRequest, RequestHandler, Resource};
//!
//! struct Hello;
//!
//! impl RequestHandler for Hello {
//!     fn handle_read(&self, _ctx: Context, req: Arc<ReadRequest>) -> Promise<Resource> {
//!         Promise::succeeded(Resource::with_id(req.resource_path.to_string(), "hi".into()))
//!     }
//! }
//! ```

pub mod connection;
pub mod context;
pub mod error;
pub mod foundation;
pub mod handler;
pub mod promise;
pub mod request;

pub use connection::{BoxedConnection, Connection, ConnectionCallback, ConnectionFactory};
pub use context::{Context, ContextData, ContextIter, RouterContext, ServerContext};
pub use error::{ErrorKind, ResourceError, ResourceResult};
pub use foundation::{QueryResult, Resource, ResourcePath};
pub use handler::{
    BoxedQueryHandler, BoxedRequestHandler, CollectionResourceProvider, QueryResourceHandler,
    RequestHandler, SingletonResourceProvider,
};
pub use promise::{Promise, when};
pub use request::{
    ActionRequest, CreateRequest, DeleteRequest, PatchOperation, PatchOperationKind,
    PatchRequest, QueryRequest, ReadRequest, Request, RequestType, SortKey, UpdateRequest,
};

/// Prelude for common imports.
pub mod prelude {
    pub use super::context::Context;
    pub use super::error::{ResourceError, ResourceResult};
    pub use super::foundation::*;
    pub use super::handler::*;
    pub use super::promise::{Promise, when};
    pub use super::request::*;
}
