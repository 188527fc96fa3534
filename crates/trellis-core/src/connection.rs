//! Connection abstractions.
//!
//! Code that wants to "obtain a connection, then invoke operations on it" is
//! written against [`Connection`] and [`ConnectionFactory`]. The router crate
//! provides in-process implementations that forward to a
//! [`RequestHandler`](crate::RequestHandler) without any real transport.

use std::sync::Arc;

use serde_json::Value;

use crate::context::Context;
use crate::error::ResourceResult;
use crate::foundation::{QueryResult, Resource};
use crate::handler::BoxedQueryHandler;
use crate::promise::Promise;
use crate::request::{
    ActionRequest, CreateRequest, DeleteRequest, PatchRequest, QueryRequest, ReadRequest,
    UpdateRequest,
};

/// A connection to a resource tree.
pub trait Connection: Send + Sync {
    fn action(&self, context: Context, request: ActionRequest) -> Promise<Value>;

    fn create(&self, context: Context, request: CreateRequest) -> Promise<Resource>;

    fn delete(&self, context: Context, request: DeleteRequest) -> Promise<Resource>;

    fn patch(&self, context: Context, request: PatchRequest) -> Promise<Resource>;

    /// Streams matches into `handler` before the returned promise completes.
    fn query(
        &self,
        context: Context,
        request: QueryRequest,
        handler: BoxedQueryHandler,
    ) -> Promise<QueryResult>;

    fn read(&self, context: Context, request: ReadRequest) -> Promise<Resource>;

    fn update(&self, context: Context, request: UpdateRequest) -> Promise<Resource>;

    /// Returns `true` while the connection can be used.
    fn is_valid(&self) -> bool;

    /// Returns `true` once the connection has been closed.
    fn is_closed(&self) -> bool;

    /// Releases the connection.
    fn close(&self);
}

/// A shared, type-erased connection.
pub type BoxedConnection = Arc<dyn Connection>;

/// Callback invoked with a freshly acquired connection.
pub type ConnectionCallback = Box<dyn FnOnce(BoxedConnection) + Send>;

/// Hands out connections.
pub trait ConnectionFactory: Send + Sync {
    /// Acquires a connection, waiting if necessary.
    fn get_connection(&self) -> ResourceResult<BoxedConnection>;

    /// Acquires a connection asynchronously.
    ///
    /// `on_ready`, when given, is invoked with the connection as soon as it is
    /// available, before the returned promise's observers.
    fn get_connection_async(&self, on_ready: Option<ConnectionCallback>)
    -> Promise<BoxedConnection>;

    /// Releases any resources held by the factory.
    fn close(&self);
}
