//! In-process connections.
//!
//! An [`InternalConnection`] forwards every operation straight to a
//! [`RequestHandler`], usually the root [`Router`](crate::Router), without any
//! transport in between. Before forwarding it makes sure the context chain
//! starts with a server node so that handlers can always find a connection to
//! re-enter the resource tree.

use std::sync::{Arc, Weak};

use serde_json::Value;
use tracing::trace;

use trellis_core::{
    ActionRequest, BoxedConnection, BoxedQueryHandler, BoxedRequestHandler, Connection,
    ConnectionCallback, ConnectionFactory, Context, CreateRequest, DeleteRequest, PatchRequest,
    Promise, QueryRequest, QueryResult, ReadRequest, RequestHandler, Resource, ResourceResult,
    UpdateRequest,
};

/// Wraps `handler` in a connection.
pub fn internal_connection<H>(handler: H) -> BoxedConnection
where
    H: RequestHandler + 'static,
{
    InternalConnection::new(Arc::new(handler))
}

/// Wraps `handler` in a factory handing out internal connections.
pub fn internal_connection_factory<H>(handler: H) -> InternalConnectionFactory
where
    H: RequestHandler + 'static,
{
    InternalConnectionFactory::new(Arc::new(handler))
}

/// A connection that dispatches to a handler in the same process.
///
/// Internal connections are always valid and never closed.
pub struct InternalConnection {
    handler: BoxedRequestHandler,
    this: Weak<InternalConnection>,
}

impl InternalConnection {
    pub fn new(handler: BoxedRequestHandler) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            handler,
            this: this.clone(),
        })
    }

    /// Returns `context` if it already starts with a server node, otherwise
    /// pushes an internal server node.
    ///
    /// The pushed node carries the connection of the nearest server node
    /// further down the chain, or this connection if there is none.
    fn server_context(&self, context: Context) -> Context {
        if context.is_server() {
            return context;
        }

        let connection = context
            .as_server()
            .and_then(|server| server.connection().cloned())
            .or_else(|| self.this.upgrade().map(|this| this as BoxedConnection));
        trace!(context = %context.id(), "Pushing internal server context");
        context.internal_server(connection)
    }
}

impl Connection for InternalConnection {
    fn action(&self, context: Context, request: ActionRequest) -> Promise<Value> {
        self.handler
            .handle_action(self.server_context(context), Arc::new(request))
    }

    fn create(&self, context: Context, request: CreateRequest) -> Promise<Resource> {
        self.handler
            .handle_create(self.server_context(context), Arc::new(request))
    }

    fn delete(&self, context: Context, request: DeleteRequest) -> Promise<Resource> {
        self.handler
            .handle_delete(self.server_context(context), Arc::new(request))
    }

    fn patch(&self, context: Context, request: PatchRequest) -> Promise<Resource> {
        self.handler
            .handle_patch(self.server_context(context), Arc::new(request))
    }

    fn query(
        &self,
        context: Context,
        request: QueryRequest,
        handler: BoxedQueryHandler,
    ) -> Promise<QueryResult> {
        self.handler
            .handle_query(self.server_context(context), Arc::new(request), handler)
    }

    fn read(&self, context: Context, request: ReadRequest) -> Promise<Resource> {
        self.handler
            .handle_read(self.server_context(context), Arc::new(request))
    }

    fn update(&self, context: Context, request: UpdateRequest) -> Promise<Resource> {
        self.handler
            .handle_update(self.server_context(context), Arc::new(request))
    }

    fn is_valid(&self) -> bool {
        true
    }

    fn is_closed(&self) -> bool {
        false
    }

    fn close(&self) {}
}

/// Hands out [`InternalConnection`]s for one handler.
#[derive(Clone)]
pub struct InternalConnectionFactory {
    handler: BoxedRequestHandler,
}

impl InternalConnectionFactory {
    pub fn new(handler: BoxedRequestHandler) -> Self {
        Self { handler }
    }
}

impl ConnectionFactory for InternalConnectionFactory {
    fn get_connection(&self) -> ResourceResult<BoxedConnection> {
        Ok(InternalConnection::new(Arc::clone(&self.handler)))
    }

    fn get_connection_async(
        &self,
        on_ready: Option<ConnectionCallback>,
    ) -> Promise<BoxedConnection> {
        let connection: BoxedConnection = InternalConnection::new(Arc::clone(&self.handler));
        if let Some(on_ready) = on_ready {
            on_ready(Arc::clone(&connection));
        }
        Promise::succeeded(connection)
    }

    fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use crate::{Router, RoutingMode};

    #[derive(Default)]
    struct Capture(Mutex<Option<Context>>);

    impl RequestHandler for Capture {
        fn handle_read(&self, context: Context, request: Arc<ReadRequest>) -> Promise<Resource> {
            *self.0.lock() = Some(context);
            Promise::succeeded(Resource::with_id(
                request.resource_path.to_string(),
                Value::Null,
            ))
        }
    }

    impl Capture {
        fn context(&self) -> Context {
            self.0.lock().clone().unwrap()
        }
    }

    #[test]
    fn test_pushes_internal_server_context() {
        let capture = Arc::new(Capture::default());
        let connection = internal_connection(Arc::clone(&capture));

        let root = Context::root();
        let read = connection.read(root.clone(), ReadRequest::new("a"));
        assert!(read.try_result().unwrap().is_ok());

        let seen = capture.context();
        assert!(seen.is_server());
        assert!(seen.is_internal());
        assert!(seen.parent().unwrap().ptr_eq(&root));

        let server = seen.as_server().unwrap();
        let own = server.connection().unwrap();
        assert!(own.is_valid());
        assert!(!own.is_closed());
    }

    #[test]
    fn test_keeps_existing_server_context() {
        let capture = Arc::new(Capture::default());
        let connection = internal_connection(Arc::clone(&capture));

        let external = Context::root().server(None);
        connection.read(external.clone(), ReadRequest::new("a"));
        assert!(capture.context().ptr_eq(&external));
    }

    #[test]
    fn test_reuses_connection_of_outer_server_node() {
        let capture = Arc::new(Capture::default());
        let outer = internal_connection(Arc::clone(&capture));
        let inner = internal_connection(Arc::clone(&capture));

        let context = Context::root()
            .server(Some(Arc::clone(&outer)))
            .with_attribute("k", Value::Bool(true));
        inner.read(context, ReadRequest::new("a"));

        let seen = capture.context();
        let forwarded = seen.as_server().unwrap().connection().unwrap();
        assert!(Arc::ptr_eq(forwarded, &outer));
    }

    #[test]
    fn test_factory_through_router() {
        let capture = Arc::new(Capture::default());
        let router = Router::new();
        router
            .add_route_template(RoutingMode::StartsWith, "things", Arc::clone(&capture))
            .unwrap();
        let factory = internal_connection_factory(router);

        let ready = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ready);
        let connection = factory
            .get_connection_async(Some(Box::new(move |_| flag.store(true, Ordering::SeqCst))))
            .try_result()
            .unwrap()
            .unwrap();
        assert!(ready.load(Ordering::SeqCst));

        let read = connection.read(Context::root(), ReadRequest::new("things/7"));
        assert_eq!(read.try_result().unwrap().unwrap().id.as_deref(), Some("7"));
        assert!(capture.context().is_internal());

        assert!(factory.get_connection().is_ok());
    }

    #[tokio::test]
    async fn test_awaiting_results() {
        let connection = internal_connection(Capture::default());
        let resource = connection
            .read(Context::root(), ReadRequest::new("x"))
            .await
            .unwrap();
        assert_eq!(resource.id.as_deref(), Some("x"));
    }
}
