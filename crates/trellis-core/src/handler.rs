//! The handler contract and the resource provider contracts.
//!
//! [`RequestHandler`] is the one dispatch interface in Trellis. Routers,
//! provider adapters and connections all speak it, which is what lets routers
//! nest to any depth without special cases.
//!
//! Leaf implementors usually do not implement [`RequestHandler`] directly.
//! Instead they implement one of the two provider shapes and let the router
//! crate adapt it:
//!
//! - [`CollectionResourceProvider`] for a set of resources addressed by id
//! - [`SingletonResourceProvider`] for a single resource with no id

use std::sync::Arc;

use serde_json::Value;

use crate::context::Context;
use crate::error::ResourceError;
use crate::foundation::{QueryResult, Resource};
use crate::promise::Promise;
use crate::request::{
    ActionRequest, CreateRequest, DeleteRequest, PatchRequest, QueryRequest, ReadRequest,
    Request, UpdateRequest,
};

// ============================================================================
// Query result streaming
// ============================================================================

/// Receives the matches of a query, one at a time.
///
/// Matches are pushed before the query's terminal promise completes. Returning
/// `false` asks the producer to stop; the producer must still complete the
/// terminal promise. Matches already pushed are never retracted, even if the
/// query later fails.
pub trait QueryResourceHandler: Send + Sync {
    /// Handles one match. Returns `false` to request that no more are sent.
    fn handle_resource(&self, resource: Resource) -> bool;
}

impl<F> QueryResourceHandler for F
where
    F: Fn(Resource) -> bool + Send + Sync,
{
    fn handle_resource(&self, resource: Resource) -> bool {
        self(resource)
    }
}

/// A shared, type-erased query handler.
pub type BoxedQueryHandler = Arc<dyn QueryResourceHandler>;

// ============================================================================
// RequestHandler
// ============================================================================

fn unsupported<T: Send + Sync + 'static>(request: &dyn Request) -> Promise<T> {
    Promise::failed(ResourceError::not_supported(format!(
        "{} operations are not supported by '{}'",
        request.request_type(),
        request.resource_path()
    )))
}

/// Performs the seven operation kinds.
///
/// Every method returns without blocking; the outcome is delivered through the
/// returned [`Promise`]. Business failures resolve the promise with a
/// [`ResourceError`], they are never reported by panicking.
///
/// Operations a handler does not override fail with
/// [`ResourceError::NotSupported`].
pub trait RequestHandler: Send + Sync {
    fn handle_action(&self, context: Context, request: Arc<ActionRequest>) -> Promise<Value> {
        let _ = context;
        unsupported(&*request)
    }

    fn handle_create(&self, context: Context, request: Arc<CreateRequest>) -> Promise<Resource> {
        let _ = context;
        unsupported(&*request)
    }

    fn handle_delete(&self, context: Context, request: Arc<DeleteRequest>) -> Promise<Resource> {
        let _ = context;
        unsupported(&*request)
    }

    fn handle_patch(&self, context: Context, request: Arc<PatchRequest>) -> Promise<Resource> {
        let _ = context;
        unsupported(&*request)
    }

    fn handle_query(
        &self,
        context: Context,
        request: Arc<QueryRequest>,
        handler: BoxedQueryHandler,
    ) -> Promise<QueryResult> {
        let _ = (context, handler);
        unsupported(&*request)
    }

    fn handle_read(&self, context: Context, request: Arc<ReadRequest>) -> Promise<Resource> {
        let _ = context;
        unsupported(&*request)
    }

    fn handle_update(&self, context: Context, request: Arc<UpdateRequest>) -> Promise<Resource> {
        let _ = context;
        unsupported(&*request)
    }
}

/// A shared, type-erased request handler.
pub type BoxedRequestHandler = Arc<dyn RequestHandler>;

impl<H: RequestHandler + ?Sized> RequestHandler for Arc<H> {
    fn handle_action(&self, context: Context, request: Arc<ActionRequest>) -> Promise<Value> {
        (**self).handle_action(context, request)
    }

    fn handle_create(&self, context: Context, request: Arc<CreateRequest>) -> Promise<Resource> {
        (**self).handle_create(context, request)
    }

    fn handle_delete(&self, context: Context, request: Arc<DeleteRequest>) -> Promise<Resource> {
        (**self).handle_delete(context, request)
    }

    fn handle_patch(&self, context: Context, request: Arc<PatchRequest>) -> Promise<Resource> {
        (**self).handle_patch(context, request)
    }

    fn handle_query(
        &self,
        context: Context,
        request: Arc<QueryRequest>,
        handler: BoxedQueryHandler,
    ) -> Promise<QueryResult> {
        (**self).handle_query(context, request, handler)
    }

    fn handle_read(&self, context: Context, request: Arc<ReadRequest>) -> Promise<Resource> {
        (**self).handle_read(context, request)
    }

    fn handle_update(&self, context: Context, request: Arc<UpdateRequest>) -> Promise<Resource> {
        (**self).handle_update(context, request)
    }
}

// ============================================================================
// Provider contracts
// ============================================================================

/// A collection of resources addressed by id.
///
/// Collection-level operations receive the request addressed to the
/// collection itself; instance operations additionally receive the id that
/// was matched from the path.
pub trait CollectionResourceProvider: Send + Sync {
    /// Performs an action against the collection.
    fn action_collection(&self, context: Context, request: Arc<ActionRequest>) -> Promise<Value>;

    /// Performs an action against one instance.
    fn action_instance(
        &self,
        context: Context,
        id: &str,
        request: Arc<ActionRequest>,
    ) -> Promise<Value>;

    /// Creates a new instance. `request.new_resource_id` carries a client id
    /// when the caller chose one.
    fn create_instance(&self, context: Context, request: Arc<CreateRequest>) -> Promise<Resource>;

    /// Deletes an instance, honouring `request.revision` when present.
    fn delete_instance(
        &self,
        context: Context,
        id: &str,
        request: Arc<DeleteRequest>,
    ) -> Promise<Resource>;

    /// Patches an instance, honouring `request.revision` when present.
    fn patch_instance(
        &self,
        context: Context,
        id: &str,
        request: Arc<PatchRequest>,
    ) -> Promise<Resource>;

    /// Streams matching instances into `handler`, then completes with the
    /// paging state. Must stop producing once `handler` returns `false`.
    fn query_collection(
        &self,
        context: Context,
        request: Arc<QueryRequest>,
        handler: BoxedQueryHandler,
    ) -> Promise<QueryResult>;

    /// Reads an instance.
    fn read_instance(&self, context: Context, id: &str, request: Arc<ReadRequest>)
    -> Promise<Resource>;

    /// Replaces an instance, honouring `request.revision` when present.
    fn update_instance(
        &self,
        context: Context,
        id: &str,
        request: Arc<UpdateRequest>,
    ) -> Promise<Resource>;
}

/// A single resource with no id.
pub trait SingletonResourceProvider: Send + Sync {
    fn action_instance(&self, context: Context, request: Arc<ActionRequest>) -> Promise<Value>;

    fn patch_instance(&self, context: Context, request: Arc<PatchRequest>) -> Promise<Resource>;

    fn read_instance(&self, context: Context, request: Arc<ReadRequest>) -> Promise<Resource>;

    fn update_instance(&self, context: Context, request: Arc<UpdateRequest>) -> Promise<Resource>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct ReadOnly;

    impl RequestHandler for ReadOnly {
        fn handle_read(&self, _context: Context, request: Arc<ReadRequest>) -> Promise<Resource> {
            Promise::succeeded(Resource::with_id(
                request.resource_path.to_string(),
                Value::Null,
            ))
        }
    }

    #[test]
    fn test_unimplemented_operations_are_not_supported() {
        let handler: BoxedRequestHandler = Arc::new(ReadOnly);
        let ctx = Context::root();

        let read = handler.handle_read(ctx.clone(), Arc::new(ReadRequest::new("a")));
        assert_eq!(read.try_result().unwrap().unwrap().id.as_deref(), Some("a"));

        let delete = handler.handle_delete(ctx, Arc::new(DeleteRequest::new("a/b")));
        let err = delete.try_result().unwrap().unwrap_err();
        assert_eq!(err.code(), 501);
        assert_eq!(
            err.to_string(),
            "not supported: delete operations are not supported by 'a/b'"
        );
    }

    #[test]
    fn test_closures_are_query_handlers() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler: BoxedQueryHandler = Arc::new(move |r: Resource| {
            sink.lock().push(r.id.unwrap_or_default());
            true
        });

        assert!(handler.handle_resource(Resource::with_id("1", Value::Null)));
        assert_eq!(*seen.lock(), vec!["1".to_string()]);
    }
}
