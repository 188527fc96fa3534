//! Adapters that expose resource providers as request handlers.
//!
//! [`new_collection`] turns a [`CollectionResourceProvider`] into a small
//! router with two routes:
//!
//! | path   | operations                                    |
//! |--------|-----------------------------------------------|
//! | `""`   | action, create, query                         |
//! | `{id}` | action, create (with id), delete, patch, read, update |
//!
//! Anything deeper than one segment has no route and is not found.
//!
//! [`new_singleton`] forwards action, patch, read and update to a
//! [`SingletonResourceProvider`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;
use tracing::trace;

use trellis_core::{
    ActionRequest, BoxedQueryHandler, CollectionResourceProvider, Context, CreateRequest,
    DeleteRequest, PatchRequest, Promise, QueryRequest, QueryResourceHandler, QueryResult,
    ReadRequest, Request, RequestHandler, Resource, ResourceError, ResourceResult,
    SingletonResourceProvider, UpdateRequest,
};

use crate::matcher::{RoutingMode, UriRouteMatcher};
use crate::router::Router;
use crate::template::UriTemplate;

/// Name of the template variable holding a collection member's id.
pub const ID_VARIABLE: &str = "id";

/// Builds a handler exposing `provider` as a collection.
pub fn new_collection<P>(provider: Arc<P>) -> Router
where
    P: CollectionResourceProvider + ?Sized + 'static,
{
    let router = Router::new();
    router.add_route(
        UriRouteMatcher::from_template(RoutingMode::Equals, UriTemplate::default()),
        CollectionHandler {
            provider: Arc::clone(&provider),
        },
    );
    router.add_route(
        UriRouteMatcher::from_template(RoutingMode::Equals, UriTemplate::variable(ID_VARIABLE)),
        InstanceHandler { provider },
    );
    router
}

/// Builds a handler exposing `provider` as a singleton.
pub fn new_singleton<P>(provider: Arc<P>) -> SingletonHandler<P>
where
    P: SingletonResourceProvider + ?Sized + 'static,
{
    SingletonHandler { provider }
}

fn not_allowed<T: Send + Sync + 'static>(request: &dyn Request, target: &str) -> Promise<T> {
    Promise::failed(ResourceError::bad_request(format!(
        "{} operations are not allowed on a resource {target}",
        request.request_type()
    )))
}

// ============================================================================
// Query guard
// ============================================================================

/// Wraps a query handler so that nothing reaches it once it asked to stop or
/// once the query has finished.
pub struct QueryGuard {
    inner: BoxedQueryHandler,
    closed: AtomicBool,
}

impl QueryGuard {
    pub fn new(inner: BoxedQueryHandler) -> Arc<Self> {
        Arc::new(Self {
            inner,
            closed: AtomicBool::new(false),
        })
    }

    /// Stops delivery. Matches pushed afterwards are dropped.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Runs `query` with this guard as its handler and closes the guard when
    /// the returned promise completes.
    pub fn run<F>(self: Arc<Self>, query: F) -> Promise<QueryResult>
    where
        F: FnOnce(BoxedQueryHandler) -> Promise<QueryResult>,
    {
        let promise = query(Arc::clone(&self) as BoxedQueryHandler);
        promise.then_always(move || self.close());
        promise
    }
}

impl QueryResourceHandler for QueryGuard {
    fn handle_resource(&self, resource: Resource) -> bool {
        if self.is_closed() {
            trace!("Dropping query match delivered after the query stopped");
            return false;
        }
        let more = self.inner.handle_resource(resource);
        if !more {
            self.close();
        }
        more
    }
}

// ============================================================================
// Collection
// ============================================================================

struct CollectionHandler<P: ?Sized> {
    provider: Arc<P>,
}

impl<P> RequestHandler for CollectionHandler<P>
where
    P: CollectionResourceProvider + ?Sized,
{
    fn handle_action(&self, context: Context, request: Arc<ActionRequest>) -> Promise<Value> {
        self.provider.action_collection(context, request)
    }

    fn handle_create(&self, context: Context, request: Arc<CreateRequest>) -> Promise<Resource> {
        self.provider.create_instance(context, request)
    }

    fn handle_delete(&self, _context: Context, request: Arc<DeleteRequest>) -> Promise<Resource> {
        not_allowed(&*request, "collection")
    }

    fn handle_patch(&self, _context: Context, request: Arc<PatchRequest>) -> Promise<Resource> {
        not_allowed(&*request, "collection")
    }

    fn handle_query(
        &self,
        context: Context,
        request: Arc<QueryRequest>,
        handler: BoxedQueryHandler,
    ) -> Promise<QueryResult> {
        QueryGuard::new(handler).run(|guard| self.provider.query_collection(context, request, guard))
    }

    fn handle_read(&self, _context: Context, request: Arc<ReadRequest>) -> Promise<Resource> {
        not_allowed(&*request, "collection")
    }

    fn handle_update(&self, _context: Context, request: Arc<UpdateRequest>) -> Promise<Resource> {
        not_allowed(&*request, "collection")
    }
}

struct InstanceHandler<P: ?Sized> {
    provider: Arc<P>,
}

impl<P> InstanceHandler<P>
where
    P: CollectionResourceProvider + ?Sized,
{
    fn with_id<T, F>(&self, context: Context, f: F) -> Promise<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce(&P, Context, &str) -> Promise<T>,
    {
        let id: ResourceResult<String> = context
            .uri_template_variable(ID_VARIABLE)
            .map(str::to_string)
            .ok_or_else(|| ResourceError::internal("collection member id missing from context"));
        match id {
            Ok(id) => f(&*self.provider, context, &id),
            Err(error) => Promise::failed(error),
        }
    }
}

impl<P> RequestHandler for InstanceHandler<P>
where
    P: CollectionResourceProvider + ?Sized,
{
    fn handle_action(&self, context: Context, request: Arc<ActionRequest>) -> Promise<Value> {
        self.with_id(context, |p, c, id| p.action_instance(c, id, request))
    }

    fn handle_create(&self, context: Context, request: Arc<CreateRequest>) -> Promise<Resource> {
        self.with_id(context, |p, c, id| {
            let mut request = (*request).clone();
            request.new_resource_id = Some(id.to_string());
            p.create_instance(c, Arc::new(request))
        })
    }

    fn handle_delete(&self, context: Context, request: Arc<DeleteRequest>) -> Promise<Resource> {
        self.with_id(context, |p, c, id| p.delete_instance(c, id, request))
    }

    fn handle_patch(&self, context: Context, request: Arc<PatchRequest>) -> Promise<Resource> {
        self.with_id(context, |p, c, id| p.patch_instance(c, id, request))
    }

    fn handle_query(
        &self,
        _context: Context,
        request: Arc<QueryRequest>,
        _handler: BoxedQueryHandler,
    ) -> Promise<QueryResult> {
        not_allowed(&*request, "instance")
    }

    fn handle_read(&self, context: Context, request: Arc<ReadRequest>) -> Promise<Resource> {
        self.with_id(context, |p, c, id| p.read_instance(c, id, request))
    }

    fn handle_update(&self, context: Context, request: Arc<UpdateRequest>) -> Promise<Resource> {
        self.with_id(context, |p, c, id| p.update_instance(c, id, request))
    }
}

// ============================================================================
// Singleton
// ============================================================================

/// The handler returned by [`new_singleton`].
///
/// Create, delete and query are not supported on a singleton.
pub struct SingletonHandler<P: ?Sized> {
    provider: Arc<P>,
}

impl<P> RequestHandler for SingletonHandler<P>
where
    P: SingletonResourceProvider + ?Sized,
{
    fn handle_action(&self, context: Context, request: Arc<ActionRequest>) -> Promise<Value> {
        self.provider.action_instance(context, request)
    }

    fn handle_patch(&self, context: Context, request: Arc<PatchRequest>) -> Promise<Resource> {
        self.provider.patch_instance(context, request)
    }

    fn handle_read(&self, context: Context, request: Arc<ReadRequest>) -> Promise<Resource> {
        self.provider.read_instance(context, request)
    }

    fn handle_update(&self, context: Context, request: Arc<UpdateRequest>) -> Promise<Resource> {
        self.provider.update_instance(context, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;
    use trellis_core::ErrorKind;

    /// An in-memory collection of JSON documents.
    #[derive(Default)]
    struct Memory {
        items: Mutex<Vec<Resource>>,
        fail_query_after: Option<usize>,
    }

    impl Memory {
        fn with(ids: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                items: Mutex::new(ids.iter().map(|id| Resource::with_id(*id, json!({}))).collect()),
                fail_query_after: None,
            })
        }

        fn find(&self, id: &str) -> ResourceResult<Resource> {
            self.items
                .lock()
                .iter()
                .find(|r| r.id.as_deref() == Some(id))
                .cloned()
                .ok_or_else(|| ResourceError::not_found(format!("no item '{id}'")))
        }
    }

    impl CollectionResourceProvider for Memory {
        fn action_collection(&self, _: Context, request: Arc<ActionRequest>) -> Promise<Value> {
            Promise::succeeded(json!({ "action": request.action, "target": "collection" }))
        }

        fn action_instance(&self, _: Context, id: &str, request: Arc<ActionRequest>) -> Promise<Value> {
            Promise::succeeded(json!({ "action": request.action, "target": id }))
        }

        fn create_instance(&self, _: Context, request: Arc<CreateRequest>) -> Promise<Resource> {
            let id = request.new_resource_id.clone().unwrap_or_else(|| "generated".into());
            let resource = Resource::with_id(id, request.content.clone());
            self.items.lock().push(resource.clone());
            Promise::succeeded(resource)
        }

        fn delete_instance(&self, _: Context, id: &str, _: Arc<DeleteRequest>) -> Promise<Resource> {
            let found = self.find(id);
            self.items.lock().retain(|r| r.id.as_deref() != Some(id));
            Promise::completed(found)
        }

        fn patch_instance(&self, _: Context, id: &str, _: Arc<PatchRequest>) -> Promise<Resource> {
            Promise::completed(self.find(id))
        }

        fn query_collection(
            &self,
            _: Context,
            _: Arc<QueryRequest>,
            handler: BoxedQueryHandler,
        ) -> Promise<QueryResult> {
            let items = self.items.lock().clone();
            for (sent, item) in items.into_iter().enumerate() {
                if self.fail_query_after == Some(sent) {
                    return Promise::failed(ResourceError::internal("backend went away"));
                }
                if !handler.handle_resource(item) {
                    break;
                }
            }
            Promise::succeeded(QueryResult::complete())
        }

        fn read_instance(&self, _: Context, id: &str, _: Arc<ReadRequest>) -> Promise<Resource> {
            Promise::completed(self.find(id))
        }

        fn update_instance(&self, _: Context, id: &str, request: Arc<UpdateRequest>) -> Promise<Resource> {
            Promise::completed(self.find(id).map(|mut r| {
                r.content = request.content.clone();
                r
            }))
        }
    }

    fn mounted(provider: Arc<Memory>) -> Router {
        let router = Router::new();
        router.add_collection("users", provider).unwrap();
        router
    }

    fn collect(router: &Router, request: QueryRequest) -> (Vec<String>, ResourceResult<QueryResult>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler: BoxedQueryHandler = Arc::new(move |r: Resource| {
            sink.lock().push(r.id.unwrap_or_default());
            true
        });
        let result = router
            .handle_query(Context::root(), Arc::new(request), handler)
            .try_result()
            .unwrap();
        let ids = seen.lock().clone();
        (ids, result)
    }

    #[test]
    fn test_instance_operations() {
        let router = mounted(Memory::with(&["1", "2"]));
        let ctx = Context::root();

        let read = router.handle_read(ctx.clone(), Arc::new(ReadRequest::new("users/2")));
        assert_eq!(read.try_result().unwrap().unwrap().id.as_deref(), Some("2"));

        let update = router.handle_update(
            ctx.clone(),
            Arc::new(UpdateRequest::new("users/1", json!({ "name": "alice" }))),
        );
        assert_eq!(update.try_result().unwrap().unwrap().content["name"], "alice");

        let delete = router.handle_delete(ctx.clone(), Arc::new(DeleteRequest::new("users/1")));
        assert!(delete.try_result().unwrap().is_ok());

        let missing = router.handle_read(ctx.clone(), Arc::new(ReadRequest::new("users/1")));
        assert_eq!(missing.try_result().unwrap().unwrap_err().kind(), ErrorKind::NotFound);

        let action = router.handle_action(ctx, Arc::new(ActionRequest::new("users/2", "reset")));
        assert_eq!(action.try_result().unwrap().unwrap()["target"], "2");
    }

    #[test]
    fn test_create_on_collection_and_instance() {
        let provider = Memory::with(&[]);
        let router = mounted(Arc::clone(&provider));
        let ctx = Context::root();

        let generated = router.handle_create(ctx.clone(), Arc::new(CreateRequest::new("users", json!({}))));
        assert_eq!(generated.try_result().unwrap().unwrap().id.as_deref(), Some("generated"));

        let chosen = router.handle_create(ctx, Arc::new(CreateRequest::new("users/bob", json!({}))));
        assert_eq!(chosen.try_result().unwrap().unwrap().id.as_deref(), Some("bob"));
        assert_eq!(provider.items.lock().len(), 2);
    }

    #[test]
    fn test_operations_not_allowed_on_target() {
        let router = mounted(Memory::with(&["1"]));
        let ctx = Context::root();

        let read = router.handle_read(ctx.clone(), Arc::new(ReadRequest::new("users")));
        assert_eq!(read.try_result().unwrap().unwrap_err().kind(), ErrorKind::BadRequest);

        let (ids, result) = collect(&router, QueryRequest::new("users/1"));
        assert!(ids.is_empty());
        assert_eq!(result.unwrap_err().kind(), ErrorKind::BadRequest);

        let deep = router.handle_read(ctx, Arc::new(ReadRequest::new("users/1/devices")));
        assert_eq!(deep.try_result().unwrap().unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_query_streams_matches() {
        let router = mounted(Memory::with(&["1", "2", "3"]));
        let (ids, result) = collect(&router, QueryRequest::new("users"));
        assert_eq!(ids, ["1", "2", "3"]);
        assert!(result.unwrap().is_complete());
    }

    #[test]
    fn test_query_failure_after_partial_delivery() {
        let provider = Arc::new(Memory {
            items: Mutex::new(
                ["1", "2", "3", "4"]
                    .iter()
                    .map(|id| Resource::with_id(*id, json!({})))
                    .collect(),
            ),
            fail_query_after: Some(3),
        });
        let router = mounted(provider);

        let (ids, result) = collect(&router, QueryRequest::new("users"));
        assert_eq!(ids, ["1", "2", "3"]);
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_query_guard_drops_late_matches() {
        let seen = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&seen);
        let guard = QueryGuard::new(Arc::new(move |_: Resource| {
            *sink.lock() += 1;
            false
        }));

        assert!(!guard.handle_resource(Resource::new(None, None, json!({}))));
        assert!(!guard.handle_resource(Resource::new(None, None, json!({}))));
        assert_eq!(*seen.lock(), 1);

        let pending = Promise::new();
        let leaked: Arc<Mutex<Option<BoxedQueryHandler>>> = Arc::default();
        let slot = Arc::clone(&leaked);
        let counter = Arc::new(Mutex::new(0));
        let count = Arc::clone(&counter);
        let result = QueryGuard::new(Arc::new(move |_: Resource| {
            *count.lock() += 1;
            true
        }))
        .run(|handler| {
            *slot.lock() = Some(handler);
            pending.clone()
        });

        pending.succeed(QueryResult::complete());
        assert!(result.is_done());
        let late = leaked.lock().take().unwrap();
        assert!(!late.handle_resource(Resource::new(None, None, json!({}))));
        assert_eq!(*counter.lock(), 0);
    }

    struct Settings(Mutex<Value>);

    impl SingletonResourceProvider for Settings {
        fn action_instance(&self, _: Context, _: Arc<ActionRequest>) -> Promise<Value> {
            Promise::succeeded(Value::Null)
        }

        fn patch_instance(&self, _: Context, _: Arc<PatchRequest>) -> Promise<Resource> {
            Promise::succeeded(Resource::new(None, None, self.0.lock().clone()))
        }

        fn read_instance(&self, _: Context, _: Arc<ReadRequest>) -> Promise<Resource> {
            Promise::succeeded(Resource::new(None, None, self.0.lock().clone()))
        }

        fn update_instance(&self, _: Context, request: Arc<UpdateRequest>) -> Promise<Resource> {
            *self.0.lock() = request.content.clone();
            Promise::succeeded(Resource::new(None, None, request.content.clone()))
        }
    }

    #[test]
    fn test_singleton() {
        let router = Router::new();
        router
            .add_singleton("config", Arc::new(Settings(Mutex::new(json!({ "debug": false })))))
            .unwrap();
        let ctx = Context::root();

        let update = router.handle_update(
            ctx.clone(),
            Arc::new(UpdateRequest::new("config", json!({ "debug": true }))),
        );
        assert!(update.try_result().unwrap().is_ok());

        let read = router.handle_read(ctx.clone(), Arc::new(ReadRequest::new("config")));
        assert_eq!(read.try_result().unwrap().unwrap().content["debug"], true);

        let delete = router.handle_delete(ctx.clone(), Arc::new(DeleteRequest::new("config")));
        assert_eq!(delete.try_result().unwrap().unwrap_err().kind(), ErrorKind::NotSupported);

        let create = router.handle_create(ctx, Arc::new(CreateRequest::new("config", json!({}))));
        assert_eq!(create.try_result().unwrap().unwrap_err().kind(), ErrorKind::NotSupported);
    }
}
