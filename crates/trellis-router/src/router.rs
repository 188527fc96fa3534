//! The request router.
//!
//! A [`Router`] holds a table of routes, each pairing a [`RouteMatcher`] with
//! a [`RequestHandler`]. For every request it evaluates all matchers, picks the
//! best match, records the decision in the context chain and forwards the
//! request to the selected handler. Prefix routes rewrite the path to the
//! unmatched remainder; exact routes forward the request untouched.
//!
//! Routers are themselves handlers, so they nest:
//!
//! ```rust,ignore
//! let devices = Router::new();
//! devices.add_collection("", device_provider)?;
//!
//! let root = Router::new();
//! root.add_route_template(RoutingMode::StartsWith, "users/{userId}/devices", devices)?;
//! ```
//!
//! # Concurrency
//!
//! The route table is copy-on-write. Each dispatch works on one snapshot of
//! the table, so routes may be added or removed while requests are in flight.
//! A request observes either the table before or after a concurrent change.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, debug_span, trace, warn};

use trellis_core::{
    ActionRequest, BoxedQueryHandler, BoxedRequestHandler, CollectionResourceProvider, Context,
    CreateRequest, DeleteRequest, PatchRequest, Promise, QueryRequest, QueryResult, ReadRequest,
    Request, RequestHandler, Resource, ResourceError, ResourceResult, SingletonResourceProvider,
    UpdateRequest,
};

use crate::matcher::{RouteMatch, RouteMatcher, RoutingMode, UriRouteMatcher};
use crate::resources::{new_collection, new_singleton};
use crate::template::TemplateError;

/// Identifies a route within the router that registered it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteId(u64);

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone)]
struct Route {
    id: RouteId,
    matcher: Arc<dyn RouteMatcher>,
    handler: BoxedRequestHandler,
}

/// The routes of a router.
///
/// Implements `Clone` to support `Arc::make_mut` for copy-on-write updates.
#[derive(Clone, Default)]
struct RouteTable {
    routes: Vec<Route>,
    default_route: Option<BoxedRequestHandler>,
}

/// The outcome of route selection.
struct Selection<R> {
    handler: BoxedRequestHandler,
    context: Context,
    request: Arc<R>,
}

/// Dispatches requests to the handler of the best matching route.
pub struct Router {
    table: RwLock<Arc<RouteTable>>,
    next_id: AtomicU64,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    /// Creates a router with no routes.
    pub fn new() -> Self {
        Self {
            table: RwLock::new(Arc::new(RouteTable::default())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Creates a router holding the same routes as `other`.
    ///
    /// The two tables are independent afterwards. Route ids issued by `other`
    /// remain valid for the copy.
    pub fn copy_of(other: &Router) -> Self {
        Self {
            table: RwLock::new(other.snapshot()),
            next_id: AtomicU64::new(other.next_id.load(Ordering::Relaxed)),
        }
    }

    fn snapshot(&self) -> Arc<RouteTable> {
        Arc::clone(&self.table.read())
    }

    fn update<T>(&self, f: impl FnOnce(&mut RouteTable) -> T) -> T {
        let mut table = self.table.write();
        f(Arc::make_mut(&mut *table))
    }

    // ========================================================================
    // Route management
    // ========================================================================

    /// Adds a route and returns its id.
    pub fn add_route<M, H>(&self, matcher: M, handler: H) -> RouteId
    where
        M: RouteMatcher + 'static,
        H: RequestHandler + 'static,
    {
        self.add_route_boxed(Arc::new(matcher), Arc::new(handler))
    }

    /// Adds a route from already shared parts.
    pub fn add_route_boxed(
        &self,
        matcher: Arc<dyn RouteMatcher>,
        handler: BoxedRequestHandler,
    ) -> RouteId {
        let id = RouteId(self.next_id.fetch_add(1, Ordering::Relaxed));
        debug!(route = %id, matcher = ?matcher, "Adding route");
        self.update(|table| {
            table.routes.push(Route {
                id,
                matcher,
                handler,
            })
        });
        id
    }

    /// Adds a route matching the URI template `template`.
    pub fn add_route_template<H>(
        &self,
        mode: RoutingMode,
        template: &str,
        handler: H,
    ) -> Result<RouteId, TemplateError>
    where
        H: RequestHandler + 'static,
    {
        Ok(self.add_route(UriRouteMatcher::new(mode, template)?, handler))
    }

    /// Mounts a collection provider under `template`.
    ///
    /// The route uses [`RoutingMode::StartsWith`] so that both the collection
    /// and its instances are reached through it.
    pub fn add_collection<P>(
        &self,
        template: &str,
        provider: Arc<P>,
    ) -> Result<RouteId, TemplateError>
    where
        P: CollectionResourceProvider + ?Sized + 'static,
    {
        self.add_route_template(RoutingMode::StartsWith, template, new_collection(provider))
    }

    /// Mounts a singleton provider at exactly `template`.
    pub fn add_singleton<P>(
        &self,
        template: &str,
        provider: Arc<P>,
    ) -> Result<RouteId, TemplateError>
    where
        P: SingletonResourceProvider + ?Sized + 'static,
    {
        self.add_route_template(RoutingMode::Equals, template, new_singleton(provider))
    }

    /// Copies every route of `other` into this router, returning the new ids.
    pub fn add_all_routes(&self, other: &Router) -> Vec<RouteId> {
        other
            .snapshot()
            .routes
            .iter()
            .map(|route| {
                self.add_route_boxed(Arc::clone(&route.matcher), Arc::clone(&route.handler))
            })
            .collect()
    }

    /// Removes a route. Returns `false` if no route has that id.
    pub fn remove_route(&self, id: RouteId) -> bool {
        let removed = self.update(|table| {
            let before = table.routes.len();
            table.routes.retain(|route| route.id != id);
            table.routes.len() != before
        });
        if removed {
            debug!(route = %id, "Removed route");
        }
        removed
    }

    /// Removes every route. The default route is kept.
    pub fn remove_all_routes(&self) {
        self.update(|table| table.routes.clear());
        debug!("Removed all routes");
    }

    /// Sets the handler used when no route matches.
    pub fn set_default_route<H>(&self, handler: H)
    where
        H: RequestHandler + 'static,
    {
        let handler: BoxedRequestHandler = Arc::new(handler);
        self.update(|table| table.default_route = Some(handler));
    }

    /// Removes the default route, returning it if one was set.
    pub fn clear_default_route(&self) -> Option<BoxedRequestHandler> {
        self.update(|table| table.default_route.take())
    }

    /// Returns `true` if a default route is set.
    pub fn has_default_route(&self) -> bool {
        self.snapshot().default_route.is_some()
    }

    /// The number of routes, not counting the default route.
    pub fn route_count(&self) -> usize {
        self.snapshot().routes.len()
    }

    /// The ids of the registered routes in registration order.
    pub fn route_ids(&self) -> Vec<RouteId> {
        self.snapshot().routes.iter().map(|route| route.id).collect()
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Picks the route for `request` from one snapshot of the table.
    fn select<R>(&self, context: &Context, request: Arc<R>) -> ResourceResult<Selection<R>>
    where
        R: Request + Clone,
    {
        let table = self.snapshot();
        let mut best: Option<(&Route, Box<dyn RouteMatch>)> = None;

        for route in &table.routes {
            let Some(candidate) = route.matcher.evaluate(context, &*request) else {
                trace!(route = %route.id, "Route did not match");
                continue;
            };

            let better = match &best {
                None => true,
                Some((_, current)) => candidate.is_better_than(current.as_ref()).map_err(|e| {
                    warn!(error = %e, "Ambiguous routes for request");
                    ResourceError::internal(e.to_string())
                })?,
            };
            if better {
                best = Some((route, candidate));
            }
        }

        let Some((route, best)) = best else {
            return match &table.default_route {
                Some(handler) => {
                    debug!("No route matched, using the default route");
                    Ok(Selection {
                        handler: Arc::clone(handler),
                        context: context.clone(),
                        request,
                    })
                }
                None => Err(ResourceError::resource_not_found(request.resource_path())),
            };
        };

        let request = match best.remaining_path() {
            Some(remaining) if remaining != request.resource_path() => {
                Arc::new(request.copy_with_path(remaining.clone()))
            }
            _ => request,
        };
        debug!(
            route = %route.id,
            remaining = %request.resource_path(),
            "Selected route"
        );

        Ok(Selection {
            handler: Arc::clone(&route.handler),
            context: best.decorate_context(context),
            request,
        })
    }

    fn dispatch<R, T, F>(&self, context: Context, request: Arc<R>, invoke: F) -> Promise<T>
    where
        R: Request + Clone,
        T: Send + Sync + 'static,
        F: FnOnce(&BoxedRequestHandler, Context, Arc<R>) -> Promise<T>,
    {
        let span = debug_span!(
            "route",
            request = %request.request_type(),
            path = %request.resource_path()
        );
        let _enter = span.enter();

        match self.select(&context, request) {
            Ok(selection) => invoke(&selection.handler, selection.context, selection.request),
            Err(error) => {
                debug!(error = %error, "Routing failed");
                Promise::failed(error)
            }
        }
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.snapshot();
        f.debug_struct("Router")
            .field("routes", &table.routes.len())
            .field("default_route", &table.default_route.is_some())
            .finish()
    }
}

impl RequestHandler for Router {
    fn handle_action(&self, context: Context, request: Arc<ActionRequest>) -> Promise<Value> {
        self.dispatch(context, request, |h, c, r| h.handle_action(c, r))
    }

    fn handle_create(&self, context: Context, request: Arc<CreateRequest>) -> Promise<Resource> {
        self.dispatch(context, request, |h, c, r| h.handle_create(c, r))
    }

    fn handle_delete(&self, context: Context, request: Arc<DeleteRequest>) -> Promise<Resource> {
        self.dispatch(context, request, |h, c, r| h.handle_delete(c, r))
    }

    fn handle_patch(&self, context: Context, request: Arc<PatchRequest>) -> Promise<Resource> {
        self.dispatch(context, request, |h, c, r| h.handle_patch(c, r))
    }

    fn handle_query(
        &self,
        context: Context,
        request: Arc<QueryRequest>,
        handler: BoxedQueryHandler,
    ) -> Promise<QueryResult> {
        self.dispatch(context, request, move |h, c, r| h.handle_query(c, r, handler))
    }

    fn handle_read(&self, context: Context, request: Arc<ReadRequest>) -> Promise<Resource> {
        self.dispatch(context, request, |h, c, r| h.handle_read(c, r))
    }

    fn handle_update(&self, context: Context, request: Arc<UpdateRequest>) -> Promise<Resource> {
        self.dispatch(context, request, |h, c, r| h.handle_update(c, r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::thread;
    use trellis_core::ErrorKind;

    /// Records what it was asked to read and answers with its own name.
    struct Recorder {
        name: &'static str,
        seen: Mutex<Vec<(Context, Arc<ReadRequest>)>>,
    }

    impl Recorder {
        fn named(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                seen: Mutex::new(Vec::new()),
            })
        }

        fn last(&self) -> (Context, Arc<ReadRequest>) {
            self.seen.lock().last().cloned().unwrap()
        }
    }

    impl RequestHandler for Recorder {
        fn handle_read(&self, context: Context, request: Arc<ReadRequest>) -> Promise<Resource> {
            self.seen.lock().push((context, Arc::clone(&request)));
            Promise::succeeded(Resource::with_id(self.name, Value::Null))
        }
    }

    /// A matcher whose matches cannot be ranked against URI matches.
    #[derive(Debug)]
    struct Everything;

    #[derive(Debug)]
    struct EverythingMatch;

    impl RouteMatcher for Everything {
        fn evaluate(&self, _: &Context, _: &dyn Request) -> Option<Box<dyn RouteMatch>> {
            Some(Box::new(EverythingMatch))
        }
    }

    impl RouteMatch for EverythingMatch {
        fn is_better_than(&self, other: &dyn RouteMatch) -> Result<bool, crate::IncomparableRouteMatch> {
            Err(crate::IncomparableRouteMatch::new(self, other))
        }

        fn decorate_context(&self, context: &Context) -> Context {
            context.clone()
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }

    fn read(router: &Router, path: &str) -> ResourceResult<Resource> {
        router
            .handle_read(Context::root(), Arc::new(ReadRequest::new(path)))
            .try_result()
            .unwrap()
    }

    #[test]
    fn test_no_route_is_not_found_with_path() {
        let router = Router::new();
        let err = read(&router, "users/42").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.unmatched_path().map(|p| p.to_string()).as_deref(), Some("users/42"));
    }

    #[test]
    fn test_exact_beats_prefix() {
        let router = Router::new();
        let prefix = Recorder::named("prefix");
        let exact = Recorder::named("exact");
        router.add_route_template(RoutingMode::StartsWith, "users", Arc::clone(&prefix)).unwrap();
        router.add_route_template(RoutingMode::Equals, "users", Arc::clone(&exact)).unwrap();

        assert_eq!(read(&router, "users").unwrap().id.as_deref(), Some("exact"));
        assert_eq!(read(&router, "users/42").unwrap().id.as_deref(), Some("prefix"));
    }

    #[test]
    fn test_prefix_route_rewrites_path() {
        let router = Router::new();
        let users = Recorder::named("users");
        router.add_route_template(RoutingMode::StartsWith, "users", Arc::clone(&users)).unwrap();

        read(&router, "users/42").unwrap();
        let (context, request) = users.last();
        assert_eq!(request.resource_path.to_string(), "42");

        let routed = context.as_router().unwrap();
        assert_eq!(routed.matched_path().to_string(), "users");
        assert_eq!(routed.remaining_path().to_string(), "42");
    }

    #[test]
    fn test_unchanged_path_forwards_same_request() {
        let router = Router::new();
        let root = Recorder::named("root");
        router.add_route_template(RoutingMode::StartsWith, "", Arc::clone(&root)).unwrap();

        let request = Arc::new(ReadRequest::new("users"));
        router.handle_read(Context::root(), Arc::clone(&request));
        assert!(Arc::ptr_eq(&root.last().1, &request));
    }

    #[test]
    fn test_exact_route_forwards_same_request() {
        let router = Router::new();
        let users = Recorder::named("users");
        router.add_route_template(RoutingMode::Equals, "users", Arc::clone(&users)).unwrap();

        let request = Arc::new(ReadRequest::new("users"));
        router.handle_read(Context::root(), Arc::clone(&request));

        let (context, forwarded) = users.last();
        assert!(Arc::ptr_eq(&forwarded, &request));
        assert_eq!(forwarded.resource_path.to_string(), "users");

        let routed = context.as_router().unwrap();
        assert_eq!(routed.matched_path().to_string(), "users");
        assert!(routed.remaining_path().is_empty());
    }

    #[test]
    fn test_incomparable_matches_are_internal_errors() {
        let router = Router::new();
        router.add_route_template(RoutingMode::Equals, "users", Recorder::named("a")).unwrap();
        router.add_route(Everything, Recorder::named("b"));

        let err = read(&router, "users").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_first_registered_route_wins_ties() {
        let router = Router::new();
        router.add_route_template(RoutingMode::Equals, "{a}", Recorder::named("first")).unwrap();
        router.add_route_template(RoutingMode::Equals, "{b}", Recorder::named("second")).unwrap();

        assert_eq!(read(&router, "x").unwrap().id.as_deref(), Some("first"));
    }

    #[test]
    fn test_default_route() {
        let router = Router::new();
        let fallback = Recorder::named("fallback");
        router.set_default_route(Arc::clone(&fallback));

        assert_eq!(read(&router, "anything").unwrap().id.as_deref(), Some("fallback"));
        assert_eq!(fallback.last().1.resource_path.to_string(), "anything");

        assert!(router.clear_default_route().is_some());
        assert!(read(&router, "anything").is_err());
    }

    #[test]
    fn test_route_management() {
        let router = Router::new();
        let a = router.add_route_template(RoutingMode::Equals, "a", Recorder::named("a")).unwrap();
        let b = router.add_route_template(RoutingMode::Equals, "b", Recorder::named("b")).unwrap();
        assert_eq!(router.route_ids(), vec![a, b]);

        let copy = Router::copy_of(&router);
        assert!(router.remove_route(a));
        assert!(!router.remove_route(a));
        assert_eq!(router.route_count(), 1);
        assert_eq!(copy.route_count(), 2);
        assert!(read(&copy, "a").is_ok());
        assert!(read(&router, "a").is_err());

        let merged = Router::new();
        assert_eq!(merged.add_all_routes(&copy).len(), 2);
        assert!(read(&merged, "b").is_ok());

        router.remove_all_routes();
        assert_eq!(router.route_count(), 0);
    }

    #[test]
    fn test_nested_routers_accumulate_variables() {
        let devices = Router::new();
        let device = Recorder::named("device");
        devices
            .add_route_template(RoutingMode::Equals, "{deviceId}", Arc::clone(&device))
            .unwrap();

        let root = Router::new();
        root.add_route_template(RoutingMode::StartsWith, "users/{userId}/devices", devices)
            .unwrap();

        read(&root, "users/alice/devices/phone").unwrap();
        let (context, request) = device.last();
        assert_eq!(request.resource_path.to_string(), "phone");
        assert_eq!(context.uri_template_variable("userId"), Some("alice"));
        assert_eq!(context.uri_template_variable("deviceId"), Some("phone"));
    }

    #[test]
    fn test_concurrent_route_changes_during_dispatch() {
        let router = Arc::new(Router::new());
        router
            .add_route_template(RoutingMode::Equals, "stable", Recorder::named("stable"))
            .unwrap();

        let writer = {
            let router = Arc::clone(&router);
            thread::spawn(move || {
                for _ in 0..200 {
                    let id = router
                        .add_route_template(RoutingMode::Equals, "flaky", Recorder::named("flaky"))
                        .unwrap();
                    router.remove_route(id);
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let router = Arc::clone(&router);
                thread::spawn(move || {
                    for _ in 0..200 {
                        assert!(read(&router, "stable").is_ok());
                        if let Err(err) = read(&router, "flaky") {
                            assert_eq!(err.kind(), ErrorKind::NotFound);
                        }
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(router.route_count(), 1);
    }
}
