//! Assembles a resource tree from configuration.
//!
//! [`Bootstrap`] loads and validates a [`TrellisConfig`], installs logging,
//! mounts every configured route on a root [`Router`] and hands back a
//! [`TrellisRuntime`] from which in-process connections can be taken.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use trellis_runtime::Bootstrap;
//!
//! let runtime = Bootstrap::new()
//!     .config_file("trellis.toml")
//!     .collection("users", Arc::new(UserStore::default()))
//!     .build()?;
//!
//! let connection = runtime.connection()?;
//! ```

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use trellis_core::{
    BoxedConnection, BoxedRequestHandler, CollectionResourceProvider, ConnectionFactory,
    RequestHandler, SingletonResourceProvider,
};
use trellis_router::{InternalConnectionFactory, Router, UriRouteMatcher};

use crate::config::{ConfigLoader, TrellisConfig, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;
use crate::registry::HandlerRegistry;

/// Mounts the configured routes, in order, on a new router.
pub fn build_router(config: &TrellisConfig, registry: &HandlerRegistry) -> RuntimeResult<Router> {
    let router = Router::new();

    for route in &config.routes {
        let handler = registry
            .get(&route.handler)
            .ok_or_else(|| RuntimeError::HandlerNotFound(route.handler.clone()))?;
        let matcher = UriRouteMatcher::new(route.mode, &route.template)?;

        let id = router.add_route_boxed(Arc::new(matcher), handler);
        debug!(
            route = %id,
            template = %route.template,
            mode = %route.mode,
            handler = %route.handler,
            "Mounted route"
        );
    }

    Ok(router)
}

/// Builder for a [`TrellisRuntime`].
pub struct Bootstrap {
    loader: ConfigLoader,
    config: Option<TrellisConfig>,
    registry: Arc<HandlerRegistry>,
    init_logging: bool,
}

impl Default for Bootstrap {
    fn default() -> Self {
        Self::new()
    }
}

impl Bootstrap {
    pub fn new() -> Self {
        Self {
            loader: ConfigLoader::new(),
            config: None,
            registry: Arc::new(HandlerRegistry::new()),
            init_logging: true,
        }
    }

    /// Uses `loader` instead of the default loader.
    pub fn loader(mut self, loader: ConfigLoader) -> Self {
        self.loader = loader;
        self
    }

    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.loader = self.loader.file(path);
        self
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.loader = self.loader.profile(profile);
        self
    }

    /// Uses `config` as is; no files or environment variables are read.
    pub fn config(mut self, config: TrellisConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Shares an existing registry.
    pub fn registry(mut self, registry: Arc<HandlerRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn handler<H>(self, name: impl Into<String>, handler: H) -> Self
    where
        H: RequestHandler + 'static,
    {
        self.registry.register(name, handler);
        self
    }

    pub fn collection<P>(self, name: impl Into<String>, provider: Arc<P>) -> Self
    where
        P: CollectionResourceProvider + ?Sized + 'static,
    {
        self.registry.register_collection(name, provider);
        self
    }

    pub fn singleton<P>(self, name: impl Into<String>, provider: Arc<P>) -> Self
    where
        P: SingletonResourceProvider + ?Sized + 'static,
    {
        self.registry.register_singleton(name, provider);
        self
    }

    /// Leaves the global tracing subscriber alone.
    pub fn without_logging(mut self) -> Self {
        self.init_logging = false;
        self
    }

    pub fn build(self) -> RuntimeResult<TrellisRuntime> {
        let config = match self.config {
            Some(config) => config,
            None => self.loader.load()?,
        };
        validate_config(&config)?;

        if self.init_logging {
            logging::init_from_config(&config.logging);
        }

        let router = Arc::new(build_router(&config, &self.registry)?);
        let root: BoxedRequestHandler = Arc::clone(&router) as BoxedRequestHandler;
        let factory = InternalConnectionFactory::new(root);

        info!(
            routes = router.route_count(),
            handlers = self.registry.len(),
            log_level = %config.logging.level,
            "Trellis runtime ready"
        );

        Ok(TrellisRuntime {
            config,
            registry: self.registry,
            router,
            factory,
        })
    }
}

/// An assembled resource tree.
pub struct TrellisRuntime {
    config: TrellisConfig,
    registry: Arc<HandlerRegistry>,
    router: Arc<Router>,
    factory: InternalConnectionFactory,
}

impl TrellisRuntime {
    pub fn builder() -> Bootstrap {
        Bootstrap::new()
    }

    pub fn config(&self) -> &TrellisConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    /// The root router. Routes may still be added or removed at run time.
    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn connection_factory(&self) -> &InternalConnectionFactory {
        &self.factory
    }

    /// Opens an in-process connection onto the root router.
    pub fn connection(&self) -> RuntimeResult<BoxedConnection> {
        Ok(self.factory.get_connection()?)
    }
}
