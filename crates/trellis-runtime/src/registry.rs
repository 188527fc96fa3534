//! Named handlers that configuration can mount.
//!
//! Routes in a configuration file refer to handlers by name. Application code
//! registers those names before the runtime is assembled:
//!
//! ```rust,ignore
//! let registry = HandlerRegistry::new();
//! registry.register_collection("users", Arc::new(UserStore::default()));
//! registry.register_singleton("settings", Arc::new(Settings::default()));
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use trellis_core::{
    BoxedRequestHandler, CollectionResourceProvider, RequestHandler, SingletonResourceProvider,
};
use trellis_router::{new_collection, new_singleton};

/// Registry of request handlers by name.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, BoxedRequestHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `name`, returning the handler it replaced.
    pub fn register<H>(&self, name: impl Into<String>, handler: H) -> Option<BoxedRequestHandler>
    where
        H: RequestHandler + 'static,
    {
        self.register_boxed(name, Arc::new(handler))
    }

    /// Registers an already shared handler.
    pub fn register_boxed(
        &self,
        name: impl Into<String>,
        handler: BoxedRequestHandler,
    ) -> Option<BoxedRequestHandler> {
        let name = name.into();
        let previous = self.handlers.write().insert(name.clone(), handler);
        if previous.is_some() {
            warn!(handler = %name, "Replaced registered handler");
        } else {
            debug!(handler = %name, "Registered handler");
        }
        previous
    }

    /// Registers a collection provider, adapted with [`new_collection`].
    pub fn register_collection<P>(
        &self,
        name: impl Into<String>,
        provider: Arc<P>,
    ) -> Option<BoxedRequestHandler>
    where
        P: CollectionResourceProvider + ?Sized + 'static,
    {
        self.register(name, new_collection(provider))
    }

    /// Registers a singleton provider, adapted with [`new_singleton`].
    pub fn register_singleton<P>(
        &self,
        name: impl Into<String>,
        provider: Arc<P>,
    ) -> Option<BoxedRequestHandler>
    where
        P: SingletonResourceProvider + ?Sized + 'static,
    {
        self.register(name, new_singleton(provider))
    }

    pub fn unregister(&self, name: &str) -> Option<BoxedRequestHandler> {
        self.handlers.write().remove(name)
    }

    pub fn get(&self, name: &str) -> Option<BoxedRequestHandler> {
        self.handlers.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.read().contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.handlers.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_router::Router;

    #[test]
    fn test_register_and_lookup() {
        let registry = HandlerRegistry::new();
        assert!(registry.is_empty());

        assert!(registry.register("b", Router::new()).is_none());
        assert!(registry.register("a", Router::new()).is_none());
        assert!(registry.register("a", Router::new()).is_some());

        assert_eq!(registry.names(), ["a", "b"]);
        assert!(registry.contains("a"));
        assert!(registry.get("missing").is_none());

        assert!(registry.unregister("a").is_some());
        assert_eq!(registry.len(), 1);
    }
}
