//! Trellis Runtime - assembles a resource tree from configuration.
//!
//! This crate provides:
//! - Layered configuration loading and validation (`config`)
//! - Logging setup over `tracing-subscriber` (`logging`)
//! - A registry of named handlers that routes can refer to (`HandlerRegistry`)
//! - Bootstrap of the root router and its connection factory (`Bootstrap`)
//!
//! ```ignore
//! use std::sync::Arc;
//! use trellis_runtime::Bootstrap;
//!
//! // trellis.toml
//! //
//! // [[routes]]
//! // template = "users"
//! // mode = "starts-with"
//! // handler = "users"
//!
//! let runtime = Bootstrap::new()
//!     .collection("users", Arc::new(UserStore::default()))
//!     .build()?;
//!
//! let connection = runtime.connection()?;
//! ```

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod logging;
pub mod registry;

pub use bootstrap::{Bootstrap, TrellisRuntime, build_router};
pub use config::{
    ConfigError, ConfigLoader, ConfigResult, LoggingConfig, RouteConfig, TrellisConfig,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use registry::HandlerRegistry;

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Logging macros for handler implementations.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
