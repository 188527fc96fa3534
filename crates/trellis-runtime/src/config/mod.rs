//! Configuration for the Trellis runtime.
//!
//! Configuration is loaded with figment from TOML/YAML files and `TRELLIS_*`
//! environment variables, then checked by [`validate_config`].

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile};
pub use schema::{
    LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, RouteConfig, SpanEventConfig,
    TrellisConfig,
};
pub use validation::validate_config;
