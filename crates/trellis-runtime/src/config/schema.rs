//! Configuration schema definitions.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use trellis_router::RoutingMode;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrellisConfig {
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Routes mounted on the root router, in registration order.
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

/// Mounts a named handler on the root router.
///
/// ```toml
/// [[routes]]
/// template = "users"
/// mode = "starts-with"
/// handler = "users"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteConfig {
    /// URI template, e.g. `users/{userId}/devices`.
    pub template: String,

    /// How the template is matched.
    #[serde(default)]
    pub mode: RoutingMode,

    /// Name under which the handler was registered.
    pub handler: String,
}

impl RouteConfig {
    pub fn new(template: impl Into<String>, mode: RoutingMode, handler: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            mode,
            handler: handler.into(),
        }
    }
}

// =============================================================================
// Logging
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Global log level.
    pub level: LogLevel,

    /// Output format.
    pub format: LogFormat,

    /// Output destination.
    pub output: LogOutput,

    /// Log file, required when `output` is `file`.
    pub file_path: Option<PathBuf>,

    /// How often the log file is rotated.
    pub rotation: LogRotation,

    /// Number of rotated files to keep.
    pub max_files: usize,

    /// Include thread ids.
    pub thread_ids: bool,

    /// Include source file and line.
    pub file_location: bool,

    /// Which span lifecycle events to log.
    pub span_events: SpanEventConfig,

    /// Per-target levels, e.g. `trellis_router = "trace"`.
    pub filters: HashMap<String, LogLevel>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            output: LogOutput::Stdout,
            file_path: None,
            rotation: LogRotation::Never,
            max_files: 5,
            thread_ids: false,
            file_location: false,
            span_events: SpanEventConfig::default(),
            filters: HashMap::new(),
        }
    }
}

/// Log verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature.
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// Log file rotation period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Never,
    Minutely,
    Hourly,
    Daily,
}

/// Span lifecycle events to log.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpanEventConfig {
    pub new: bool,
    pub enter: bool,
    pub exit: bool,
    pub close: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_config_mode_defaults_to_equals() {
        let route: RouteConfig =
            serde_json::from_str(r#"{ "template": "status", "handler": "status" }"#).unwrap();
        assert_eq!(route.mode, RoutingMode::Equals);

        let route: RouteConfig = serde_json::from_str(
            r#"{ "template": "users", "mode": "starts-with", "handler": "users" }"#,
        )
        .unwrap();
        assert_eq!(route.mode, RoutingMode::StartsWith);
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!("WARNING".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert!("verbose".parse::<LogLevel>().is_err());
        assert!(serde_json::from_str::<LogLevel>(r#""verbose""#).is_err());
        assert_eq!(LogLevel::Debug.to_tracing_level(), tracing::Level::DEBUG);
    }

    #[test]
    fn test_logging_defaults() {
        let logging: LoggingConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(logging.level, LogLevel::Info);
        assert_eq!(logging.output, LogOutput::Stdout);
        assert_eq!(logging.max_files, 5);
    }
}
