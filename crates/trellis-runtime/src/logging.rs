//! Logging setup for Trellis.
//!
//! Installs a `tracing-subscriber` registry configured from [`LoggingConfig`].
//! The router emits a `route` span per dispatch, so span events show requests
//! travelling through nested routers.
//!
//! Most applications let [`Bootstrap`](crate::Bootstrap) call
//! [`init_from_config`]. Tests and tools that want router traces without a
//! config file can build a subscriber directly:
//!
//! ```rust,ignore
//! use trellis_runtime::logging::{LoggingBuilder, SpanEvents};
//!
//! LoggingBuilder::new()
//!     .directive("trellis_router=trace")
//!     .span_events(SpanEvents::LIFECYCLE)
//!     .try_init()?;
//! ```

use std::path::{Path, PathBuf};

use tracing::warn;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::config::{LogFormat, LogOutput, LogRotation, LoggingConfig, SpanEventConfig};
use crate::error::{RuntimeError, RuntimeResult};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpanEvents {
    pub new: bool,
    pub enter: bool,
    pub exit: bool,
    pub close: bool,
}

impl SpanEvents {
    pub const NONE: Self = Self {
        new: false,
        enter: false,
        exit: false,
        close: false,
    };

    /// Creation and close only; one line per routed request on each side.
    pub const LIFECYCLE: Self = Self {
        new: true,
        close: true,
        ..Self::NONE
    };

    pub const FULL: Self = Self {
        new: true,
        enter: true,
        exit: true,
        close: true,
    };

    fn to_fmt_span(self) -> FmtSpan {
        [
            (self.new, FmtSpan::NEW),
            (self.enter, FmtSpan::ENTER),
            (self.exit, FmtSpan::EXIT),
            (self.close, FmtSpan::CLOSE),
        ]
        .into_iter()
        .filter(|(on, _)| *on)
        .fold(FmtSpan::NONE, |acc, (_, span)| acc | span)
    }
}

impl From<&SpanEventConfig> for SpanEvents {
    fn from(config: &SpanEventConfig) -> Self {
        Self {
            new: config.new,
            enter: config.enter,
            exit: config.exit,
            close: config.close,
        }
    }
}

impl From<LogRotation> for Rotation {
    fn from(rotation: LogRotation) -> Self {
        match rotation {
            LogRotation::Never => Rotation::NEVER,
            LogRotation::Minutely => Rotation::MINUTELY,
            LogRotation::Hourly => Rotation::HOURLY,
            LogRotation::Daily => Rotation::DAILY,
        }
    }
}

/// Initializes logging from a [`LoggingConfig`].
///
/// Does nothing if a global subscriber is already installed.
pub fn init_from_config(config: &LoggingConfig) {
    let _ = LoggingBuilder::from_config(config).try_init();
}

/// A builder for the global subscriber.
///
/// Everything [`LoggingConfig`] can express is taken over by
/// [`from_config`](Self::from_config); the setters cover what callers
/// typically adjust in code.
#[derive(Debug)]
pub struct LoggingBuilder {
    level: tracing::Level,
    directives: Vec<String>,
    span_events: SpanEvents,
    format: LogFormat,
    output: LogOutput,
    thread_ids: bool,
    file_location: bool,
    file_path: Option<PathBuf>,
    rotation: LogRotation,
    max_files: usize,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingBuilder {
    pub fn new() -> Self {
        Self::from_config(&LoggingConfig::default())
    }

    pub fn from_config(config: &LoggingConfig) -> Self {
        let mut filters: Vec<_> = config.filters.iter().collect();
        filters.sort_by(|a, b| a.0.cmp(b.0));

        Self {
            level: config.level.to_tracing_level(),
            directives: filters
                .into_iter()
                .map(|(target, level)| format!("{target}={level}"))
                .collect(),
            span_events: SpanEvents::from(&config.span_events),
            format: config.format,
            output: config.output,
            thread_ids: config.thread_ids,
            file_location: config.file_location,
            file_path: config.file_path.clone(),
            rotation: config.rotation,
            max_files: config.max_files,
        }
    }

    /// Adds a filter directive such as `trellis_router=trace`.
    pub fn directive(mut self, directive: &str) -> Self {
        self.directives.push(directive.to_string());
        self
    }

    pub fn span_events(mut self, events: SpanEvents) -> Self {
        self.span_events = events;
        self
    }

    pub fn output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    pub fn file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    pub fn rotation(mut self, rotation: LogRotation) -> Self {
        self.rotation = rotation;
        self
    }

    /// `RUST_LOG` wins over the configured level; directives are added on top.
    fn build_filter(&self) -> EnvFilter {
        let base = self.level.to_string().to_lowercase();
        let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(base));

        for directive in &self.directives {
            match directive.parse() {
                Ok(d) => filter = filter.add_directive(d),
                Err(e) => warn!(directive = %directive, error = %e, "Ignoring invalid log directive"),
            }
        }

        filter
    }

    fn file_appender(&self, path: &Path) -> RuntimeResult<RollingFileAppender> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let prefix = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("trellis.log");

        RollingFileAppender::builder()
            .rotation(self.rotation.into())
            .max_log_files(self.max_files)
            .filename_prefix(prefix)
            .build(dir)
            .map_err(|e| RuntimeError::Logging(e.to_string()))
    }

    fn writer(&self) -> RuntimeResult<BoxMakeWriter> {
        Ok(match (self.output, &self.file_path) {
            (LogOutput::Stdout, _) | (LogOutput::File, None) => BoxMakeWriter::new(std::io::stdout),
            (LogOutput::Stderr, _) => BoxMakeWriter::new(std::io::stderr),
            (LogOutput::File, Some(path)) => BoxMakeWriter::new(self.file_appender(path)?),
        })
    }

    fn fmt_layer(&self, writer: BoxMakeWriter) -> BoxedLayer {
        let layer = fmt::layer()
            .with_writer(writer)
            .with_span_events(self.span_events.to_fmt_span())
            .with_thread_ids(self.thread_ids)
            .with_file(self.file_location)
            .with_line_number(self.file_location);

        match self.format {
            LogFormat::Compact => layer.compact().boxed(),
            LogFormat::Pretty => layer.pretty().boxed(),
            #[cfg(feature = "json-log")]
            LogFormat::Json => layer.json().boxed(),
            _ => layer.boxed(),
        }
    }

    /// Installs the subscriber as the global default.
    pub fn try_init(self) -> RuntimeResult<()> {
        let layer = self.fmt_layer(self.writer()?);
        tracing_subscriber::registry()
            .with(layer)
            .with(self.build_filter())
            .try_init()
            .map_err(|e| RuntimeError::Logging(e.to_string()))?;

        if cfg!(not(feature = "json-log")) && self.format == LogFormat::Json {
            warn!("JSON log format requires the json-log feature, using full format");
        }
        if self.output == LogOutput::File && self.file_path.is_none() {
            warn!("File output requested but no file path configured, falling back to stdout");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn test_from_config() {
        let mut config = LoggingConfig {
            level: LogLevel::Debug,
            thread_ids: true,
            file_location: true,
            ..Default::default()
        };
        config.span_events.close = true;
        config.filters.insert("trellis_router".into(), LogLevel::Trace);
        config.filters.insert("hyper".into(), LogLevel::Warn);

        let builder = LoggingBuilder::from_config(&config);
        assert_eq!(builder.level, tracing::Level::DEBUG);
        assert!(builder.thread_ids);
        assert!(builder.file_location);
        assert_eq!(
            builder.span_events,
            SpanEvents {
                close: true,
                ..SpanEvents::NONE
            }
        );
        assert_eq!(builder.directives, ["hyper=warn", "trellis_router=trace"]);
    }

    #[test]
    fn test_builder_setters_extend_config() {
        let builder = LoggingBuilder::new()
            .directive("trellis_router=trace")
            .span_events(SpanEvents::LIFECYCLE);

        assert_eq!(builder.level, tracing::Level::INFO);
        assert_eq!(builder.directives, ["trellis_router=trace"]);
        assert_eq!(
            builder.span_events.to_fmt_span(),
            FmtSpan::NEW | FmtSpan::CLOSE
        );
    }

    #[test]
    fn test_span_events_to_fmt_span() {
        assert_eq!(SpanEvents::NONE.to_fmt_span(), FmtSpan::NONE);
        assert_eq!(SpanEvents::FULL.to_fmt_span(), FmtSpan::FULL);
    }

    #[test]
    fn test_file_appender_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        let builder = LoggingBuilder::new()
            .output(LogOutput::File)
            .rotation(LogRotation::Daily)
            .file_path(dir.path().join("trellis.log"));

        let path = builder.file_path.clone().unwrap();
        assert!(builder.file_appender(&path).is_ok());
        assert!(builder.writer().is_ok());
    }
}
