//! Logging configuration and initialization.

use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::adapter::outbound::log_sink::{AppenderLogSink, ConsoleLogSink};
use crate::error::LoggingError;
use crate::port::DurableLogSink;

pub const LOG_FILE_NAME: &str = "fleetkeeper.log";

type FilteredRegistry = Layered<EnvFilter, Registry>;
type BoxedLayer = Box<dyn Layer<FilteredRegistry> + Send + Sync>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// `[logging]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    /// Directory of the durable log file, relative to the working directory.
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
}

fn default_level() -> String {
    "info".into()
}

fn default_directory() -> PathBuf {
    PathBuf::from("logs")
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            directory: default_directory(),
        }
    }
}

impl LoggingConfig {
    /// Install the global subscriber.
    ///
    /// Console output always goes to stderr. With `durable` set a
    /// non-blocking file writer is added and the returned sink owns its
    /// guard; otherwise the sink only flushes stderr.
    pub fn init(&self, durable: bool) -> Result<Arc<dyn DurableLogSink>, LoggingError> {
        let filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(&self.level)
                .map_err(|e| LoggingError::Filter(e.to_string()))?,
        };

        let mut layers: Vec<BoxedLayer> = vec![self.console_layer()];
        let sink: Arc<dyn DurableLogSink> = if durable {
            let appender = self.file_appender()?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            layers.push(
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(true)
                    .boxed(),
            );
            Arc::new(AppenderLogSink::new(guard))
        } else {
            Arc::new(ConsoleLogSink)
        };

        tracing_subscriber::registry()
            .with(filter)
            .with(layers)
            .try_init()
            .map_err(|e| LoggingError::Install(e.to_string()))?;
        Ok(sink)
    }

    fn console_layer(&self) -> BoxedLayer {
        match self.format {
            LogFormat::Json => fmt::layer().json().with_writer(io::stderr).boxed(),
            LogFormat::Pretty => fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(io::stderr().is_terminal())
                .boxed(),
        }
    }

    fn file_appender(&self) -> Result<RollingFileAppender, LoggingError> {
        std::fs::create_dir_all(&self.directory).map_err(|source| LoggingError::Directory {
            path: self.directory.clone(),
            source,
        })?;
        RollingFileAppender::builder()
            .rotation(Rotation::NEVER)
            .filename_prefix(LOG_FILE_NAME)
            .build(&self.directory)
            .map_err(|e| LoggingError::Install(e.to_string()))
    }
}
