use std::path::PathBuf;

use thiserror::Error;

/// Problems with a single startup override value.
///
/// These never abort startup; the resolver reports them and moves on.
#[derive(Error, Debug)]
pub enum ArgumentError {
    #[error("empty value for {argument}")]
    EmptyValue { argument: &'static str },

    #[error("failed to change working directory to '{}': {source}", path.display())]
    WorkingDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Conditions that make this process refuse to start.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("another instance already holds the lock '{}'", lock.display())]
    DuplicateInstance { lock: PathBuf },

    #[error("unsupported environment: {reason}")]
    UnsupportedEnvironment { reason: String },

    #[error("config directory '{}' not found", path.display())]
    MissingConfigDirectory { path: PathBuf },
}

/// Errors raised while installing the tracing subscriber.
#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("invalid log filter: {0}")]
    Filter(String),

    #[error("failed to prepare log directory '{}': {source}", path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to install subscriber: {0}")]
    Install(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Argument(#[from] ArgumentError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Startup(#[from] StartupError),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("listener error: {0}")]
    Listener(String),

    #[error("worker '{name}' failed: {reason}")]
    Worker { name: String, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
