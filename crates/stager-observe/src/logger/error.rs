use thiserror::Error;

use crate::logger::config::{LOG_FORMAT_ENV, LOG_LEVEL_ENV};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoggerError {
    #[error("invalid log format `{0}` in {env} (expected: text|json|journald)", env = LOG_FORMAT_ENV)]
    InvalidFormat(String),
    #[error("journald output needs Linux and the `journald` feature of stager-observe")]
    JournaldNotSupported,
    #[error("a global logger is already installed in this process")]
    AlreadyInitialized,
    #[error("failed to initialize logger: {0}")]
    InitializationFailed(String),
    #[error("invalid filter directive `{0}` in {env}", env = LOG_LEVEL_ENV)]
    InvalidLogLevel(String),
}
