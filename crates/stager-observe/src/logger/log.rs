use time::{UtcOffset, format_description::well_known::Rfc3339};
use tracing::Subscriber;
use tracing_subscriber::{
    EnvFilter, filter::LevelFilter, fmt, fmt::time::OffsetTime, layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::logger::{config::LoggerConfig, error::LoggerError};

/// Events go to stderr; stdout carries command output such as job specs and slice records.
pub struct Logger;

impl Logger {
    pub fn text(cfg: &LoggerConfig) -> Result<(), LoggerError> {
        let filter = mk_filter(&cfg.level)?;
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(cfg.use_color)
            .with_target(cfg.with_targets)
            .with_timer(mk_timer());

        let subscriber = tracing_subscriber::registry().with(filter).with(fmt_layer);
        init_with(subscriber)
    }

    pub fn json(cfg: &LoggerConfig) -> Result<(), LoggerError> {
        let filter = mk_filter(&cfg.level)?;
        let fmt_layer = fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .with_target(cfg.with_targets)
            .with_timer(mk_timer());

        let subscriber = tracing_subscriber::registry().with(filter).with(fmt_layer);
        init_with(subscriber)
    }

    pub fn journald(cfg: &LoggerConfig) -> Result<(), LoggerError> {
        let filter = mk_filter(&cfg.level)?;
        mk_journald(filter)
    }
}

/// Root of every event target emitted by the stager crates.
pub const STAGER_TARGET: &str = "stager";

/// Level applied to dependencies when only a bare level is configured.
const DEPENDENCY_LEVEL: &str = "warn";

/// Expand a bare level (`debug`) into `warn,stager=debug`; full directive lists pass through.
pub(crate) fn directives(level: &str) -> String {
    let level = level.trim();
    match level.parse::<LevelFilter>() {
        Ok(filter) if filter != LevelFilter::OFF => {
            format!("{DEPENDENCY_LEVEL},{STAGER_TARGET}={level}")
        }
        _ => level.to_string(),
    }
}

fn mk_filter(level: &str) -> Result<EnvFilter, LoggerError> {
    EnvFilter::try_new(directives(level))
        .map_err(|_| LoggerError::InvalidLogLevel(level.to_string()))
}

fn mk_timer() -> OffsetTime<Rfc3339> {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    OffsetTime::new(offset, Rfc3339)
}

fn as_error(e: impl std::fmt::Display) -> LoggerError {
    let s = e.to_string();
    if s.contains("SetGlobalDefaultError") || s.contains("global default trace dispatcher") {
        LoggerError::AlreadyInitialized
    } else {
        LoggerError::InitializationFailed(s)
    }
}

fn init_with<S>(subscriber: S) -> Result<(), LoggerError>
where
    S: Subscriber + Send + Sync + 'static,
{
    subscriber.try_init().map_err(as_error)
}

#[cfg(all(target_os = "linux", feature = "journald"))]
fn mk_journald(filter: EnvFilter) -> Result<(), LoggerError> {
    let journald = tracing_journald::layer()
        .map_err(|e| LoggerError::InitializationFailed(format!("journald: {e}")))?
        .with_syslog_identifier("stager".to_string());
    let subscriber = tracing_subscriber::registry().with(filter).with(journald);
    init_with(subscriber)
}

#[cfg(not(all(target_os = "linux", feature = "journald")))]
fn mk_journald(_filter: EnvFilter) -> Result<(), LoggerError> {
    Err(LoggerError::JournaldNotSupported)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_level_is_reported() {
        let err = mk_filter("stager=loud").unwrap_err();
        assert!(matches!(err, LoggerError::InvalidLogLevel(_)));
    }

    #[test]
    fn bare_level_is_scoped_to_stager_targets() {
        assert_eq!(directives("debug"), "warn,stager=debug");
        assert_eq!(directives(" INFO "), "warn,stager=INFO");
    }

    #[test]
    fn directive_lists_pass_through() {
        assert_eq!(directives("stager.core=trace,info"), "stager.core=trace,info");
        assert_eq!(directives("off"), "off");
        assert!(mk_filter("stager.exec=debug,warn").is_ok());
    }

    #[test]
    fn dispatcher_errors_map_to_already_initialized() {
        assert_eq!(
            as_error("a global default trace dispatcher has already been set"),
            LoggerError::AlreadyInitialized
        );
        assert!(matches!(as_error("other"), LoggerError::InitializationFailed(_)));
    }
}
