//! Logging setup for hosts that want nativebridge diagnostics on stderr.
//!
//! Nothing is installed implicitly. A host calls [`init`] (or the C entry
//! point `nb_initialize_logging`) once; later calls are ignored because an
//! existing global subscriber always wins.

use tracing::Level;
use tracing_subscriber::filter::{Directive, ParseError};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Overrides [`LoggingConfig::filter`] when set.
pub const LOG_ENV_VAR: &str = "NATIVE_BRIDGE_LOG";

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Baseline level for every target.
    pub level: Level,
    /// Extra `EnvFilter` directives, e.g. `nativebridge::cache=trace`.
    pub filter: Option<String>,
    pub with_target: bool,
    pub with_thread_ids: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            filter: None,
            with_target: true,
            with_thread_ids: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Builds the filter: the environment variable, else the configured
    /// directives, on top of the baseline level.
    pub fn env_filter(&self) -> Result<EnvFilter, ParseError> {
        let directives = std::env::var(LOG_ENV_VAR)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .or_else(|| self.filter.clone());
        let filter = EnvFilter::default().add_directive(self.level.into());
        match directives {
            Some(directives) => directives
                .split(',')
                .map(str::trim)
                .filter(|directive| !directive.is_empty())
                .try_fold(filter, |filter, directive| {
                    Ok(filter.add_directive(directive.parse::<Directive>()?))
                }),
            None => Ok(filter),
        }
    }
}

/// Installs a global `fmt` subscriber.
///
/// Returns `Ok(false)` when another subscriber was already installed.
pub fn init(config: &LoggingConfig) -> Result<bool, ParseError> {
    let filter = config.env_filter()?;
    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(config.with_target)
                .with_thread_ids(config.with_thread_ids),
        )
        .try_init()
        .is_ok();
    Ok(installed)
}

/// Initialize logging with default settings (for tests and quick starts).
pub fn init_default() {
    let _ = init(&LoggingConfig::default());
}
