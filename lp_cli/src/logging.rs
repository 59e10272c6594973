//! Common CLI flags for logging
use std::io;

use tracing_subscriber::{
    EnvFilter, Layer, filter::ParseError, fmt, layer::SubscriberExt, util::SubscriberInitExt,
    util::TryInitError,
};

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error("invalid log filter '{filter}': {source}")]
    InvalidFilter {
        filter: String,
        #[source]
        source: ParseError,
    },

    #[error("cannot set global tracing subscriber: {0}")]
    SetGlobalDefault(#[from] TryInitError),
}

/// CLI config for the logging related subset of options.
///
/// Logs always go to stderr; stdout is reserved for line protocol.
#[derive(Debug, Clone, clap::Parser)]
pub(crate) struct LoggingConfig {
    /// Logs: filter directive
    ///
    /// Configures log severity level filter, by target.
    ///
    /// Simplest options: error, warn, info, debug, trace
    ///
    /// Levels for different modules can be specified. For example
    /// `debug,lp_writer=trace` specifies debug logging for all modules
    /// except for the `lp_writer` crate which logs at trace level.
    ///
    /// Overridden by `-v`.
    #[clap(long = "log-filter", env = "LOG_FILTER", global = true)]
    pub(crate) log_filter: Option<String>,

    /// Logs: filter short-hand
    ///
    /// Convenient way to set log severity level filter.
    /// Overrides `--log-filter`.
    ///
    /// -v   'info'
    ///
    /// -vv  'debug'
    ///
    /// -vvv 'trace'
    #[clap(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        global = true
    )]
    pub(crate) log_verbose_count: u8,

    /// Logs: message format
    #[clap(
        long = "log-format",
        env = "LOG_FORMAT",
        default_value = "full",
        value_enum,
        global = true
    )]
    pub(crate) log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum LogFormat {
    /// human-readable, single line
    Full,
    /// human-readable, multi line
    Pretty,
    /// machine-parseable
    Json,
}

impl LoggingConfig {
    pub(crate) const DEFAULT_LOG_FILTER: &'static str = "warn";

    /// The filter directive in effect: `-v` beats `--log-filter`, which beats the default.
    pub(crate) fn filter_directive(&self) -> String {
        match self.log_verbose_count {
            0 => self
                .log_filter
                .clone()
                .unwrap_or_else(|| Self::DEFAULT_LOG_FILTER.to_string()),
            1 => "info".to_string(),
            2 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    }

    pub(crate) fn install_global_subscriber(&self) -> Result<(), Error> {
        let filter = self.filter_directive();
        let env_filter = EnvFilter::try_new(&filter).map_err(|source| Error::InvalidFilter {
            filter: filter.clone(),
            source,
        })?;

        let layer = match self.log_format {
            LogFormat::Full => fmt::layer().with_writer(io::stderr).boxed(),
            LogFormat::Pretty => fmt::layer().pretty().with_writer(io::stderr).boxed(),
            LogFormat::Json => fmt::layer().json().with_writer(io::stderr).boxed(),
        };

        tracing_subscriber::registry()
            .with(layer.with_filter(env_filter))
            .try_init()?;
        Ok(())
    }
}
