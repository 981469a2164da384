//! Structured logging setup.
//!
//! Everything in the pipeline logs through `tracing` with key/value fields
//! (`request_id`, `method`, `path`, `handler`, `interceptor_idx`, ...). This
//! module installs the subscriber that formats those events.
//!
//! Output goes to stderr so the CLI's own output on stdout stays clean.
//!
//! ## Environment Variables
//!
//! - `BRRTD_LOG_LEVEL`: trace/debug/info/warn/error (default `info`); `RUST_LOG` wins when set
//! - `BRRTD_LOG_FORMAT`: `json` or `pretty` (default `json`)
//! - `BRRTD_LOG_ASYNC`: buffer output through a background writer thread
//! - `BRRTD_LOG_TARGETS`: extra comma-separated filter directives, e.g. `brrtdispatch::router=debug`
//! - `BRRTD_LOG_LOCATION`: include file:line in every event

use anyhow::{Context, Result};
use std::env;
use tracing::{Level, Subscriber};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Log format: JSON for production, pretty-print for development
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json, // Default to JSON
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level: trace/debug/info/warn/error
    pub log_level: String,
    /// Log format: json/pretty
    pub format: LogFormat,
    /// Enable async buffered logging
    pub async_logging: bool,
    /// Extra filter directives (comma-separated)
    pub target_filter: Option<String>,
    /// Include file:line location (dev only)
    pub include_location: bool,
}

impl LogConfig {
    /// Parse configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            log_level: env::var("BRRTD_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: LogFormat::parse(&env::var("BRRTD_LOG_FORMAT").unwrap_or_else(|_| "json".to_string())),
            async_logging: env::var("BRRTD_LOG_ASYNC").is_ok_and(|v| parse_flag(&v)),
            target_filter: env::var("BRRTD_LOG_TARGETS").ok(),
            include_location: env::var("BRRTD_LOG_LOCATION").is_ok_and(|v| parse_flag(&v)),
        }
    }

    /// Readable output with file locations, for local work.
    pub fn default_dev() -> Self {
        Self {
            log_level: "debug".to_string(),
            format: LogFormat::Pretty,
            async_logging: false,
            target_filter: None,
            include_location: true,
        }
    }

    fn level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        let mut env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.level().as_str()));
        if let Some(target_filter) = &self.target_filter {
            for filter in target_filter.split(',') {
                let filter = filter.trim();
                if filter.is_empty() {
                    continue;
                }
                match filter.parse() {
                    Ok(directive) => env_filter = env_filter.add_directive(directive),
                    Err(_) => eprintln!("Warning: Invalid log filter directive: {filter}"),
                }
            }
        }
        env_filter
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Formatting layer for `config.format`, writing through `writer`.
fn fmt_layer<S, W>(config: &LogConfig, writer: W) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'span> LookupSpan<'span> + 'static,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_writer(writer);
    match config.format {
        LogFormat::Json => layer.json().with_current_span(true).with_thread_ids(true).boxed(),
        LogFormat::Pretty => layer.pretty().boxed(),
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// Fails if a global subscriber is already installed, e.g. on a second call.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let registry = tracing_subscriber::registry().with(config.env_filter());

    if !config.async_logging {
        return registry
            .with(fmt_layer(config, std::io::stderr))
            .try_init()
            .context("Failed to initialize logging");
    }

    let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
    registry
        .with(fmt_layer(config, writer))
        .try_init()
        .context("Failed to initialize async logging")?;
    // Dropping the guard stops the writer thread; it has to outlive every event.
    std::mem::forget(guard);
    Ok(())
}
