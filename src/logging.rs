//! Structured logging setup and the injectable [`Logger`].
//!
//! ## Environment Variables
//!
//! - `YAWF_LOG_LEVEL`: `trace`, `debug`, `info` (default), `warn` or `error`.
//!   `RUST_LOG`, when set, takes precedence.
//! - `YAWF_LOG_FORMAT`: `json` (default) or `pretty`.

use std::env;

use anyhow::{Context, Result};
use tracing::{Level, Span};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::ids::RequestId;
use crate::request::Request;

/// Log format: JSON for production, pretty-print for development
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level: trace/debug/info/warn/error
    pub log_level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

impl LogConfig {
    /// Parse configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            log_level: env::var("YAWF_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: LogFormat::parse(&env::var("YAWF_LOG_FORMAT").unwrap_or_default()),
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
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let mut env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level().as_str()));

    // Client disconnects are logged by the HTTP server at debug/info.
    if let Ok(directive) = "may_minihttp::http_server=warn".parse() {
        env_filter = env_filter.add_directive(directive);
    }

    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_span_list(true)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    tracing::info!(
        log_level = %config.log_level,
        log_format = ?config.format,
        "Logging initialized"
    );
    Ok(())
}

/// Application logger handed to handlers.
///
/// Events are emitted inside the logger's span, so the server-wide span (and
/// per request, the request's span) is attached to everything a handler logs.
#[derive(Debug, Clone)]
pub struct Logger {
    span: Span,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(tracing::info_span!("yawf"))
    }
}

impl Logger {
    #[must_use]
    pub fn new(span: Span) -> Self {
        Self { span }
    }

    #[must_use]
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Child logger scoped to one request.
    #[must_use]
    pub fn for_request(&self, req: &Request, id: RequestId) -> Self {
        Self::new(tracing::info_span!(
            parent: &self.span,
            "request",
            request_id = %id,
            method = %req.method(),
            path = %req.path(),
        ))
    }

    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        self.span.in_scope(f)
    }

    pub fn trace(&self, message: &str) {
        tracing::trace!(parent: &self.span, "{message}");
    }

    pub fn debug(&self, message: &str) {
        tracing::debug!(parent: &self.span, "{message}");
    }

    pub fn info(&self, message: &str) {
        tracing::info!(parent: &self.span, "{message}");
    }

    pub fn warn(&self, message: &str) {
        tracing::warn!(parent: &self.span, "{message}");
    }

    pub fn error(&self, message: &str) {
        tracing::error!(parent: &self.span, "{message}");
    }
}
