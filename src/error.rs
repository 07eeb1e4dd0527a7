//! Error types for configuration, serving and per-request dispatch.
//!
//! Configuration and server errors are returned from setup APIs and signal
//! programmer error. A [`DispatchError`] aborts the chain of the request that
//! raised it; the HTTP adapter turns it into a `500` without affecting any
//! other request.

use std::io;

use thiserror::Error;

/// Setup-time misconfiguration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `url_for` was asked for a route name that was never registered.
    #[error("route not found: {0}")]
    RouteNotFound(String),
    /// The path template produced an invalid matcher.
    #[error("invalid route pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    /// The listen address could not be resolved to a socket address.
    #[error("invalid address `{0}`")]
    InvalidAddress(String),
}

/// Failures of the server lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to run server before listening")]
    NotListening,
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// A failure while resolving, invoking or interpreting a handler.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A handler argument type has no value in the request or server container.
    #[error("value not found for type {type_name}")]
    Unresolved { type_name: &'static str },
    /// The handler itself returned an error.
    #[error(transparent)]
    Handler(#[from] anyhow::Error),
    /// A handler return value could not be serialized to JSON.
    #[error("failed to serialize response body: {0}")]
    Serialize(#[from] serde_json::Error),
    /// The cursor pointed past both the chain and the terminal action.
    #[error("invalid index {index} for context handler (chain length {len})")]
    CursorOutOfRange { index: isize, len: usize },
    /// A handler returned a status code outside `100..=999`.
    #[error("invalid status code {0}")]
    InvalidStatus(i64),
}

impl DispatchError {
    pub(crate) fn unresolved<T>() -> Self {
        DispatchError::Unresolved {
            type_name: std::any::type_name::<T>(),
        }
    }
}
