//! # Runtime Configuration Module
//!
//! Environment-variable configuration for the server process.
//!
//! ## Environment Variables
//!
//! ### `YAWF_HOST_ENV_NAME` / `YAWF_PORT_ENV_NAME`
//!
//! Host and port used when no address was set explicitly. The host defaults to
//! empty (all interfaces) and the port to `3000`, giving `:3000`.
//!
//! ### `YAWF_STACK_SIZE`
//!
//! Stack size for request coroutines. Accepts decimal (`32768`) or
//! hexadecimal (`0x8000`). Default: `0x8000` (32 KB).
//!
//! ### `YAWF_GRACEFUL_DELAY_MS`
//!
//! How long the last in-flight request waits after a stop before signalling
//! closure. Default: `3000`.
//!
//! ## Usage
//!
//! ```rust
//! use yawf::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! may::config().set_stack_size(config.stack_size);
//! ```

use std::env;
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use crate::error::ConfigError;

pub const HOST_ENV_NAME: &str = "YAWF_HOST_ENV_NAME";
pub const PORT_ENV_NAME: &str = "YAWF_PORT_ENV_NAME";
pub const DEFAULT_PORT: &str = "3000";
pub const DEFAULT_STACK_SIZE: usize = 0x8000;
pub const DEFAULT_GRACEFUL_DELAY: Duration = Duration::from_secs(3);

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Listen address in `host:port` form; the host may be empty.
    pub address: String,
    /// Stack size for coroutines in bytes
    pub stack_size: usize,
    pub graceful_delay: Duration,
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let stack_size = env::var("YAWF_STACK_SIZE")
            .ok()
            .and_then(|val| parse_size(&val))
            .unwrap_or(DEFAULT_STACK_SIZE);
        let graceful_delay = env::var("YAWF_GRACEFUL_DELAY_MS")
            .ok()
            .and_then(|val| val.trim().parse().ok())
            .map_or(DEFAULT_GRACEFUL_DELAY, Duration::from_millis);
        RuntimeConfig {
            address: env_address(),
            stack_size,
            graceful_delay,
        }
    }
}

/// Address from `YAWF_HOST_ENV_NAME` and `YAWF_PORT_ENV_NAME`.
#[must_use]
pub fn env_address() -> String {
    let port = env::var(PORT_ENV_NAME)
        .ok()
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| DEFAULT_PORT.to_string());
    let host = env::var(HOST_ENV_NAME).unwrap_or_default();
    format!("{host}:{port}")
}

/// Resolve a `host:port` address; an empty host binds every interface.
pub fn resolve_address(address: &str) -> Result<SocketAddr, ConfigError> {
    let invalid = || ConfigError::InvalidAddress(address.to_string());
    let target = if address.starts_with(':') {
        format!("0.0.0.0{address}")
    } else {
        address.to_string()
    };
    target
        .to_socket_addrs()
        .map_err(|_| invalid())?
        .next()
        .ok_or_else(invalid)
}

fn parse_size(val: &str) -> Option<usize> {
    let val = val.trim();
    match val.strip_prefix("0x") {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => val.parse().ok(),
    }
}
