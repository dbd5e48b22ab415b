//! # Runtime Configuration Module
//!
//! Environment-driven configuration for the gateway's runtime behavior.
//!
//! ## Environment Variables
//!
//! - `MEDIGATE_STACK_SIZE` - coroutine handler stack size, decimal or
//!   `0x`-prefixed hex (default `0x4000`, 16 KB)
//! - `MEDIGATE_ADDR` - server bind address (default `0.0.0.0:8080`)
//! - `MEDIGATE_INFERENCE_URL` - downstream inference base URL; when set the
//!   server forwards requests instead of mocking them
//! - `MEDIGATE_TIMEOUT_SECS` - bounded wait for downstream inference calls
//!   (default 10)
//!
//! ```rust
//! use medigate::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! println!("Stack size: {} bytes", config.stack_size);
//! ```

use std::env;
use std::time::Duration;

const DEFAULT_STACK_SIZE: usize = 0x4000;
const DEFAULT_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Runtime configuration loaded from environment variables.
///
/// Load this at startup using [`RuntimeConfig::from_env()`].
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Stack size for handler coroutines in bytes (default: 16 KB / 0x4000).
    pub stack_size: usize,
    /// Address the HTTP server binds to.
    pub addr: String,
    /// Downstream inference base URL; `None` selects the mock backend.
    pub inference_url: Option<String>,
    /// Bounded wait imposed on downstream inference calls.
    pub timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            stack_size: DEFAULT_STACK_SIZE,
            addr: DEFAULT_ADDR.to_string(),
            inference_url: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Parse a stack size value in decimal or `0x`-prefixed hex.
fn parse_stack_size(val: &str) -> Option<usize> {
    if let Some(hex) = val.strip_prefix("0x") {
        usize::from_str_radix(hex, 16).ok()
    } else {
        val.parse().ok()
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparseable.
    #[must_use]
    pub fn from_env() -> Self {
        let stack_size = env::var("MEDIGATE_STACK_SIZE")
            .ok()
            .and_then(|v| parse_stack_size(&v))
            .unwrap_or(DEFAULT_STACK_SIZE);
        let addr = env::var("MEDIGATE_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
        let inference_url = env::var("MEDIGATE_INFERENCE_URL")
            .ok()
            .filter(|s| !s.is_empty());
        let timeout = env::var("MEDIGATE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        RuntimeConfig {
            stack_size,
            addr,
            inference_url,
            timeout,
        }
    }
}
