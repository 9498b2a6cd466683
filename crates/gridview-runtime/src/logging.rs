#![forbid(unsafe_code)]

//! Optional subscriber bootstrap.
//!
//! The library only emits `tracing` events (targets under `gridview.*`).
//! Embedders with their own subscriber need nothing from here; standalone
//! hosts and demos can call [`init`] once at startup.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the filter directive.
pub const LOG_ENV: &str = "GRIDVIEW_LOG";

/// Filter used when [`LOG_ENV`] is unset or unparsable.
pub const DEFAULT_FILTER: &str = "info";

/// Install a global fmt subscriber filtered by `GRIDVIEW_LOG`.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init() -> bool {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
