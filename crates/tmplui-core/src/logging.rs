#![forbid(unsafe_code)]

//! JSON logging bootstrap for production deployments.
//!
//! Library code only emits `tracing` events; installing a subscriber is the
//! application's decision. This helper installs a JSON formatter filtered by
//! `RUST_LOG`, falling back to `default_filter` when the variable is unset or
//! invalid.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Install a global JSON subscriber.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_json(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().with_writer(std::io::stderr))
        .try_init()
        .is_ok()
}
