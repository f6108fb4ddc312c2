//! Tracing/logging setup.
//!
//! The session manager emits every state transition (open/record/close) at
//! `info` and validation rejections at `debug`. This module routes those
//! events to structured JSON on stdout; verbosity is controlled through
//! `RUST_LOG` and defaults to `info`.

use tracing_subscriber::EnvFilter;

/// Install the process-wide subscriber.
///
/// Idempotent: if a subscriber is already set, the call quietly does
/// nothing, so tests and embedding hosts can call it freely.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
