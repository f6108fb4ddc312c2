//! Tracing/logging setup shared by anything embedding the ledger engine.

pub mod tracing;

/// Wire up process-wide observability. Call once at startup; extra calls
/// are harmless.
pub fn init() {
    tracing::init();
}
