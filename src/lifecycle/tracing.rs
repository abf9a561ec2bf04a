//! # Observability & Tracing
//!
//! Structured logging for the loader system, built on the runtime's
//! subscriber setup. `RUST_LOG` always wins; otherwise the configured
//! `logging.level` applies.
//!
//! ```bash
//! # Request activation, queueing and retries
//! RUST_LOG=tile_loader=debug cargo run
//!
//! # Everything, including mailbox drops
//! RUST_LOG=trace cargo run
//! ```
//!
//! ## What Gets Logged
//!
//! | Level | Events |
//! |-------|--------|
//! | `info` | pool start/stop, network status changes, resources not found |
//! | `warn` | terminal load failures, cache I/O problems |
//! | `debug` | necessity changes, cache hits, request queueing/cancellation, retries |
//! | `trace` | cache misses, revalidation timers, dropped messages |
//!
//! Loader events carry the resource as a `url` field. URLs of failures are
//! logged without their query string so access tokens stay out of logs.

use crate::config::LoggingConfig;

/// Initializes the global subscriber. Safe to call more than once.
pub fn setup_tracing(config: &LoggingConfig) {
    actor_runtime::tracing::setup_tracing_with_default(&config.level);
}
