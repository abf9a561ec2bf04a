//! # Observability & Tracing
//!
//! Structured logging for the runtime and everything built on it.
//!
//! The runtime itself logs sparingly: pool start/stop at `info`, actor close at
//! `debug`, dropped messages at `trace`. Set `RUST_LOG` to control verbosity:
//!
//! ```bash
//! RUST_LOG=info cargo run
//! RUST_LOG=actor_runtime=trace cargo run
//! ```

use tracing_subscriber::EnvFilter;

/// Initializes the global subscriber from `RUST_LOG`.
pub fn setup_tracing() {
    setup_tracing_with_default("info");
}

/// Initializes the global subscriber, using `default_directive` when
/// `RUST_LOG` is unset or invalid. Calling it twice is harmless.
pub fn setup_tracing_with_default(default_directive: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init();
}
