//! Error types for configuration, startup and persistent cache plumbing.
//!
//! Load failures are not represented here: they travel as
//! [`ResponseError`](crate::response::ResponseError) values inside a
//! [`Response`](crate::response::Response).

use actor_runtime::RuntimeError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while setting up or operating the loader system.
#[derive(Debug, Error)]
pub enum Error {
    /// The configuration file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration could not be parsed.
    #[error("Failed to parse YAML config: {0}")]
    Parsing(#[from] serde_yaml::Error),

    /// A persistent cache file could not be read or written.
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Persistent cache metadata was malformed.
    #[error("Cache metadata error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The actor runtime failed to start.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
