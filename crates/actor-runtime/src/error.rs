//! # Runtime Errors
//!
//! Errors surfaced by the actor runtime itself. Message delivery to a dead
//! actor is *not* an error: it is a silent no-op. Only callers waiting on a
//! reply (`ActorRef::ask`) or driving a scheduler observe failures.

use std::thread::ThreadId;

/// Errors that can occur within the actor runtime.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("Actor dropped before replying")]
    ActorDropped,
    #[error("Run loop owned by {owner:?} was driven from {actual:?}")]
    WrongThread { owner: ThreadId, actual: ThreadId },
    #[error("Failed to start worker threads: {0}")]
    Spawn(#[from] std::io::Error),
}
