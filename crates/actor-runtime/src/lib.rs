//! # Actor Runtime
//!
//! A lightweight message-passing runtime: ordering and lifetime guarantees for
//! stateful workers, without locks at the call site.
//!
//! ## Architecture Overview
//!
//! The runtime separates concerns into three layers:
//!
//! 1. **Queue Layer** ([`Mailbox`]) - an ordered, thread-safe message queue per actor
//! 2. **Execution Layer** ([`Scheduler`]) - decides *where* a mailbox is drained
//!    ([`ThreadPool`] for background work, [`RunLoop`] for thread-affine actors)
//! 3. **Interface Layer** ([`Actor`], [`ActorRef`]) - owns the worker object and
//!    hands out weak, copyable handles for messaging it
//!
//! ## Guarantees
//!
//! - Messages to one actor execute strictly in push order, never concurrently.
//! - Different actors execute in parallel on a [`ThreadPool`].
//! - Messaging a dropped actor is a silent, safe no-op.
//! - Once an [`Actor`] is dropped, none of its messages run again, even those
//!   already queued or in a scheduler's backlog.
//!
//! ## Context Passing
//!
//! There is no global "current scheduler". Components that create actors take
//! a [`Context`] (scheduler + tokio runtime handle for timers) explicitly:
//!
//! ```rust
//! use actor_runtime::{Actor, ThreadPool};
//!
//! #[tokio::main]
//! async fn main() {
//!     let pool = ThreadPool::new(4).unwrap();
//!     let context = pool.context();
//!
//!     let log = Actor::new(context.scheduler(), Vec::<String>::new());
//!     let log_ref = log.actor_ref();
//!     for i in 0..3 {
//!         log_ref.invoke(move |lines| lines.push(format!("line {i}")));
//!     }
//!
//!     let lines = log_ref.ask(|lines| lines.clone()).await.unwrap();
//!     assert_eq!(lines, vec!["line 0", "line 1", "line 2"]);
//! }
//! ```
//!
//! ## Testing
//!
//! The [`mock`] module provides a [`ManualScheduler`](mock::ManualScheduler)
//! that drains mailboxes only when the test asks, for fully deterministic tests.

pub mod actor;
pub mod actor_ref;
pub mod error;
pub mod mailbox;
pub mod message;
pub mod mock;
pub mod run_loop;
pub mod scheduler;
pub mod thread_pool;
pub mod timer;
pub mod tracing;

// Re-export core types for convenience
pub use actor::Actor;
pub use actor_ref::ActorRef;
pub use error::RuntimeError;
pub use mailbox::Mailbox;
pub use message::Message;
pub use run_loop::RunLoop;
pub use scheduler::{Context, Scheduler};
pub use thread_pool::ThreadPool;
pub use timer::Timer;
