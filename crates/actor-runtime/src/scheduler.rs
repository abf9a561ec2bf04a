//! # Scheduler & Context
//!
//! A [`Scheduler`] is the execution service behind every mailbox: given a
//! mailbox with pending work, it arranges for [`Mailbox::receive`] to be called
//! on some thread. Two implementations ship with the runtime:
//!
//! - [`ThreadPool`](crate::ThreadPool) drains mailboxes on a fixed pool of workers.
//! - [`RunLoop`](crate::RunLoop) drains mailboxes on the one thread that owns it,
//!   for actors that must stay on a specific thread (e.g. a UI loop).
//!
//! There is no ambient "current scheduler". Code that creates actors receives a
//! [`Context`] explicitly and picks the scheduler from it.

use crate::mailbox::Mailbox;
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;

/// Arranges for mailboxes to be drained.
///
/// Implementations must call `receive()` once per `schedule()` call, and must
/// tolerate mailboxes that are gone by the time they run (`upgrade()` fails).
pub trait Scheduler: Send + Sync + 'static {
    fn schedule(&self, mailbox: Weak<Mailbox>);
}

/// Drains `mailbox` if it is still alive. Shared by scheduler implementations.
pub(crate) fn drain(mailbox: Weak<Mailbox>) {
    if let Some(mailbox) = mailbox.upgrade() {
        mailbox.receive();
    }
}

/// The execution context threaded through actor constructors.
///
/// Carries the scheduler actors are bound to and the tokio runtime handle
/// timers and async I/O are spawned on. Cloning is cheap.
#[derive(Clone)]
pub struct Context {
    scheduler: Arc<dyn Scheduler>,
    runtime: Handle,
}

impl Context {
    pub fn new(scheduler: Arc<dyn Scheduler>, runtime: Handle) -> Self {
        Self { scheduler, runtime }
    }

    /// The scheduler new actors should be bound to.
    pub fn scheduler(&self) -> &Arc<dyn Scheduler> {
        &self.scheduler
    }

    /// The runtime timers and async tasks run on.
    pub fn runtime(&self) -> &Handle {
        &self.runtime
    }

    /// Same runtime, different actor affinity.
    pub fn with_scheduler(&self, scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            scheduler,
            runtime: self.runtime.clone(),
        }
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context").finish_non_exhaustive()
    }
}
