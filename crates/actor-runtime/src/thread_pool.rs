//! # Thread Pool
//!
//! A [`Scheduler`] that drains mailboxes across a fixed set of worker threads.
//!
//! Workers are the threads of a dedicated multi-threaded tokio runtime: every
//! `schedule` call becomes one task on the runtime's shared queue, and each task
//! performs exactly one `receive`. The same runtime also hosts timers and async
//! network I/O, so completions never occupy a worker for the duration of I/O.

use crate::error::RuntimeError;
use crate::mailbox::Mailbox;
use crate::scheduler::{drain, Context, Scheduler};
use std::sync::{Arc, Weak};
use tokio::runtime::{Builder, Handle, Runtime};
use tracing::info;

/// Fixed-size worker pool.
pub struct ThreadPool {
    name: String,
    threads: usize,
    runtime: Option<Runtime>,
    handle: Handle,
}

impl ThreadPool {
    /// Starts a pool with `threads` workers (at least one).
    pub fn new(threads: usize) -> Result<Arc<Self>, RuntimeError> {
        Self::with_name("actor-worker", threads)
    }

    /// Starts a pool whose worker threads are named `name`.
    pub fn with_name(name: impl Into<String>, threads: usize) -> Result<Arc<Self>, RuntimeError> {
        let name = name.into();
        let threads = threads.max(1);
        let runtime = Builder::new_multi_thread()
            .worker_threads(threads)
            .thread_name(name.clone())
            .enable_all()
            .build()?;
        let handle = runtime.handle().clone();

        info!(pool = %name, threads, "Thread pool started");
        Ok(Arc::new(Self {
            name,
            threads,
            runtime: Some(runtime),
            handle,
        }))
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Handle to the runtime backing the workers.
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// A context that binds actors to this pool and runs timers on it.
    pub fn context(self: &Arc<Self>) -> Context {
        let scheduler: Arc<dyn Scheduler> = self.clone();
        Context::new(scheduler, self.handle.clone())
    }
}

impl Scheduler for ThreadPool {
    fn schedule(&self, mailbox: Weak<Mailbox>) {
        self.handle.spawn(async move { drain(mailbox) });
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        // Never blocks: the last owner may be a worker or an async task.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
        info!(pool = %self.name, "Thread pool stopped");
    }
}
