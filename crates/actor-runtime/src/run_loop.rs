//! # Run Loop
//!
//! A single-threaded [`Scheduler`] for actors that must execute on one specific
//! thread. The loop is bound to the thread that created it; any thread may
//! schedule onto it, but only the owner may drain it.
//!
//! ```rust
//! use actor_runtime::{Actor, RunLoop, Scheduler};
//! use std::sync::Arc;
//!
//! let run_loop = RunLoop::new();
//! let scheduler: Arc<dyn Scheduler> = run_loop.clone();
//! let actor = Actor::new(&scheduler, Vec::<u32>::new());
//!
//! actor.actor_ref().invoke(|items| items.push(1));
//! actor.actor_ref().invoke(|items| items.push(2));
//!
//! assert_eq!(run_loop.run_until_idle().unwrap(), 2);
//! ```

use crate::error::RuntimeError;
use crate::mailbox::Mailbox;
use crate::scheduler::{drain, Scheduler};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};

struct State {
    queue: VecDeque<Weak<Mailbox>>,
    stopped: bool,
}

/// A scheduler drained by its owning thread.
pub struct RunLoop {
    owner: ThreadId,
    state: Mutex<State>,
    ready: Condvar,
}

impl RunLoop {
    /// Creates a run loop owned by the calling thread.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            owner: thread::current().id(),
            state: Mutex::new(State {
                queue: VecDeque::new(),
                stopped: false,
            }),
            ready: Condvar::new(),
        })
    }

    pub fn owner(&self) -> ThreadId {
        self.owner
    }

    /// Drains one scheduled mailbox. Returns `false` when nothing was queued.
    pub fn run_once(&self) -> Result<bool, RuntimeError> {
        self.check_thread()?;
        let next = self.state.lock().queue.pop_front();
        match next {
            Some(mailbox) => {
                drain(mailbox);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Drains until the queue is empty, including work scheduled meanwhile.
    /// Returns the number of drains performed.
    pub fn run_until_idle(&self) -> Result<usize, RuntimeError> {
        let mut drained = 0;
        while self.run_once()? {
            drained += 1;
        }
        Ok(drained)
    }

    /// Blocks the owning thread, draining work as it arrives, until [`stop`](Self::stop).
    pub fn run(&self) -> Result<(), RuntimeError> {
        self.check_thread()?;
        loop {
            let mailbox = {
                let mut state = self.state.lock();
                while state.queue.is_empty() && !state.stopped {
                    self.ready.wait(&mut state);
                }
                if state.stopped {
                    state.stopped = false;
                    return Ok(());
                }
                state.queue.pop_front()
            };
            if let Some(mailbox) = mailbox {
                drain(mailbox);
            }
        }
    }

    /// Makes a running [`run`](Self::run) return. Callable from any thread.
    pub fn stop(&self) {
        self.state.lock().stopped = true;
        self.ready.notify_all();
    }

    /// Number of mailboxes waiting to be drained.
    pub fn pending(&self) -> usize {
        self.state.lock().queue.len()
    }

    fn check_thread(&self) -> Result<(), RuntimeError> {
        let actual = thread::current().id();
        if actual == self.owner {
            Ok(())
        } else {
            Err(RuntimeError::WrongThread {
                owner: self.owner,
                actual,
            })
        }
    }
}

impl Scheduler for RunLoop {
    fn schedule(&self, mailbox: Weak<Mailbox>) {
        self.state.lock().queue.push_back(mailbox);
        self.ready.notify_one();
    }
}
