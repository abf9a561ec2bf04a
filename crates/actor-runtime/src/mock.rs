//! # Deterministic Scheduling for Tests
//!
//! [`ManualScheduler`] implements [`Scheduler`] without any threads. Scheduled
//! mailboxes are recorded in order and only drained when the test says so.
//! This makes ordering and lifetime properties testable step by step, without
//! sleeping or racing real workers.
//!
//! | Feature | ManualScheduler | ThreadPool |
//! |---------|-----------------|------------|
//! | **Threads** | None (caller drains) | N workers |
//! | **Determinism** | Fully deterministic | Subject to OS scheduling |
//! | **Use Case** | Unit tests of protocols | Integration / concurrency tests |
//!
//! ```rust
//! use actor_runtime::mock::ManualScheduler;
//! use actor_runtime::{Actor, Scheduler};
//! use std::sync::Arc;
//!
//! let scheduler = ManualScheduler::new();
//! let dyn_scheduler: Arc<dyn Scheduler> = scheduler.clone();
//! let actor = Actor::new(&dyn_scheduler, String::new());
//!
//! actor.actor_ref().invoke(|s| s.push('a'));
//! assert_eq!(scheduler.pending(), 1);
//!
//! scheduler.run_until_idle();
//! assert_eq!(scheduler.pending(), 0);
//! ```

use crate::mailbox::Mailbox;
use crate::scheduler::{drain, Scheduler};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::{Arc, Weak};

/// A scheduler drained explicitly by the test.
#[derive(Default)]
pub struct ManualScheduler {
    scheduled: Mutex<VecDeque<Weak<Mailbox>>>,
}

impl ManualScheduler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of `schedule` calls not yet drained.
    pub fn pending(&self) -> usize {
        self.scheduled.lock().len()
    }

    /// Drains the oldest scheduled mailbox. Returns `false` if none was queued.
    pub fn run_next(&self) -> bool {
        let next = self.scheduled.lock().pop_front();
        match next {
            Some(mailbox) => {
                drain(mailbox);
                true
            }
            None => false,
        }
    }

    /// Drains until nothing is scheduled. Returns the number of drains.
    pub fn run_until_idle(&self) -> usize {
        let mut drained = 0;
        while self.run_next() {
            drained += 1;
        }
        drained
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, mailbox: Weak<Mailbox>) {
        self.scheduled.lock().push_back(mailbox);
    }
}
