//! # Mailbox
//!
//! An ordered, thread-safe message queue owned by exactly one actor.
//!
//! ## Scheduling Protocol
//!
//! A mailbox never drains itself. Instead it asks its [`Scheduler`] to call
//! [`Mailbox::receive`] later:
//!
//! 1. [`push`](Mailbox::push) schedules the mailbox only when the queue goes
//!    from empty to non-empty.
//! 2. [`receive`](Mailbox::receive) executes exactly **one** message and, if
//!    more are waiting, schedules the mailbox again instead of looping.
//!
//! Because there is at most one outstanding `schedule` call per non-empty
//! queue, at most one `receive` runs at a time and messages execute strictly
//! in push order. Different mailboxes drain in parallel.
//!
//! ## Closing
//!
//! [`close`](Mailbox::close) is how an actor's owner guarantees that no message
//! runs after the actor starts being destroyed. It blocks until an in-flight
//! `receive` on another thread finishes. Closing from *inside* one of the
//! mailbox's own messages is allowed: the receive lock is re-entrant.

use crate::message::Message;
use crate::scheduler::Scheduler;
use parking_lot::{Mutex, ReentrantMutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::trace;

/// The message queue of a single actor.
///
/// Always handled through `Arc<Mailbox>`; actor references hold a `Weak` to it
/// so that an unreachable actor silently stops receiving.
pub struct Mailbox {
    weak_self: Weak<Mailbox>,
    scheduler: Weak<dyn Scheduler>,
    queue: Mutex<VecDeque<Message>>,
    pushing: Mutex<()>,
    receiving: ReentrantMutex<()>,
    closed: AtomicBool,
}

impl Mailbox {
    /// Creates an open mailbox drained by `scheduler`.
    ///
    /// The mailbox keeps only a weak reference to the scheduler. Once the
    /// scheduler is gone, pushes still enqueue but nothing drains them.
    pub fn new(scheduler: &Arc<dyn Scheduler>) -> Arc<Self> {
        let scheduler = Arc::downgrade(scheduler);
        Arc::new_cyclic(|weak_self| Self {
            weak_self: weak_self.clone(),
            scheduler,
            queue: Mutex::new(VecDeque::new()),
            pushing: Mutex::new(()),
            receiving: ReentrantMutex::new(()),
            closed: AtomicBool::new(false),
        })
    }

    /// Enqueues a message. Callable from any thread.
    ///
    /// Dropped silently once the mailbox is closed.
    pub fn push(&self, message: Message) {
        let _pushing = self.pushing.lock();
        if self.closed.load(Ordering::Acquire) {
            trace!("Mailbox closed, message dropped");
            return;
        }

        let mut queue = self.queue.lock();
        let was_empty = queue.is_empty();
        queue.push_back(message);

        if was_empty {
            self.reschedule();
        }
    }

    /// Executes the next queued message, then re-schedules if more remain.
    ///
    /// Called by schedulers only.
    pub fn receive(&self) {
        let _receiving = self.receiving.lock();
        if self.closed.load(Ordering::Acquire) {
            return;
        }

        let (message, was_empty) = {
            let mut queue = self.queue.lock();
            match queue.pop_front() {
                Some(message) => (message, queue.is_empty()),
                None => return,
            }
        };

        message();

        if !was_empty {
            self.reschedule();
        }
    }

    /// Closes the mailbox.
    ///
    /// After this returns no message executes anymore and every future push is
    /// a no-op. Messages still in the queue are dropped, which releases
    /// anything they captured (e.g. reply channels of pending asks).
    pub fn close(&self) {
        {
            let _pushing = self.pushing.lock();
            self.closed.store(true, Ordering::Release);
        }

        // Waits for a receive in progress on another thread.
        let receiving = self.receiving.lock();
        let dropped = std::mem::take(&mut *self.queue.lock());
        drop(receiving);

        trace!(dropped = dropped.len(), "Mailbox closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Number of messages waiting to execute.
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    fn reschedule(&self) {
        if let Some(scheduler) = self.scheduler.upgrade() {
            scheduler.schedule(self.weak_self.clone());
        } else {
            trace!("Scheduler gone, mailbox not scheduled");
        }
    }
}

impl std::fmt::Debug for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailbox")
            .field("len", &self.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}
