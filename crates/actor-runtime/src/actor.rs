//! # Actor
//!
//! An [`Actor<T>`] owns a worker object of type `T` together with the
//! [`Mailbox`] that feeds it. The object is only ever touched by messages
//! drained from that mailbox, one at a time, in push order. Other code talks to
//! it exclusively through [`ActorRef<T>`] handles.
//!
//! ## Lifetime
//!
//! Dropping the `Actor` closes the mailbox *before* the object is released.
//! `close()` waits for an in-flight message on another thread to finish, so
//! once the drop returns no message can observe the object again. Outstanding
//! `ActorRef`s keep working as no-ops.
//!
//! ```rust
//! use actor_runtime::{Actor, Scheduler, ThreadPool};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let pool = ThreadPool::new(2).unwrap();
//!     let scheduler: Arc<dyn Scheduler> = pool.clone();
//!
//!     let counter = Actor::new(&scheduler, 0u64);
//!     let counter_ref = counter.actor_ref();
//!     counter_ref.invoke(|n| *n += 1);
//!
//!     let total = counter_ref.ask(|n| *n).await.unwrap();
//!     assert_eq!(total, 1);
//!
//!     drop(counter);
//!     // Messages to a dropped actor are silently ignored.
//!     counter_ref.invoke(|n| *n += 1);
//!     assert!(counter_ref.ask(|n| *n).await.is_err());
//! }
//! ```

use crate::actor_ref::ActorRef;
use crate::mailbox::Mailbox;
use crate::scheduler::Scheduler;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Owner of a worker object and its mailbox.
pub struct Actor<T: Send + 'static> {
    mailbox: Arc<Mailbox>,
    object: Arc<Mutex<T>>,
}

impl<T: Send + 'static> Actor<T> {
    /// Wraps `object` in an actor bound to `scheduler`.
    pub fn new(scheduler: &Arc<dyn Scheduler>, object: T) -> Self {
        Self {
            mailbox: Mailbox::new(scheduler),
            object: Arc::new(Mutex::new(object)),
        }
    }

    /// Builds the object with access to its own [`ActorRef`], for objects that
    /// send messages to themselves (timers, completions).
    pub fn new_cyclic(scheduler: &Arc<dyn Scheduler>, build: impl FnOnce(ActorRef<T>) -> T) -> Self {
        let mailbox = Mailbox::new(scheduler);
        let object = Arc::new_cyclic(|weak_object| {
            let self_ref = ActorRef::new(weak_object.clone(), Arc::downgrade(&mailbox));
            Mutex::new(build(self_ref))
        });
        Self { mailbox, object }
    }

    /// A non-owning handle for sending messages to this actor.
    pub fn actor_ref(&self) -> ActorRef<T> {
        ActorRef::new(Arc::downgrade(&self.object), Arc::downgrade(&self.mailbox))
    }

    pub fn mailbox(&self) -> &Arc<Mailbox> {
        &self.mailbox
    }
}

impl<T: Send + 'static> Drop for Actor<T> {
    fn drop(&mut self) {
        self.mailbox.close();
        let entity_type = std::any::type_name::<T>()
            .split("::")
            .last()
            .unwrap_or("Unknown");
        debug!(entity_type, "Actor closed");
    }
}
