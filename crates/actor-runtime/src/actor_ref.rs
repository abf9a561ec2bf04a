//! # Actor References
//!
//! An [`ActorRef<T>`] is a copyable, non-owning handle to an actor: a weak
//! reference to the object plus a weak reference to its mailbox. Invoking it
//! never runs code inline; the closure is queued and executed later by the
//! actor's scheduler.
//!
//! When the actor is gone, both `invoke` and `ask` degrade safely: `invoke`
//! does nothing, `ask` resolves to [`RuntimeError::ActorDropped`].

use crate::error::RuntimeError;
use crate::mailbox::Mailbox;
use parking_lot::Mutex;
use std::sync::Weak;
use tokio::sync::oneshot;
use tracing::trace;

/// Weak, cloneable handle used to message an actor.
pub struct ActorRef<T> {
    object: Weak<Mutex<T>>,
    mailbox: Weak<Mailbox>,
}

impl<T> Clone for ActorRef<T> {
    fn clone(&self) -> Self {
        Self {
            object: self.object.clone(),
            mailbox: self.mailbox.clone(),
        }
    }
}

impl<T> std::fmt::Debug for ActorRef<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorRef")
            .field("alive", &(self.mailbox.strong_count() > 0))
            .finish()
    }
}

impl<T: Send + 'static> ActorRef<T> {
    pub(crate) fn new(object: Weak<Mutex<T>>, mailbox: Weak<Mailbox>) -> Self {
        Self { object, mailbox }
    }

    /// Queues `f` to run against the actor's object.
    ///
    /// A silent no-op when the actor has been dropped.
    pub fn invoke<F>(&self, f: F)
    where
        F: FnOnce(&mut T) + Send + 'static,
    {
        let Some(mailbox) = self.mailbox.upgrade() else {
            trace!("Actor gone, message ignored");
            return;
        };
        let object = self.object.clone();
        mailbox.push(Box::new(move || {
            if let Some(object) = object.upgrade() {
                f(&mut object.lock());
            }
        }));
    }

    /// Queues `f` and waits for its return value.
    ///
    /// Resolves to [`RuntimeError::ActorDropped`] if the actor is dropped
    /// before the message runs.
    pub async fn ask<R, F>(&self, f: F) -> Result<R, RuntimeError>
    where
        F: FnOnce(&mut T) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (respond_to, response) = oneshot::channel();
        self.invoke(move |object| {
            let _ = respond_to.send(f(object));
        });
        response.await.map_err(|_| RuntimeError::ActorDropped)
    }

    /// Whether the actor's mailbox still exists. Racy by nature; informational.
    pub fn is_alive(&self) -> bool {
        self.mailbox
            .upgrade()
            .is_some_and(|mailbox| !mailbox.is_closed())
    }
}
