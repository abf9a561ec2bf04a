//! # Messages
//!
//! The unit of work queued in a [`Mailbox`](crate::Mailbox). A mailbox does not
//! know what type of actor it belongs to: messages arrive already bound to
//! their target object by [`ActorRef`](crate::ActorRef), so the queue only
//! stores opaque closures.

/// An opaque, type-erased message.
///
/// Executing the message consumes it. The closure is responsible for
/// resolving its target object and for doing nothing when the target is gone.
pub type Message = Box<dyn FnOnce() + Send + 'static>;
