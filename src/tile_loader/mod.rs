//! # Tile Loader
//!
//! A [`TileLoader`] drives the loading of one resource on behalf of one owner,
//! according to the owner's current [`Necessity`]:
//!
//! | Transition | Effect |
//! |------------|--------|
//! | `None → Required` | cache lookup, showing any usable copy, then a network fetch unless the copy was fresh |
//! | `None → Optional` | cache lookup only |
//! | `Optional → Required` | fetch if nothing usable was loaded, resume revalidation |
//! | `Required → Optional` | keep in-flight work, stop revalidating, retry at low priority |
//! | `* → None` | cancel everything; no callback fires afterwards |
//!
//! Results reach the owner as messages through its [`ActorRef`], via the
//! [`TileObserver`] trait. Failures are classified and retried with the
//! [`RetryPolicy`](crate::retry::RetryPolicy); only terminal failures are
//! reported.
//!
//! ## Lifetime
//!
//! The loading state lives in an actor owned by the `TileLoader`. Switching to
//! `None` (or dropping the loader) drops that actor synchronously: its mailbox
//! closes, the pending request is cancelled and timers are stopped, so late
//! network completions are discarded instead of delivered. Notifications
//! already queued on the owner's mailbox are suppressed too.
//!
//! ```rust,ignore
//! let mut loader = TileLoader::new(Resource::tile("tile://1/2/3"), tile_ref, context);
//! loader.set_necessity(Necessity::Required);
//! // ... TileObserver::on_tile_loaded arrives on the tile's actor ...
//! loader.set_necessity(Necessity::None); // cancels, nothing more is delivered
//! ```

mod state;

use self::state::LoaderCore;
use crate::cache::Cache;
use crate::file_source::{FileSource, NetworkStatus};
use crate::resource::Resource;
use crate::response::{ResponseError, Timestamp};
use crate::retry::RetryPolicy;
use actor_runtime::{Actor, ActorRef, Context};
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, instrument};

/// How badly the owner needs the resource.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Necessity {
    #[default]
    None,
    Optional,
    Required,
}

/// A successfully loaded resource, as delivered to the owner.
#[derive(Clone, Debug, PartialEq)]
pub struct TileData {
    pub data: Option<Bytes>,
    pub modified: Option<Timestamp>,
    pub expires: Option<Timestamp>,
}

/// Receives load results. Implemented by the actor that owns a loader.
pub trait TileObserver: Send + 'static {
    fn on_tile_loaded(&mut self, tile: TileData);

    /// Terminal failure: the error is not retried.
    fn on_tile_error(&mut self, error: ResponseError);

    /// The origin confirmed the data delivered earlier is still current.
    fn on_tile_revalidated(&mut self, _modified: Option<Timestamp>, _expires: Option<Timestamp>) {}
}

/// Everything a loader needs from its surroundings.
#[derive(Clone)]
pub struct LoaderContext {
    pub execution: Context,
    pub cache: Arc<dyn Cache>,
    pub file_source: Arc<dyn FileSource>,
    pub network: NetworkStatus,
    pub policy: RetryPolicy,
}

impl std::fmt::Debug for LoaderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderContext")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Necessity-driven loader for one resource.
pub struct TileLoader<O: TileObserver> {
    resource: Resource,
    necessity: Necessity,
    observer: ActorRef<O>,
    context: LoaderContext,
    core: Option<Actor<LoaderCore<O>>>,
    /// Shared with the current core; cleared when that core is cancelled.
    alive: Arc<AtomicBool>,
}

impl<O: TileObserver> TileLoader<O> {
    /// Creates an idle loader. Nothing happens until the necessity is raised.
    pub fn new(resource: Resource, observer: ActorRef<O>, context: LoaderContext) -> Self {
        Self {
            resource,
            necessity: Necessity::None,
            observer,
            context,
            core: None,
            alive: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn necessity(&self) -> Necessity {
        self.necessity
    }

    /// Moves the loader to `necessity`. Setting the current value is a no-op.
    #[instrument(skip(self), fields(url = %self.resource.url))]
    pub fn set_necessity(&mut self, necessity: Necessity) {
        if necessity == self.necessity {
            return;
        }
        debug!(from = ?self.necessity, "Necessity changed");
        self.necessity = necessity;

        if necessity == Necessity::None {
            self.cancel();
            return;
        }

        match &self.core {
            Some(core) => {
                core.actor_ref().invoke(move |core| core.set_necessity(necessity));
            }
            None => {
                let resource = self.resource.clone();
                let observer = self.observer.clone();
                let context = self.context.clone();
                let scheduler = context.execution.scheduler().clone();
                self.alive = Arc::new(AtomicBool::new(true));
                let alive = self.alive.clone();
                let core = Actor::new_cyclic(&scheduler, move |self_ref| {
                    LoaderCore::new(self_ref, resource, observer, alive, context)
                });
                core.actor_ref().invoke(move |core| core.start(necessity));
                self.core = Some(core);
            }
        }
    }

    /// Silences the current core, then drops it. Closing its mailbox drops
    /// the pending request and timers.
    fn cancel(&mut self) {
        self.alive.store(false, Ordering::Release);
        self.core = None;
    }
}

impl<O: TileObserver> Drop for TileLoader<O> {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl<O: TileObserver> std::fmt::Debug for TileLoader<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileLoader")
            .field("url", &self.resource.url)
            .field("necessity", &self.necessity)
            .finish()
    }
}
