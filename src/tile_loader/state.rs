//! The loading state machine, run as an actor.

use super::{LoaderContext, Necessity, TileData, TileObserver};
use crate::cache::Cache;
use crate::file_source::AsyncRequest;
use crate::resource::{sanitize_url, Priority, Resource};
use crate::response::{Reason, Response, ResponseError};
use actor_runtime::{ActorRef, Timer};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::runtime::Handle;
use tracing::{debug, trace, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TimerKind {
    Retry,
    Revalidation,
}

/// Runs `work` against `cache`, on the blocking pool when the cache does disk
/// I/O and inline otherwise.
fn with_cache(
    cache: &Arc<dyn Cache>,
    runtime: &Handle,
    work: impl FnOnce(&dyn Cache) + Send + 'static,
) {
    if cache.performs_io() {
        let cache = cache.clone();
        runtime.spawn_blocking(move || work(cache.as_ref()));
    } else {
        work(cache.as_ref());
    }
}

/// A response taken out of the cache. Unless discarded, it is put back when
/// dropped, so a loader cancelled before the network answers does not lose it.
struct CachedCopy {
    cache: Arc<dyn Cache>,
    runtime: Handle,
    resource: Resource,
    response: Response,
    discarded: bool,
}

impl CachedCopy {
    fn response(&self) -> &Response {
        &self.response
    }

    /// A newer response replaced this copy in the cache.
    fn discard(mut self) {
        self.discarded = true;
    }
}

impl Drop for CachedCopy {
    fn drop(&mut self) {
        if self.discarded {
            return;
        }
        trace!(url = %self.resource.url, "Returning cached copy");
        let resource = self.resource.clone();
        let response = std::mem::take(&mut self.response);
        with_cache(&self.cache, &self.runtime, move |cache| cache.put(&resource, response));
    }
}

pub(super) struct LoaderCore<O: TileObserver> {
    self_ref: ActorRef<LoaderCore<O>>,
    observer: ActorRef<O>,
    /// Cleared by the owning `TileLoader` on cancellation. Notifications
    /// already queued on the observer check it before running.
    alive: Arc<AtomicBool>,
    context: LoaderContext,
    /// The resource, with `prior_*` tracking the latest usable copy.
    resource: Resource,
    necessity: Necessity,
    looking_up: bool,
    cached_copy: Option<CachedCopy>,
    request: Option<AsyncRequest>,
    timer: Option<(TimerKind, Timer)>,
    /// Data has been delivered to the observer.
    loaded: bool,
    failed_requests: u32,
    expired_revalidations: u32,
}

impl<O: TileObserver> LoaderCore<O> {
    pub(super) fn new(
        self_ref: ActorRef<LoaderCore<O>>,
        resource: Resource,
        observer: ActorRef<O>,
        alive: Arc<AtomicBool>,
        context: LoaderContext,
    ) -> Self {
        Self {
            self_ref,
            observer,
            alive,
            context,
            resource,
            necessity: Necessity::None,
            looking_up: false,
            cached_copy: None,
            request: None,
            timer: None,
            loaded: false,
            failed_requests: 0,
            expired_revalidations: 0,
        }
    }

    /// First message after creation: the cache lookup, then the network if
    /// the cache had nothing fresh and the resource is required.
    pub(super) fn start(&mut self, necessity: Necessity) {
        self.apply_necessity(necessity);
        self.looking_up = true;

        let cache = self.context.cache.clone();
        let runtime = self.context.execution.runtime().clone();
        let resource = self.resource.clone();
        if !cache.performs_io() {
            let cached = take_cached(cache, runtime, resource);
            self.on_cache_result(cached);
            return;
        }

        let self_ref = self.self_ref.clone();
        runtime.clone().spawn_blocking(move || {
            // Dropped unread if the loader is gone, which restores the copy.
            let cached = take_cached(cache, runtime, resource);
            self_ref.invoke(move |core| core.on_cache_result(cached));
        });
    }

    pub(super) fn set_necessity(&mut self, necessity: Necessity) {
        self.apply_necessity(necessity);
        match necessity {
            Necessity::Required => self.make_required(),
            Necessity::Optional => self.make_optional(),
            Necessity::None => {}
        }
    }

    fn apply_necessity(&mut self, necessity: Necessity) {
        self.necessity = necessity;
        self.resource.priority = match necessity {
            Necessity::Required => Priority::Regular,
            _ => Priority::Low,
        };
    }

    fn make_required(&mut self) {
        if self.looking_up || self.request.is_some() || self.timer.is_some() {
            return;
        }
        if self.loaded {
            self.schedule_revalidation();
        } else {
            self.load_from_network(self.resource.priority);
        }
    }

    fn make_optional(&mut self) {
        if matches!(self.timer, Some((TimerKind::Revalidation, _))) {
            self.timer = None;
        }
    }

    fn on_cache_result(&mut self, cached: Option<CachedCopy>) {
        self.looking_up = false;
        let required = self.necessity == Necessity::Required;
        let Some(copy) = cached else {
            trace!(url = %self.resource.url, "Cache miss");
            if required {
                self.load_from_network(self.resource.priority);
            }
            return;
        };

        let response = copy.response().clone();
        self.remember(&response);
        self.cached_copy = Some(copy);

        let now = SystemTime::now();
        if response.is_fresh(now) {
            debug!(url = %self.resource.url, "Served from cache");
            self.deliver(&response);
            if required {
                self.schedule_revalidation();
            }
        } else if response.is_usable(now) {
            debug!(url = %self.resource.url, "Stale cache hit, revalidating");
            self.deliver(&response);
            if required {
                self.load_from_network(Priority::Low);
            }
        } else {
            debug!(url = %self.resource.url, "Cached copy needs revalidation before use");
            if required {
                self.load_from_network(self.resource.priority);
            }
        }
    }

    fn load_from_network(&mut self, priority: Priority) {
        self.timer = None;
        let mut resource = self.resource.clone();
        resource.priority = priority;

        let self_ref = self.self_ref.clone();
        let request = self.context.file_source.request(
            resource,
            Box::new(move |response| {
                self_ref.invoke(move |core| core.on_response(response));
            }),
        );
        self.request = Some(request);
    }

    fn on_response(&mut self, mut response: Response) {
        self.request = None;
        if let Some(error) = response.error.take() {
            self.on_error(error);
            return;
        }
        self.failed_requests = 0;
        if let Some(copy) = self.cached_copy.take() {
            copy.discard();
        }

        let now = SystemTime::now();
        if response.modified.is_none() {
            response.modified = self.resource.prior_modified;
        }
        if response.etag.is_none() {
            response.etag = self.resource.prior_etag.clone();
        }
        if response.not_modified {
            response.data = self.resource.prior_data.clone();
        }
        match response.expires {
            Some(expires) => {
                let (expires, expired) =
                    self.context
                        .policy
                        .interpolate_expiration(expires, self.resource.prior_expires, now);
                response.expires = Some(expires);
                self.expired_revalidations = if expired {
                    self.expired_revalidations + 1
                } else {
                    0
                };
            }
            None => self.expired_revalidations = 0,
        }

        self.remember(&response);

        let mut stored = response.clone();
        stored.not_modified = false;
        if response.not_modified && self.loaded {
            let (modified, expires) = (response.modified, response.expires);
            self.store_then_notify(stored, move |observer| {
                observer.on_tile_revalidated(modified, expires)
            });
        } else {
            self.loaded = true;
            let tile = tile_data(&response);
            self.store_then_notify(stored, move |observer| observer.on_tile_loaded(tile));
        }

        if self.necessity == Necessity::Required {
            self.schedule_revalidation();
        }
    }

    fn on_error(&mut self, error: ResponseError) {
        if error.reason == Reason::Canceled {
            debug!(url = %self.resource.url, "Request canceled");
            return;
        }
        self.failed_requests = self.failed_requests.saturating_add(1);

        let delay = self.context.policy.error_retry_timeout(
            error.reason,
            self.failed_requests,
            error.retry_after,
            SystemTime::now(),
        );
        let Some(delay) = delay else {
            warn!(
                url = %sanitize_url(&self.resource.url),
                reason = %error.reason,
                message = %error.message,
                "Load failed"
            );
            self.notify(move |observer| observer.on_tile_error(error));
            return;
        };

        debug!(
            url = %self.resource.url,
            reason = %error.reason,
            attempt = self.failed_requests,
            ?delay,
            "Retry scheduled"
        );
        let self_ref = self.self_ref.clone();
        let retry = move || self_ref.invoke(|core| core.retry());
        let runtime = self.context.execution.runtime();
        let timer = if error.reason == Reason::Connection {
            Timer::start_or_wake(runtime, delay, self.context.network.subscribe(), retry)
        } else {
            Timer::start(runtime, delay, retry)
        };
        self.timer = Some((TimerKind::Retry, timer));
    }

    fn retry(&mut self) {
        self.timer = None;
        if self.request.is_none() {
            self.load_from_network(self.resource.priority);
        }
    }

    fn schedule_revalidation(&mut self) {
        let delay = self.context.policy.expiration_timeout(
            self.resource.prior_expires,
            self.expired_revalidations,
            SystemTime::now(),
        );
        let Some(delay) = delay else {
            return;
        };

        trace!(url = %self.resource.url, ?delay, "Revalidation scheduled");
        let self_ref = self.self_ref.clone();
        let timer = Timer::start(self.context.execution.runtime(), delay, move || {
            self_ref.invoke(|core| core.revalidate());
        });
        self.timer = Some((TimerKind::Revalidation, timer));
    }

    fn revalidate(&mut self) {
        self.timer = None;
        if self.necessity == Necessity::Required && self.request.is_none() {
            debug!(url = %self.resource.url, "Revalidating");
            self.load_from_network(self.resource.priority);
        }
    }

    /// Records `response` as the prior copy for conditional requests.
    fn remember(&mut self, response: &Response) {
        self.resource.prior_modified = response.modified;
        self.resource.prior_expires = response.expires;
        self.resource.prior_etag = response.etag.clone();
        if response.data.is_some() {
            self.resource.prior_data = response.data.clone();
        }
    }

    fn deliver(&mut self, response: &Response) {
        self.loaded = true;
        let tile = tile_data(response);
        self.notify(move |observer| observer.on_tile_loaded(tile));
    }

    /// Stores `stored`, then notifies: the owner never hears about data that
    /// is not yet in the cache.
    fn store_then_notify(&self, stored: Response, f: impl FnOnce(&mut O) + Send + 'static) {
        let resource = self.resource.clone();
        let notify = self.notification(f);
        with_cache(&self.context.cache, self.context.execution.runtime(), move |cache| {
            cache.put(&resource, stored);
            notify();
        });
    }

    fn notify(&self, f: impl FnOnce(&mut O) + Send + 'static) {
        self.notification(f)();
    }

    /// Wraps `f` so it only reaches the observer while the loader is wanted.
    fn notification(
        &self,
        f: impl FnOnce(&mut O) + Send + 'static,
    ) -> impl FnOnce() + Send + 'static {
        let observer = self.observer.clone();
        let alive = self.alive.clone();
        move || {
            observer.invoke(move |observer| {
                if alive.load(Ordering::Acquire) {
                    f(observer);
                }
            })
        }
    }
}

fn take_cached(cache: Arc<dyn Cache>, runtime: Handle, resource: Resource) -> Option<CachedCopy> {
    let response = cache.get(&resource)?;
    Some(CachedCopy {
        cache,
        runtime,
        resource,
        response,
        discarded: false,
    })
}

fn tile_data(response: &Response) -> TileData {
    TileData {
        data: response.data.clone(),
        modified: response.modified,
        expires: response.expires,
    }
}
