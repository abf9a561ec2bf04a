//! # Online File Source
//!
//! Network access with a bounded number of concurrent transport requests.
//!
//! The source is an actor: all bookkeeping happens inside actor messages,
//! while transport I/O runs as tokio tasks whose completion is messaged back.
//! A request moves through:
//!
//! 1. **Pending**: waiting for room in the active set. Regular requests are
//!    served before low priority ones, FIFO within each class.
//! 2. **Active**: a transport fetch is in flight.
//! 3. **Done**: the response was handed to the request's callback.
//!
//! Cancelling removes the request in any state and aborts its fetch.

use super::{
    AsyncRequest, Callback, FileSource, HttpTransport, NetworkStatus, Responder, ASSET_PROTOCOL,
    FILE_PROTOCOL,
};
use crate::resource::{sanitize_url, Priority, Resource};
use crate::response::{Reason, Response};
use actor_runtime::{Actor, ActorRef, Context};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

/// Concurrent transport requests allowed by default.
pub const DEFAULT_MAXIMUM_CONCURRENT_REQUESTS: usize = 20;

const OFFLINE_MESSAGE: &str = "Online connectivity is disabled.";

type RequestId = u64;

/// Snapshot of the request sets, for monitoring and tests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RequestStats {
    pub active: usize,
    pub pending: usize,
}

struct Task {
    resource: Resource,
    responder: Responder,
    fetch: Option<JoinHandle<()>>,
}

/// Waiting requests: every regular request ahead of every low priority one.
#[derive(Default)]
struct PendingRequests {
    regular: VecDeque<RequestId>,
    low: VecDeque<RequestId>,
}

impl PendingRequests {
    fn insert(&mut self, id: RequestId, priority: Priority) {
        match priority {
            Priority::Regular => self.regular.push_back(id),
            Priority::Low => self.low.push_back(id),
        }
    }

    fn pop(&mut self) -> Option<RequestId> {
        self.regular.pop_front().or_else(|| self.low.pop_front())
    }

    fn remove(&mut self, id: RequestId) {
        self.regular.retain(|queued| *queued != id);
        self.low.retain(|queued| *queued != id);
    }

    fn len(&self) -> usize {
        self.regular.len() + self.low.len()
    }
}

/// Actor state of an [`OnlineFileSource`].
struct OnlineState {
    self_ref: ActorRef<OnlineState>,
    transport: Arc<dyn HttpTransport>,
    runtime: Handle,
    network: NetworkStatus,
    max_concurrent: usize,
    tasks: HashMap<RequestId, Task>,
    active: HashSet<RequestId>,
    pending: PendingRequests,
}

impl OnlineState {
    fn add(&mut self, id: RequestId, resource: Resource, responder: Responder) {
        if responder.is_cancelled() {
            return;
        }
        let priority = resource.priority;
        self.tasks.insert(
            id,
            Task {
                resource,
                responder,
                fetch: None,
            },
        );

        if self.active.len() >= self.max_concurrent {
            self.pending.insert(id, priority);
            debug!(id, pending = self.pending.len(), "Request queued");
        } else {
            self.activate(id);
        }
    }

    fn activate(&mut self, id: RequestId) {
        let Some(task) = self.tasks.get_mut(&id) else {
            return;
        };
        self.active.insert(id);

        if !self.network.is_online() {
            let response = Response::error(Reason::Connection, OFFLINE_MESSAGE);
            self.self_ref.invoke(move |state| state.finish(id, response));
            return;
        }

        debug!(id, url = %task.resource.url, "Request activated");
        let transport = self.transport.clone();
        let resource = task.resource.clone();
        let self_ref = self.self_ref.clone();
        task.fetch = Some(self.runtime.spawn(async move {
            let response = transport.fetch(&resource).await;
            self_ref.invoke(move |state| state.finish(id, response));
        }));
    }

    fn finish(&mut self, id: RequestId, response: Response) {
        if !self.active.remove(&id) {
            return;
        }
        let Some(task) = self.tasks.remove(&id) else {
            return;
        };

        if matches!(&response.error, Some(error) if error.reason == Reason::NotFound) {
            info!(url = %sanitize_url(&task.resource.url), "Requested resource not found");
        }
        task.responder.respond(response);
        self.activate_pending();
    }

    fn cancel(&mut self, id: RequestId) {
        let Some(task) = self.tasks.remove(&id) else {
            return;
        };
        if let Some(fetch) = task.fetch {
            fetch.abort();
        }
        if self.active.remove(&id) {
            self.activate_pending();
        } else {
            self.pending.remove(id);
        }
        debug!(id, url = %task.resource.url, "Request cancelled");
    }

    fn activate_pending(&mut self) {
        while self.active.len() < self.max_concurrent {
            match self.pending.pop() {
                Some(id) => self.activate(id),
                None => break,
            }
        }
    }

    fn set_maximum_concurrent_requests(&mut self, max_concurrent: usize) {
        self.max_concurrent = max_concurrent.max(1);
        self.activate_pending();
    }

    fn stats(&self) -> RequestStats {
        RequestStats {
            active: self.active.len(),
            pending: self.pending.len(),
        }
    }
}

/// A [`FileSource`] backed by an [`HttpTransport`].
pub struct OnlineFileSource {
    actor: Actor<OnlineState>,
    network: NetworkStatus,
    next_id: AtomicU64,
}

impl OnlineFileSource {
    pub fn new(
        context: &Context,
        transport: Arc<dyn HttpTransport>,
        network: NetworkStatus,
        max_concurrent: usize,
    ) -> Self {
        let runtime = context.runtime().clone();
        let state_network = network.clone();
        let actor = Actor::new_cyclic(context.scheduler(), move |self_ref| OnlineState {
            self_ref,
            transport,
            runtime,
            network: state_network,
            max_concurrent: max_concurrent.max(1),
            tasks: HashMap::new(),
            active: HashSet::new(),
            pending: PendingRequests::default(),
        });
        Self {
            actor,
            network,
            next_id: AtomicU64::new(0),
        }
    }

    pub fn network_status(&self) -> &NetworkStatus {
        &self.network
    }

    /// Forces the source offline. Requests activated while offline fail
    /// with a connection error.
    pub fn set_online_status(&self, online: bool) {
        self.network.set_online(online);
    }

    pub fn set_maximum_concurrent_requests(&self, max_concurrent: usize) {
        self.actor
            .actor_ref()
            .invoke(move |state| state.set_maximum_concurrent_requests(max_concurrent));
    }

    /// Current number of active and pending requests.
    pub async fn stats(&self) -> RequestStats {
        self.actor
            .actor_ref()
            .ask(|state| state.stats())
            .await
            .unwrap_or_default()
    }
}

impl FileSource for OnlineFileSource {
    fn can_request(&self, resource: &Resource) -> bool {
        !resource.url.starts_with(ASSET_PROTOCOL) && !resource.url.starts_with(FILE_PROTOCOL)
    }

    #[instrument(skip_all, fields(url = %resource.url))]
    fn request(&self, resource: Resource, callback: Callback) -> AsyncRequest {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (request, responder) = AsyncRequest::new(callback);
        let actor_ref = self.actor.actor_ref();
        actor_ref.invoke(move |state| state.add(id, resource, responder));
        request.on_cancel(move || actor_ref.invoke(move |state| state.cancel(id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actor_runtime::ThreadPool;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::time::Duration;
    use tokio::sync::{mpsc, Notify};

    /// Records fetch order and holds every fetch until released.
    #[derive(Default)]
    struct GatedTransport {
        started: Mutex<Vec<String>>,
        gate: Notify,
    }

    #[async_trait]
    impl HttpTransport for GatedTransport {
        async fn fetch(&self, resource: &Resource) -> Response {
            self.started.lock().push(resource.url.clone());
            self.gate.notified().await;
            Response::with_data(resource.url.clone())
        }
    }

    fn deliver_to(tx: &mpsc::UnboundedSender<Response>) -> Callback {
        let tx = tx.clone();
        Box::new(move |response| {
            let _ = tx.send(response);
        })
    }

    async fn wait_for_stats(source: &OnlineFileSource, expected: RequestStats) {
        for _ in 0..200 {
            if source.stats().await == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("stats never reached {expected:?}");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrency_limit_and_priority_order() {
        let pool = ThreadPool::new(2).unwrap();
        let transport = Arc::new(GatedTransport::default());
        let source =
            OnlineFileSource::new(&pool.context(), transport.clone(), NetworkStatus::default(), 1);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let _first = source.request(Resource::tile("tile://first"), deliver_to(&tx));
        let _low = source.request(
            Resource::tile("tile://low").with_priority(Priority::Low),
            deliver_to(&tx),
        );
        let _regular = source.request(Resource::tile("tile://regular"), deliver_to(&tx));
        wait_for_stats(&source, RequestStats { active: 1, pending: 2 }).await;

        for _ in 0..3 {
            // notify_one stores a permit if the fetch is not waiting yet.
            transport.gate.notify_one();
            rx.recv().await.unwrap();
        }

        assert_eq!(
            *transport.started.lock(),
            vec!["tile://first", "tile://regular", "tile://low"]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancel_pending_and_active_requests() {
        let pool = ThreadPool::new(2).unwrap();
        let transport = Arc::new(GatedTransport::default());
        let source =
            OnlineFileSource::new(&pool.context(), transport.clone(), NetworkStatus::default(), 1);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let active = source.request(Resource::tile("tile://active"), deliver_to(&tx));
        let pending = source.request(Resource::tile("tile://pending"), deliver_to(&tx));
        let _next = source.request(Resource::tile("tile://next"), deliver_to(&tx));
        wait_for_stats(&source, RequestStats { active: 1, pending: 2 }).await;

        drop(pending);
        drop(active);
        wait_for_stats(&source, RequestStats { active: 1, pending: 0 }).await;

        transport.gate.notify_one();
        let response = rx.recv().await.unwrap();
        assert_eq!(response.data.unwrap(), "tile://next");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_offline_requests_fail_with_connection_error() {
        let pool = ThreadPool::new(2).unwrap();
        let transport = Arc::new(GatedTransport::default());
        let network = NetworkStatus::new(false);
        let source = OnlineFileSource::new(
            &pool.context(),
            transport.clone(),
            network,
            DEFAULT_MAXIMUM_CONCURRENT_REQUESTS,
        );
        let (tx, mut rx) = mpsc::unbounded_channel();

        let _request = source.request(Resource::tile("tile://1/2/3"), deliver_to(&tx));
        let response = rx.recv().await.unwrap();
        let error = response.error.unwrap();
        assert_eq!(error.reason, Reason::Connection);
        assert_eq!(error.message, "Online connectivity is disabled.");
        assert!(transport.started.lock().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_local_schemes_are_left_to_other_sources() {
        let pool = ThreadPool::new(2).unwrap();
        let source = OnlineFileSource::new(
            &pool.context(),
            Arc::new(GatedTransport::default()),
            NetworkStatus::default(),
            DEFAULT_MAXIMUM_CONCURRENT_REQUESTS,
        );

        assert!(source.can_request(&Resource::tile("https://example.com/1/2/3.pbf")));
        assert!(!source.can_request(&Resource::tile("asset://tiles/1/2/3.pbf")));
        assert!(!source.can_request(&Resource::tile("file:///data/1/2/3.pbf")));
    }
}
