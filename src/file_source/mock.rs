//! # Mock File Source
//!
//! [`MockFileSource`] implements [`FileSource`] entirely in memory, for
//! testing code that loads resources without a transport or worker pool.
//!
//! | Feature | MockFileSource | OnlineFileSource |
//! |---------|----------------|------------------|
//! | **Speed** | Instant | Transport-bound |
//! | **Determinism** | Fully deterministic | Subject to scheduling |
//! | **Error Injection** | `respond(Response::error(..))` | Requires a failing transport |
//! | **Cancellation** | Counted, observable | Aborts the fetch |
//!
//! Expectations are registered per URL. A request either gets its canned
//! response immediately (`respond`) or is held until the test completes it
//! (`hold` + [`MockFileSource::complete`]), which is how in-flight requests
//! and cancellation are tested.
//!
//! ```rust
//! use tile_loader::file_source::mock::MockFileSource;
//! use tile_loader::file_source::FileSource;
//! use tile_loader::{Resource, Response};
//!
//! let mock = MockFileSource::new();
//! mock.expect_request("tile://1/2/3").respond(Response::with_data("abc"));
//!
//! let (tx, rx) = std::sync::mpsc::channel();
//! let _request = mock.request(
//!     Resource::tile("tile://1/2/3"),
//!     Box::new(move |response| tx.send(response).unwrap()),
//! );
//!
//! assert_eq!(rx.recv().unwrap().data.unwrap(), "abc");
//! mock.verify();
//! ```

use super::{AsyncRequest, Callback, FileSource, Responder};
use crate::resource::Resource;
use crate::response::{Reason, Response};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

enum Reply {
    Respond(Response),
    Hold,
}

struct Expectation {
    url: String,
    reply: Reply,
}

#[derive(Default)]
struct State {
    expectations: VecDeque<Expectation>,
    requests: Vec<Resource>,
    held: Vec<(String, Responder)>,
    unexpected: Vec<String>,
}

/// A [`FileSource`] answering from registered expectations.
#[derive(Default)]
pub struct MockFileSource {
    state: Arc<Mutex<State>>,
    cancellations: Arc<AtomicUsize>,
}

impl MockFileSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Expects a request for `url`. Each expectation matches one request.
    pub fn expect_request(&self, url: impl Into<String>) -> RequestExpectationBuilder {
        RequestExpectationBuilder {
            url: url.into(),
            state: self.state.clone(),
        }
    }

    /// Completes the oldest held request for `url`. Returns `false` if there
    /// was none, or it had been cancelled.
    pub fn complete(&self, url: &str, response: Response) -> bool {
        let responder = {
            let mut state = self.state.lock();
            let Some(position) = state.held.iter().position(|(held, _)| held == url) else {
                return false;
            };
            state.held.remove(position).1
        };
        responder.respond(response)
    }

    /// Number of held requests not yet completed or cancelled.
    pub fn held_count(&self) -> usize {
        self.state
            .lock()
            .held
            .iter()
            .filter(|(_, responder)| !responder.is_cancelled())
            .count()
    }

    /// Every resource requested so far, in order.
    pub fn requests(&self) -> Vec<Resource> {
        self.state.lock().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.state.lock().requests.len()
    }

    /// Number of requests dropped before they completed.
    pub fn cancellations(&self) -> usize {
        self.cancellations.load(Ordering::SeqCst)
    }

    /// Panics unless every expectation was met and no unexpected request
    /// arrived.
    pub fn verify(&self) {
        let state = self.state.lock();
        if !state.unexpected.is_empty() {
            panic!("Unexpected requests: {:?}", state.unexpected);
        }
        if !state.expectations.is_empty() {
            let remaining: Vec<_> = state.expectations.iter().map(|e| e.url.as_str()).collect();
            panic!("Not all expectations were met. Remaining: {remaining:?}");
        }
    }
}

impl FileSource for MockFileSource {
    fn request(&self, resource: Resource, callback: Callback) -> AsyncRequest {
        let (request, responder) = AsyncRequest::new(callback);
        let cancellations = self.cancellations.clone();
        let request = request.on_cancel(move || {
            cancellations.fetch_add(1, Ordering::SeqCst);
        });

        let reply = {
            let mut state = self.state.lock();
            state.requests.push(resource.clone());
            let matched = state
                .expectations
                .iter()
                .position(|expectation| expectation.url == resource.url)
                .and_then(|position| state.expectations.remove(position));
            match matched {
                Some(Expectation {
                    reply: Reply::Hold, ..
                }) => {
                    state.held.push((resource.url.clone(), responder));
                    return request;
                }
                Some(Expectation {
                    reply: Reply::Respond(response),
                    ..
                }) => response,
                None => {
                    state.unexpected.push(resource.url.clone());
                    Response::error(Reason::Other, format!("Unexpected request: {}", resource.url))
                }
            }
        };

        // Outside the lock: the callback may re-enter the mock.
        responder.respond(reply);
        request
    }
}

/// Builder for request expectations.
pub struct RequestExpectationBuilder {
    url: String,
    state: Arc<Mutex<State>>,
}

impl RequestExpectationBuilder {
    /// Answers the request immediately with `response`.
    pub fn respond(self, response: Response) {
        self.push(Reply::Respond(response));
    }

    /// Keeps the request open until [`MockFileSource::complete`] is called.
    pub fn hold(self) {
        self.push(Reply::Hold);
    }

    fn push(self, reply: Reply) {
        self.state.lock().expectations.push_back(Expectation {
            url: self.url,
            reply,
        });
    }
}
