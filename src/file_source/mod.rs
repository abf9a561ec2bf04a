//! # File Sources
//!
//! A [`FileSource`] turns a [`Resource`] into a [`Response`], delivered later
//! through a callback. The returned [`AsyncRequest`] is the caller's cancel
//! handle: dropping it cancels the request.
//!
//! ```text
//! TileLoader ──request──► OnlineFileSource ──fetch──► HttpTransport
//!     ▲                         │ (limits concurrency,       (platform
//!     └────── callback ─────────┘  queues by priority)        collaborator)
//! ```
//!
//! [`HttpTransport`] is the narrow seam to the platform network stack. It
//! only has to produce one [`Response`] per call; queueing, offline handling
//! and cancellation live in [`OnlineFileSource`].
//!
//! Several sources are combined with a [`CompositeFileSource`], which routes
//! each request by URL scheme:
//!
//! | Scheme | Source |
//! |--------|--------|
//! | `asset://` | [`LocalFileSource::assets`], under the configured asset root |
//! | `file://` | [`LocalFileSource::new`] |
//! | anything else | [`OnlineFileSource`] |

mod composite;
mod local;
pub mod mock;
mod network_status;
mod online;

pub use composite::CompositeFileSource;
pub use local::{LocalFileSource, ASSET_PROTOCOL, FILE_PROTOCOL};
pub use network_status::NetworkStatus;
pub use online::{OnlineFileSource, RequestStats, DEFAULT_MAXIMUM_CONCURRENT_REQUESTS};

use crate::resource::Resource;
use crate::response::Response;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

/// Receives the response of a request. Invoked at most once.
pub type Callback = Box<dyn FnOnce(Response) + Send + 'static>;

/// Something that can load resources.
pub trait FileSource: Send + Sync {
    fn request(&self, resource: Resource, callback: Callback) -> AsyncRequest;

    /// Whether this source handles `resource` at all.
    fn can_request(&self, _resource: &Resource) -> bool {
        true
    }
}

/// The platform network stack.
#[async_trait]
pub trait HttpTransport: Send + Sync + 'static {
    /// Performs one fetch. Failures are reported inside the response.
    async fn fetch(&self, resource: &Resource) -> Response;
}

type Slot = Arc<Mutex<Option<Callback>>>;

/// Handle to an outstanding request. Dropping it cancels the request.
///
/// Once the drop has returned the callback is never invoked, unless it had
/// already started running on another thread.
#[must_use = "dropping an AsyncRequest cancels it"]
pub struct AsyncRequest {
    slot: Slot,
    on_cancel: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl AsyncRequest {
    /// Creates a request handle together with the [`Responder`] the file
    /// source uses to complete it.
    pub fn new(callback: Callback) -> (Self, Responder) {
        let slot: Slot = Arc::new(Mutex::new(Some(callback)));
        let request = Self {
            slot: slot.clone(),
            on_cancel: None,
        };
        (request, Responder { slot })
    }

    /// Runs `cancel` when the request is dropped before completing.
    pub fn on_cancel(mut self, cancel: impl FnOnce() + Send + 'static) -> Self {
        self.on_cancel = Some(Box::new(cancel));
        self
    }

    /// Whether the response was already delivered.
    pub fn is_completed(&self) -> bool {
        self.slot.lock().is_none()
    }
}

impl Drop for AsyncRequest {
    fn drop(&mut self) {
        let pending = self.slot.lock().take();
        if pending.is_some() {
            if let Some(cancel) = self.on_cancel.take() {
                cancel();
            }
        }
    }
}

impl std::fmt::Debug for AsyncRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncRequest")
            .field("completed", &self.is_completed())
            .finish()
    }
}

/// The file source's half of a request.
pub struct Responder {
    slot: Slot,
}

impl Responder {
    /// Delivers `response`. Returns `false` if the request was cancelled.
    pub fn respond(self, response: Response) -> bool {
        let callback = self.slot.lock().take();
        match callback {
            Some(callback) => {
                callback(response);
                true
            }
            None => false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.slot.lock().is_none()
    }
}

impl std::fmt::Debug for Responder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Responder")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
