//! Routes each request to the first source that accepts it.

use super::{AsyncRequest, Callback, FileSource};
use crate::resource::{sanitize_url, Resource};
use crate::response::{Reason, Response};
use std::sync::Arc;
use tracing::warn;

const UNSUPPORTED_MESSAGE: &str = "Unsupported resource request.";

/// A [`FileSource`] made of other sources, tried in insertion order.
///
/// Resources no source accepts fail at once with a terminal
/// [`Reason::Other`] error.
#[derive(Default)]
pub struct CompositeFileSource {
    sources: Vec<Arc<dyn FileSource>>,
}

impl CompositeFileSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source: Arc<dyn FileSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl FileSource for CompositeFileSource {
    fn can_request(&self, resource: &Resource) -> bool {
        self.sources.iter().any(|source| source.can_request(resource))
    }

    fn request(&self, resource: Resource, callback: Callback) -> AsyncRequest {
        if let Some(source) = self.sources.iter().find(|source| source.can_request(&resource)) {
            return source.request(resource, callback);
        }

        warn!(url = %sanitize_url(&resource.url), "Unsupported resource request");
        let (request, responder) = AsyncRequest::new(callback);
        responder.respond(Response::error(Reason::Other, UNSUPPORTED_MESSAGE));
        request
    }
}

impl std::fmt::Debug for CompositeFileSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeFileSource")
            .field("sources", &self.sources.len())
            .finish()
    }
}
