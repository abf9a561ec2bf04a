//! Resources read from the local filesystem.
//!
//! `file://` URLs name absolute paths. `asset://` URLs are relative to an
//! asset root fixed at construction and may not escape it.

use super::{AsyncRequest, Callback, FileSource};
use crate::resource::Resource;
use crate::response::{Reason, Response};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::runtime::Handle;
use tracing::{debug, instrument};
use url::Url;

pub const ASSET_PROTOCOL: &str = "asset://";
pub const FILE_PROTOCOL: &str = "file://";

#[derive(Debug)]
enum Root {
    Files,
    Assets(PathBuf),
}

/// Reads `file://` or `asset://` resources with `tokio::fs`. Dropping the
/// request aborts the read.
#[derive(Debug)]
pub struct LocalFileSource {
    runtime: Handle,
    root: Root,
}

impl LocalFileSource {
    /// Serves `file://` URLs.
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            root: Root::Files,
        }
    }

    /// Serves `asset://` URLs from files under `root`.
    pub fn assets(runtime: Handle, root: impl Into<PathBuf>) -> Self {
        Self {
            runtime,
            root: Root::Assets(root.into()),
        }
    }

    fn protocol(&self) -> &'static str {
        match self.root {
            Root::Files => FILE_PROTOCOL,
            Root::Assets(_) => ASSET_PROTOCOL,
        }
    }

    fn resolve(&self, url: &str) -> Option<PathBuf> {
        match &self.root {
            Root::Files => Url::parse(url).ok()?.to_file_path().ok(),
            Root::Assets(root) => {
                let relative = url.strip_prefix(ASSET_PROTOCOL)?;
                let relative = relative.split(['?', '#']).next().unwrap_or_default();
                let relative = Path::new(relative);
                let contained = relative
                    .components()
                    .all(|component| matches!(component, Component::Normal(_)));
                (contained && !relative.as_os_str().is_empty()).then(|| root.join(relative))
            }
        }
    }
}

impl FileSource for LocalFileSource {
    fn can_request(&self, resource: &Resource) -> bool {
        resource.url.starts_with(self.protocol())
    }

    #[instrument(skip_all, fields(url = %resource.url))]
    fn request(&self, resource: Resource, callback: Callback) -> AsyncRequest {
        let (request, responder) = AsyncRequest::new(callback);
        let Some(path) = self.resolve(&resource.url) else {
            responder.respond(Response::error(
                Reason::Other,
                format!("Invalid local URL: {}", resource.url),
            ));
            return request;
        };

        let task = self.runtime.spawn(async move {
            let response = read(&path).await;
            responder.respond(response);
        });
        request.on_cancel(move || task.abort())
    }
}

async fn read(path: &Path) -> Response {
    match tokio::fs::read(path).await {
        Ok(data) => Response::with_data(data),
        Err(error) if error.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "Local file not found");
            Response::error(Reason::NotFound, format!("{} not found", path.display()))
        }
        Err(error) => Response::error(Reason::Other, error.to_string()),
    }
}
