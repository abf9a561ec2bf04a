//! # Resources
//!
//! A [`Resource`] describes *what* to load: a URL plus the kind of asset it
//! names. It doubles as the cache key and as the unit of network work.
//!
//! Two resources are equal iff their URLs are equal. The remaining fields are
//! request metadata: scheduling priority and what is already known about a
//! previous copy (used for conditional revalidation).

use crate::response::Timestamp;
use bytes::Bytes;
use std::hash::{Hash, Hasher};
use url::Url;

/// The kind of asset a resource names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Style,
    Source,
    Tile,
    Glyphs,
    SpriteJson,
    SpriteImage,
    Image,
}

/// Network scheduling class. `Low` requests only run when no `Regular`
/// request is waiting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Priority {
    #[default]
    Regular,
    Low,
}

/// A loadable resource.
#[derive(Clone, Debug)]
pub struct Resource {
    pub url: String,
    pub kind: ResourceKind,
    pub priority: Priority,
    pub prior_modified: Option<Timestamp>,
    pub prior_expires: Option<Timestamp>,
    pub prior_etag: Option<String>,
    pub prior_data: Option<Bytes>,
}

impl Resource {
    pub fn new(kind: ResourceKind, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind,
            priority: Priority::Regular,
            prior_modified: None,
            prior_expires: None,
            prior_etag: None,
            prior_data: None,
        }
    }

    pub fn style(url: impl Into<String>) -> Self {
        Self::new(ResourceKind::Style, url)
    }

    pub fn source(url: impl Into<String>) -> Self {
        Self::new(ResourceKind::Source, url)
    }

    pub fn tile(url: impl Into<String>) -> Self {
        Self::new(ResourceKind::Tile, url)
    }

    pub fn glyphs(url: impl Into<String>) -> Self {
        Self::new(ResourceKind::Glyphs, url)
    }

    pub fn sprite_json(url: impl Into<String>) -> Self {
        Self::new(ResourceKind::SpriteJson, url)
    }

    pub fn sprite_image(url: impl Into<String>) -> Self {
        Self::new(ResourceKind::SpriteImage, url)
    }

    pub fn image(url: impl Into<String>) -> Self {
        Self::new(ResourceKind::Image, url)
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// The key this resource is stored under in caches.
    pub fn cache_key(&self) -> String {
        normalize_url(&self.url)
    }

    /// Whether the request can be answered with "not modified".
    pub fn is_conditional(&self) -> bool {
        self.prior_etag.is_some() || self.prior_modified.is_some()
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

impl Eq for Resource {}

impl Hash for Resource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.url.hash(state);
    }
}

/// Normalizes a URL for use as a cache key by dropping the `access_token`
/// query parameter. URLs that don't parse, or carry no token, are returned
/// unchanged.
pub fn normalize_url(raw: &str) -> String {
    let Ok(mut url) = Url::parse(raw) else {
        return raw.to_owned();
    };
    if !url.query_pairs().any(|(key, _)| key == "access_token") {
        return raw.to_owned();
    }

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "access_token")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }
    url.into()
}

/// The URL without its query string, for logging.
pub(crate) fn sanitize_url(url: &str) -> &str {
    url.split_once('?').map_or(url, |(base, _)| base)
}
