//! # Responses
//!
//! The outcome of one load attempt. A [`Response`] either carries data or a
//! [`ResponseError`], plus the caching metadata the origin supplied.
//!
//! Payloads are [`Bytes`], so cloning a response shares the buffer instead of
//! copying it.

use bytes::Bytes;
use std::fmt;
use std::time::SystemTime;

/// Wall-clock instant used for caching metadata.
pub type Timestamp = SystemTime;

/// Failure classification. Drives the retry policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Reason {
    Success,
    NotFound,
    Server,
    Connection,
    RateLimit,
    Canceled,
    Other,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Reason::Success => "success",
            Reason::NotFound => "not found",
            Reason::Server => "server error",
            Reason::Connection => "connection error",
            Reason::RateLimit => "rate limited",
            Reason::Canceled => "canceled",
            Reason::Other => "error",
        };
        f.write_str(name)
    }
}

/// A failed load.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{reason}: {message}")]
pub struct ResponseError {
    pub reason: Reason,
    pub message: String,
    /// Server-supplied earliest retry time (rate limiting).
    pub retry_after: Option<Timestamp>,
}

impl ResponseError {
    pub fn new(reason: Reason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn with_retry_after(mut self, retry_after: Timestamp) -> Self {
        self.retry_after = Some(retry_after);
        self
    }
}

/// The result of a single load attempt.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Response {
    pub data: Option<Bytes>,
    pub error: Option<ResponseError>,
    pub modified: Option<Timestamp>,
    pub expires: Option<Timestamp>,
    pub etag: Option<String>,
    pub must_revalidate: bool,
    /// The origin confirmed the prior copy is still current (HTTP 304).
    pub not_modified: bool,
}

impl Response {
    /// A successful response carrying `data`.
    pub fn with_data(data: impl Into<Bytes>) -> Self {
        Self {
            data: Some(data.into()),
            ..Self::default()
        }
    }

    /// A failed response.
    pub fn from_error(error: ResponseError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    pub fn error(reason: Reason, message: impl Into<String>) -> Self {
        Self::from_error(ResponseError::new(reason, message))
    }

    pub fn not_modified() -> Self {
        Self {
            not_modified: true,
            ..Self::default()
        }
    }

    pub fn expires_at(mut self, expires: Timestamp) -> Self {
        self.expires = Some(expires);
        self
    }

    pub fn modified_at(mut self, modified: Timestamp) -> Self {
        self.modified = Some(modified);
        self
    }

    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    /// Has usable payload and no error.
    pub fn is_renderable(&self) -> bool {
        self.error.is_none() && self.data.is_some()
    }

    /// Whether the response is still fresh at `now`. Responses without
    /// expiry metadata are fresh until proven otherwise.
    pub fn is_fresh(&self, now: Timestamp) -> bool {
        !self.must_revalidate && self.expires.is_none_or(|expires| expires > now)
    }

    /// Whether a cached copy may be shown while it is revalidated. Only
    /// `must-revalidate` responses past their expiry are held back.
    pub fn is_usable(&self, now: Timestamp) -> bool {
        !self.must_revalidate || self.expires.is_some_and(|expires| expires > now)
    }

    /// Size of the payload in bytes.
    pub fn size(&self) -> u64 {
        self.data.as_ref().map_or(0, |data| data.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_renderable_requires_data_and_no_error() {
        assert!(Response::with_data("abc").is_renderable());
        assert!(!Response::default().is_renderable());
        assert!(!Response::error(Reason::NotFound, "gone").is_renderable());

        let mut both = Response::with_data("abc");
        both.error = Some(ResponseError::new(Reason::Server, "500"));
        assert!(!both.is_renderable());
    }

    #[test]
    fn test_freshness() {
        let now = SystemTime::now();
        let response = Response::with_data("abc");
        assert!(response.is_fresh(now));
        assert!(response.clone().expires_at(now + Duration::from_secs(1)).is_fresh(now));
        assert!(!response.clone().expires_at(now).is_fresh(now));

        let mut revalidate = response.expires_at(now + Duration::from_secs(60));
        revalidate.must_revalidate = true;
        assert!(!revalidate.is_fresh(now));
    }

    #[test]
    fn test_stale_copies_stay_usable_unless_revalidation_is_mandatory() {
        let now = SystemTime::now();
        let stale = Response::with_data("abc").expires_at(now - Duration::from_secs(10));
        assert!(!stale.is_fresh(now));
        assert!(stale.is_usable(now));

        let mut mandatory = stale.clone();
        mandatory.must_revalidate = true;
        assert!(!mandatory.is_usable(now));

        mandatory.expires = Some(now + Duration::from_secs(10));
        assert!(mandatory.is_usable(now));
    }

    #[test]
    fn test_error_display() {
        let error = ResponseError::new(Reason::NotFound, "HTTP status code 404");
        assert_eq!(error.to_string(), "not found: HTTP status code 404");
    }
}
