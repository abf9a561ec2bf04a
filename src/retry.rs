//! # Retry & Revalidation Policy
//!
//! Pure functions deciding *when* to try again:
//!
//! - [`RetryPolicy::error_retry_timeout`]: how long to wait after a failure,
//!   keyed by its [`Reason`] and the number of consecutive failures.
//! - [`RetryPolicy::expiration_timeout`]: how long a fresh resource may be
//!   used before it is revalidated.
//! - [`RetryPolicy::interpolate_expiration`]: repairs `expires` headers that
//!   are already in the past (clock skew, misconfigured origins).
//!
//! `None` means "never": the caller surfaces the result and stops.
//!
//! | Reason | Backoff |
//! |--------|---------|
//! | `Server` | 1s for attempts 1-3, then `2^(attempts-3)` s |
//! | `Connection` | `2^(attempts-1)` s from the first failure |
//! | `RateLimit` | `retry_after - now`, or the default rate limit timeout |
//! | anything else | never |

use crate::response::{Reason, Timestamp};
use std::time::Duration;

/// Wait used for rate-limited responses without a `Retry-After`.
pub const DEFAULT_RATE_LIMIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Minimum validity granted to a response whose `expires` lies in the past.
pub const CLOCK_SKEW_RETRY_TIMEOUT: Duration = Duration::from_secs(30);

/// Cap on backoff exponents, so `2^n` seconds always fits.
pub const MAX_BACKOFF_EXPONENT: u32 = 31;

/// Backoff parameters. The functions themselves hold no state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub rate_limit_timeout: Duration,
    pub clock_skew_retry_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            rate_limit_timeout: DEFAULT_RATE_LIMIT_TIMEOUT,
            clock_skew_retry_timeout: CLOCK_SKEW_RETRY_TIMEOUT,
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after `failed_attempts` consecutive failures,
    /// the latest of which was `reason`. `None` means do not retry.
    pub fn error_retry_timeout(
        &self,
        reason: Reason,
        failed_attempts: u32,
        retry_after: Option<Timestamp>,
        now: Timestamp,
    ) -> Option<Duration> {
        match reason {
            Reason::Server => {
                // Flat for the first three attempts, then doubling.
                let exponent = failed_attempts.saturating_sub(3);
                Some(exponential(exponent))
            }
            Reason::Connection => {
                let exponent = failed_attempts.saturating_sub(1);
                Some(exponential(exponent))
            }
            Reason::RateLimit => Some(match retry_after {
                Some(retry_after) => retry_after.duration_since(now).unwrap_or(Duration::ZERO),
                None => self.rate_limit_timeout,
            }),
            Reason::Success
            | Reason::NotFound
            | Reason::Canceled
            | Reason::Other => None,
        }
    }

    /// Delay before revalidating a successfully loaded resource.
    ///
    /// `expired_revalidations` counts consecutive responses that arrived
    /// already expired; those back off exponentially instead of hammering an
    /// origin that keeps serving stale data.
    pub fn expiration_timeout(
        &self,
        expires: Option<Timestamp>,
        expired_revalidations: u32,
        now: Timestamp,
    ) -> Option<Duration> {
        if expired_revalidations > 0 {
            return Some(exponential(expired_revalidations - 1));
        }
        expires.map(|expires| expires.duration_since(now).unwrap_or(Duration::ZERO))
    }

    /// Turns an `expires` value at or before `now` into a usable one.
    ///
    /// Returns the (possibly adjusted) expiry and whether the response must be
    /// counted as already expired.
    pub fn interpolate_expiration(
        &self,
        current: Timestamp,
        prior: Option<Timestamp>,
        now: Timestamp,
    ) -> (Timestamp, bool) {
        if current > now {
            return (current, false);
        }
        let Some(prior) = prior else {
            return (current, true);
        };

        // Going backwards, or the same expired value again: give up on
        // interpolation and let the caller back off.
        let delta = match current.duration_since(prior) {
            Ok(delta) if !delta.is_zero() => delta,
            _ => return (current, true),
        };

        // One of the clocks is wrong; grant at least the skew timeout.
        (now + delta.max(self.clock_skew_retry_timeout), false)
    }
}

fn exponential(exponent: u32) -> Duration {
    Duration::from_secs(1u64 << exponent.min(MAX_BACKOFF_EXPONENT))
}
