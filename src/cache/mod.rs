//! # Caches
//!
//! Bounded stores of renderable [`Response`]s keyed by [`Resource`].
//!
//! All caches share the same *take* semantics: [`Cache::get`] removes the
//! entry it returns, so a cached buffer is handed to exactly one consumer.
//! Use [`Cache::has`] to check for presence without consuming.
//!
//! - [`ResourceCache`]: in-memory, LRU-ordered.
//! - [`FileCache`]: persistent, one metadata file plus one blob per entry.
//! - [`LayeredCache`]: a memory cache in front of a persistent one.

mod file;
mod layered;
mod memory;

pub use file::FileCache;
pub use layered::LayeredCache;
pub use memory::{CacheEntry, ResourceCache};

use crate::resource::Resource;
use crate::response::Response;

/// Largest payload stored by default (50 MiB).
pub const DEFAULT_MAXIMUM_ENTRY_SIZE: u64 = 50 * 1024 * 1024;

/// Entry count used when no capacity is configured.
pub const DEFAULT_CAPACITY: usize = 512;

/// A bounded response store. Implementations serialize access internally.
pub trait Cache: Send + Sync {
    /// Removes and returns the entry for `resource`.
    fn get(&self, resource: &Resource) -> Option<Response>;

    /// Stores `response` if it is renderable and within the entry size limit.
    fn put(&self, resource: &Resource, response: Response);

    fn has(&self, resource: &Resource) -> bool;

    /// Drops the entry for `resource`, if any.
    fn remove(&self, resource: &Resource) -> bool;

    fn clear(&self);

    /// Evicts oldest entries until at most `capacity` remain.
    fn set_capacity(&self, capacity: usize);

    /// Responses larger than `size` bytes are no longer stored.
    fn set_maximum_entry_size(&self, size: u64);

    fn size(&self) -> usize;

    /// Whether `get` and `put` touch the disk. Callers on worker threads move
    /// such calls to the blocking pool.
    fn performs_io(&self) -> bool {
        false
    }
}
