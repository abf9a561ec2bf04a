//! A memory cache in front of a persistent one.

use super::Cache;
use crate::resource::Resource;
use crate::response::Response;
use std::sync::Arc;

/// Two caches composed: `front` is consulted first, `back` on a miss.
///
/// Writes go to both layers. A `get` takes the entry out of both, so the
/// at-most-one-consumer rule holds across layers.
pub struct LayeredCache {
    front: Arc<dyn Cache>,
    back: Arc<dyn Cache>,
}

impl LayeredCache {
    pub fn new(front: Arc<dyn Cache>, back: Arc<dyn Cache>) -> Self {
        Self { front, back }
    }
}

impl Cache for LayeredCache {
    fn get(&self, resource: &Resource) -> Option<Response> {
        match self.front.get(resource) {
            Some(response) => {
                self.back.remove(resource);
                Some(response)
            }
            None => self.back.get(resource),
        }
    }

    fn put(&self, resource: &Resource, response: Response) {
        self.front.put(resource, response.clone());
        self.back.put(resource, response);
    }

    fn has(&self, resource: &Resource) -> bool {
        self.front.has(resource) || self.back.has(resource)
    }

    fn remove(&self, resource: &Resource) -> bool {
        let front = self.front.remove(resource);
        let back = self.back.remove(resource);
        front || back
    }

    fn clear(&self) {
        self.front.clear();
        self.back.clear();
    }

    fn set_capacity(&self, capacity: usize) {
        self.front.set_capacity(capacity);
        self.back.set_capacity(capacity);
    }

    fn set_maximum_entry_size(&self, size: u64) {
        self.front.set_maximum_entry_size(size);
        self.back.set_maximum_entry_size(size);
    }

    /// Entries in the larger layer.
    fn size(&self) -> usize {
        self.front.size().max(self.back.size())
    }

    fn performs_io(&self) -> bool {
        self.front.performs_io() || self.back.performs_io()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{FileCache, ResourceCache};

    #[test]
    fn test_memory_miss_falls_back_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let memory = Arc::new(ResourceCache::new(1));
        let disk = Arc::new(FileCache::open(dir.path(), 10).unwrap());
        let cache = LayeredCache::new(memory.clone(), disk.clone());

        let first = Resource::tile("tile://0/0/0");
        let second = Resource::tile("tile://0/0/1");
        cache.put(&first, Response::with_data("a"));
        cache.put(&second, Response::with_data("b"));

        // Evicted from memory, still on disk.
        assert!(!memory.has(&first));
        assert!(cache.has(&first));
        assert_eq!(cache.get(&first).unwrap().data.unwrap(), "a");
        assert!(!cache.has(&first));
    }

    #[test]
    fn test_memory_hit_consumes_disk_copy() {
        let dir = tempfile::tempdir().unwrap();
        let disk = Arc::new(FileCache::open(dir.path(), 10).unwrap());
        let cache = LayeredCache::new(Arc::new(ResourceCache::new(10)), disk.clone());
        let tile = Resource::tile("tile://1/2/3");

        assert!(cache.performs_io());
        cache.put(&tile, Response::with_data("abc"));
        assert!(cache.get(&tile).is_some());
        assert!(!disk.has(&tile));
        assert!(cache.get(&tile).is_none());
    }
}
