//! Persistent cache on the local filesystem.
//!
//! Each entry is two files named after the SHA-256 of the normalized URL:
//! `<hash>.json` holds the metadata, `<hash>.bin` the payload. Disk failures
//! are logged and degrade to a cache miss.

use super::{Cache, DEFAULT_MAXIMUM_ENTRY_SIZE};
use crate::error::Result;
use crate::resource::Resource;
use crate::response::{Response, Timestamp};
use parking_lot::{Condvar, Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};

#[derive(Debug, Serialize, Deserialize)]
struct Metadata {
    url: String,
    modified: Option<Timestamp>,
    expires: Option<Timestamp>,
    etag: Option<String>,
    must_revalidate: bool,
    inserted_at: Timestamp,
}

struct Inner {
    capacity: usize,
    max_entry_size: u64,
    /// Entry hashes from oldest to newest.
    order: VecDeque<String>,
    /// Hashes whose files are being read, written or deleted. An indexed hash
    /// is never busy outside a single critical section.
    busy: HashSet<String>,
}

/// A directory-backed response cache with take semantics.
///
/// The lock guards the index only. File I/O runs outside it, with each entry
/// claimed for the duration so operations on one URL never interleave.
pub struct FileCache {
    root: PathBuf,
    inner: Mutex<Inner>,
    released: Condvar,
}

/// An entry reserved for I/O. Dropping it wakes waiters on the same hash.
struct Claim<'a> {
    cache: &'a FileCache,
    hash: String,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        self.cache.inner.lock().busy.remove(&self.hash);
        self.cache.released.notify_all();
    }
}

impl FileCache {
    /// Opens (creating if needed) a cache under `root`, indexing any entries
    /// left by a previous run.
    pub fn open(root: impl Into<PathBuf>, capacity: usize) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;

        let mut existing = Vec::new();
        for dir_entry in fs::read_dir(&root)? {
            let path = dir_entry?.path();
            if path.extension().is_some_and(|ext| ext == "tmp") {
                let _ = fs::remove_file(&path);
                continue;
            }
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let Some(hash) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            match read_metadata(&path) {
                Ok(metadata) => existing.push((metadata.inserted_at, hash.to_owned())),
                Err(error) => warn!(path = %path.display(), %error, "Skipping unreadable cache entry"),
            }
        }
        existing.sort();

        let cache = Self {
            root,
            inner: Mutex::new(Inner {
                capacity,
                max_entry_size: DEFAULT_MAXIMUM_ENTRY_SIZE,
                order: existing.into_iter().map(|(_, hash)| hash).collect(),
                busy: HashSet::new(),
            }),
            released: Condvar::new(),
        };
        cache.set_capacity(capacity);
        info!(path = %cache.root.display(), entries = cache.size(), "File cache opened");
        Ok(cache)
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    fn metadata_path(&self, hash: &str) -> PathBuf {
        self.root.join(format!("{hash}.json"))
    }

    fn data_path(&self, hash: &str) -> PathBuf {
        self.root.join(format!("{hash}.bin"))
    }

    /// Waits until no one else works on `hash`, then reserves it.
    fn claim<'a>(&'a self, inner: &mut MutexGuard<'_, Inner>, hash: &str) -> Claim<'a> {
        while inner.busy.contains(hash) {
            self.released.wait(inner);
        }
        inner.busy.insert(hash.to_owned());
        Claim {
            cache: self,
            hash: hash.to_owned(),
        }
    }

    /// Pops the oldest entries above `capacity`, reserving them for deletion.
    fn take_overflow<'a>(
        &'a self,
        inner: &mut MutexGuard<'_, Inner>,
        capacity: usize,
    ) -> Vec<Claim<'a>> {
        let mut evicted = Vec::new();
        while inner.order.len() > capacity {
            let Some(hash) = inner.order.pop_front() else {
                break;
            };
            evicted.push(self.claim(inner, &hash));
        }
        evicted
    }

    fn load(&self, hash: &str) -> Result<Response> {
        let metadata = read_metadata(&self.metadata_path(hash))?;
        let data = fs::read(self.data_path(hash))?;
        Ok(Response {
            data: Some(data.into()),
            modified: metadata.modified,
            expires: metadata.expires,
            etag: metadata.etag,
            must_revalidate: metadata.must_revalidate,
            ..Response::default()
        })
    }

    /// Writes the payload, then the metadata that makes the entry visible on
    /// the next open. Both go through a temporary file and a rename.
    fn store(&self, hash: &str, resource: &Resource, response: &Response) -> Result<()> {
        let metadata = Metadata {
            url: resource.cache_key(),
            modified: response.modified,
            expires: response.expires,
            etag: response.etag.clone(),
            must_revalidate: response.must_revalidate,
            inserted_at: SystemTime::now(),
        };
        let data = response.data.as_deref().unwrap_or_default();
        write_atomically(&self.data_path(hash), data)?;
        write_atomically(&self.metadata_path(hash), &serde_json::to_vec(&metadata)?)?;
        Ok(())
    }

    fn delete(&self, hash: &str) {
        for path in [self.metadata_path(hash), self.data_path(hash)] {
            if let Err(error) = fs::remove_file(&path) {
                if error.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path.display(), %error, "Failed to delete cache file");
                }
            }
        }
    }

    fn evict(&self, evicted: Vec<Claim<'_>>) {
        for claim in evicted {
            self.delete(&claim.hash);
            debug!(entry = %claim.hash, "Evicted from file cache");
        }
    }
}

impl Cache for FileCache {
    fn get(&self, resource: &Resource) -> Option<Response> {
        let hash = key_hash(resource);
        let mut inner = self.inner.lock();
        let _claim = self.claim(&mut inner, &hash);
        let Some(position) = inner.order.iter().position(|h| *h == hash) else {
            // The claim locks on release.
            drop(inner);
            return None;
        };
        inner.order.remove(position);
        drop(inner);

        let loaded = self.load(&hash);
        self.delete(&hash);
        match loaded {
            Ok(response) => Some(response),
            Err(error) => {
                warn!(url = %resource.cache_key(), %error, "Failed to read cached response");
                None
            }
        }
    }

    fn put(&self, resource: &Resource, response: Response) {
        if !response.is_renderable() {
            return;
        }
        let hash = key_hash(resource);
        let mut inner = self.inner.lock();
        if inner.capacity == 0 || response.size() > inner.max_entry_size {
            return;
        }
        let _claim = self.claim(&mut inner, &hash);
        if let Some(position) = inner.order.iter().position(|h| *h == hash) {
            inner.order.remove(position);
        }
        drop(inner);

        if let Err(error) = self.store(&hash, resource, &response) {
            warn!(url = %resource.cache_key(), %error, "Failed to write cached response");
            self.delete(&hash);
            return;
        }

        let mut inner = self.inner.lock();
        inner.order.push_back(hash);
        let capacity = inner.capacity;
        let evicted = self.take_overflow(&mut inner, capacity);
        drop(inner);
        self.evict(evicted);
    }

    fn has(&self, resource: &Resource) -> bool {
        let hash = key_hash(resource);
        self.inner.lock().order.contains(&hash)
    }

    fn remove(&self, resource: &Resource) -> bool {
        let hash = key_hash(resource);
        let mut inner = self.inner.lock();
        let _claim = self.claim(&mut inner, &hash);
        let Some(position) = inner.order.iter().position(|h| *h == hash) else {
            drop(inner);
            return false;
        };
        inner.order.remove(position);
        drop(inner);
        self.delete(&hash);
        true
    }

    fn clear(&self) {
        let mut inner = self.inner.lock();
        let cleared = self.take_overflow(&mut inner, 0);
        drop(inner);
        for claim in cleared {
            self.delete(&claim.hash);
        }
    }

    fn set_capacity(&self, capacity: usize) {
        let mut inner = self.inner.lock();
        inner.capacity = capacity;
        let evicted = self.take_overflow(&mut inner, capacity);
        drop(inner);
        self.evict(evicted);
    }

    fn set_maximum_entry_size(&self, size: u64) {
        self.inner.lock().max_entry_size = size;
    }

    fn size(&self) -> usize {
        self.inner.lock().order.len()
    }

    fn performs_io(&self) -> bool {
        true
    }
}

fn key_hash(resource: &Resource) -> String {
    hex::encode(Sha256::digest(resource.cache_key()))
}

fn read_metadata(path: &Path) -> Result<Metadata> {
    Ok(serde_json::from_slice(&fs::read(path)?)?)
}

fn write_atomically(path: &Path, contents: &[u8]) -> Result<()> {
    let temp_path = path.with_extension(format!(
        "{}.tmp",
        path.extension().and_then(|ext| ext.to_str()).unwrap_or_default()
    ));
    fs::write(&temp_path, contents)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}
