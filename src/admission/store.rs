//! Bucket storage

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::{AdmissionError, Bucket};

/// Keyed bucket storage used by the admission check.
///
/// `update` must run `apply` atomically with respect to other updates of the
/// same key. Different keys need not be serialized against each other.
pub trait BucketStore: Send + Sync {
    /// Read-modify-write the bucket for `key`.
    ///
    /// `apply` receives the stored bucket (`None` on first sighting of the key)
    /// and returns the bucket to persist, which is also returned to the caller.
    fn update(
        &self,
        key: &str,
        apply: &mut dyn FnMut(Option<Bucket>) -> Bucket,
    ) -> Result<Bucket, AdmissionError>;

    /// Number of callers currently tracked
    fn tracked_callers(&self) -> usize;
}

/// Process-local store backed by a sharded concurrent map.
///
/// Entries are never evicted, so the map grows with the number of distinct
/// caller keys for the lifetime of the process.
#[derive(Debug, Default)]
pub struct InMemoryBucketStore {
    buckets: DashMap<String, Bucket>,
}

impl InMemoryBucketStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a caller's bucket
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Bucket> {
        self.buckets.get(key).map(|b| *b)
    }
}

impl BucketStore for InMemoryBucketStore {
    fn update(
        &self,
        key: &str,
        apply: &mut dyn FnMut(Option<Bucket>) -> Bucket,
    ) -> Result<Bucket, AdmissionError> {
        // The shard write lock is held for the whole read-modify-write.
        if let Some(mut stored) = self.buckets.get_mut(key) {
            let next = apply(Some(*stored));
            *stored = next;
            return Ok(next);
        }

        match self.buckets.entry(key.to_owned()) {
            Entry::Occupied(mut entry) => {
                let next = apply(Some(*entry.get()));
                entry.insert(next);
                Ok(next)
            }
            Entry::Vacant(entry) => {
                let next = apply(None);
                entry.insert(next);
                Ok(next)
            }
        }
    }

    fn tracked_callers(&self) -> usize {
        self.buckets.len()
    }
}
