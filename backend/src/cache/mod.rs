//! Source cache - reuse loaded tables for identical inputs.
//!
//! Entries are keyed by a [`Fingerprint`] of the source bytes and the
//! encoding candidate list, never by file name: the same name can carry
//! different uploaded bytes from one call to the next. Entries live for the
//! process; there is no eviction, only explicit invalidation.

use once_cell::sync::Lazy;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::LoadResult;
use crate::parser::{load_bytes, RawTable, Source};

/// SHA-256 over the source bytes and the candidate labels, hex encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of<S: AsRef<str>>(bytes: &[u8], encodings: &[S]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update((bytes.len() as u64).to_le_bytes());
        hasher.update(bytes);
        for label in encodings {
            hasher.update([0u8]);
            hasher.update(label.as_ref().as_bytes());
        }
        Fingerprint(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A table served by the cache.
#[derive(Debug, Clone)]
pub struct CachedTable {
    pub table: Arc<RawTable>,
    pub fingerprint: Fingerprint,
    /// Whether the table came from an earlier load.
    pub hit: bool,
}

/// In-memory table cache, one entry per distinct fingerprint.
#[derive(Debug, Default)]
pub struct SourceCache {
    entries: HashMap<Fingerprint, Arc<RawTable>>,
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached table for these bytes, loading it on a miss.
    ///
    /// Failed loads are not cached.
    pub fn get_or_load<S: AsRef<str>>(
        &mut self,
        name: &str,
        bytes: &[u8],
        encodings: &[S],
    ) -> LoadResult<CachedTable> {
        let fingerprint = Fingerprint::of(bytes, encodings);

        if let Some(table) = self.entries.get(&fingerprint) {
            log::debug!("cache hit for {} ({})", name, fingerprint);
            return Ok(CachedTable { table: Arc::clone(table), fingerprint, hit: true });
        }

        let table = Arc::new(load_bytes(bytes, name, encodings)?);
        self.entries.insert(fingerprint.clone(), Arc::clone(&table));
        log::debug!("cached {} ({})", name, fingerprint);

        Ok(CachedTable { table, fingerprint, hit: false })
    }

    pub fn get(&self, fingerprint: &Fingerprint) -> Option<Arc<RawTable>> {
        self.entries.get(fingerprint).cloned()
    }

    /// Drop one entry. Returns whether it existed.
    pub fn invalidate(&mut self, fingerprint: &Fingerprint) -> bool {
        self.entries.remove(fingerprint).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

static GLOBAL_CACHE: Lazy<Mutex<SourceCache>> = Lazy::new(|| Mutex::new(SourceCache::new()));

/// Run `f` with the process-wide cache locked.
pub fn with_global<T>(f: impl FnOnce(&mut SourceCache) -> T) -> T {
    // A panic while holding the lock cannot leave a half-written entry.
    let mut cache = GLOBAL_CACHE.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    f(&mut cache)
}

/// Load `source` through the process-wide cache.
pub fn load_cached<S: AsRef<str>>(source: &Source, encodings: &[S]) -> LoadResult<CachedTable> {
    let bytes = source.read_bytes()?;
    with_global(|cache| cache.get_or_load(&source.name(), &bytes, encodings))
}
