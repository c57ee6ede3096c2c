// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! In-process computing cache with LRU eviction and lazy expiration

use super::{CacheListener, CacheSettings, ComputingCache, ComputingFunction, RemovalCause};
use crate::error::{MustacheError, Result};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use lru::LruCache;
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A stored value with its insertion time
struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
}

impl<V> CacheEntry<V> {
    fn new(value: V) -> Self {
        Self {
            value,
            stored_at: Instant::now(),
        }
    }

    fn is_expired(&self, expiration: Option<Duration>) -> bool {
        expiration.is_some_and(|timeout| self.stored_at.elapsed() > timeout)
    }
}

/// Result slot shared by the leader computing a key and every waiter
struct InFlight<V> {
    result: Mutex<Option<Result<V>>>,
    ready: Condvar,
}

impl<V: Clone> InFlight<V> {
    fn new() -> Self {
        Self {
            result: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    fn complete(&self, result: Result<V>) {
        let mut slot = self.result.lock();
        *slot = Some(result);
        self.ready.notify_all();
    }

    fn wait(&self) -> Result<V> {
        let mut slot = self.result.lock();
        loop {
            if let Some(result) = slot.as_ref() {
                return result.clone();
            }
            self.ready.wait(&mut slot);
        }
    }
}

/// Default computing cache
///
/// Entries live in a mutex-guarded [`LruCache`]; in-flight computations are
/// tracked per key in a [`DashMap`] so that only one thread runs the computing
/// function for a key while the others wait on its result. The computing
/// function runs without any cache lock held, so it may query the same cache
/// for *other* keys.
///
/// # Examples
///
/// ```rust
/// use stencil::cache::{CacheSettings, ComputingCache, ConcurrentComputingCache};
///
/// let cache = ConcurrentComputingCache::from_fn(
///     |key: &String| Ok(key.len()),
///     CacheSettings::new().max_size(100),
/// );
///
/// assert_eq!(cache.get(&"hello".to_string()).unwrap(), 5);
/// assert_eq!(cache.size(), 1);
/// ```
pub struct ConcurrentComputingCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    function: ComputingFunction<K, V>,
    entries: Mutex<LruCache<K, CacheEntry<V>>>,
    in_flight: DashMap<K, Arc<InFlight<V>>>,
    expiration: Option<Duration>,
    max_size: Option<usize>,
    listener: Option<CacheListener<K>>,
}

impl<K, V> ConcurrentComputingCache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    /// Create a new cache around the computing function
    ///
    /// A maximum size of zero disables storage: every `get` computes.
    pub fn new(function: ComputingFunction<K, V>, settings: CacheSettings<K>) -> Self {
        let entries = match settings.max_size.and_then(NonZeroUsize::new) {
            Some(capacity) => LruCache::new(capacity),
            None => LruCache::unbounded(),
        };

        Self {
            function,
            entries: Mutex::new(entries),
            in_flight: DashMap::new(),
            expiration: settings.expiration,
            max_size: settings.max_size,
            listener: settings.listener,
        }
    }

    /// Create a new cache from a closure
    pub fn from_fn<F>(function: F, settings: CacheSettings<K>) -> Self
    where
        F: Fn(&K) -> Result<V> + Send + Sync + 'static,
    {
        Self::new(Arc::new(function), settings)
    }

    fn lookup(&self, key: &K) -> Option<V> {
        let expired = {
            let mut entries = self.entries.lock();
            let state = entries.get(key).map(|entry| {
                if entry.is_expired(self.expiration) {
                    None
                } else {
                    Some(entry.value.clone())
                }
            });
            match state {
                Some(Some(value)) => return Some(value),
                Some(None) => {
                    entries.pop(key);
                    true
                }
                None => false,
            }
        };

        if expired {
            self.notify(key, RemovalCause::Expired);
        }
        None
    }

    fn store(&self, key: K, value: V) {
        if self.max_size == Some(0) {
            return;
        }
        let evicted = {
            let mut entries = self.entries.lock();
            entries
                .push(key.clone(), CacheEntry::new(value))
                .and_then(|(old_key, _)| (old_key != key).then_some(old_key))
        };
        if let Some(evicted) = evicted {
            self.notify(&evicted, RemovalCause::Size);
        }
    }

    fn purge_expired(&self, entries: &mut LruCache<K, CacheEntry<V>>) -> Vec<K> {
        if self.expiration.is_none() {
            return Vec::new();
        }
        let expired: Vec<K> = entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(self.expiration))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            entries.pop(key);
        }
        expired
    }

    fn notify(&self, key: &K, cause: RemovalCause) {
        if let Some(listener) = &self.listener {
            listener(key, cause);
        }
    }

    fn notify_all(&self, keys: &[K], cause: RemovalCause) {
        for key in keys {
            self.notify(key, cause);
        }
    }
}

/// Completes the in-flight slot even if the computing function panics
struct FlightGuard<'a, K, V>
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    cache: &'a ConcurrentComputingCache<K, V>,
    key: &'a K,
    flight: &'a Arc<InFlight<V>>,
    completed: bool,
}

impl<K, V> FlightGuard<'_, K, V>
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn complete(&mut self, result: Result<V>) {
        self.completed = true;
        self.flight.complete(result);
        self.cache
            .in_flight
            .remove_if(self.key, |_, flight| Arc::ptr_eq(flight, self.flight));
    }
}

impl<K, V> Drop for FlightGuard<'_, K, V>
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn drop(&mut self) {
        if !self.completed {
            self.complete(Err(MustacheError::CacheComputation {
                message: "computing function panicked".to_string(),
            }));
        }
    }
}

impl<K, V> ComputingCache<K, V> for ConcurrentComputingCache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn get(&self, key: &K) -> Result<V> {
        if let Some(value) = self.lookup(key) {
            return Ok(value);
        }

        let (flight, leader) = match self.in_flight.entry(key.clone()) {
            Entry::Occupied(entry) => (Arc::clone(entry.get()), false),
            Entry::Vacant(entry) => {
                let flight = Arc::new(InFlight::new());
                entry.insert(Arc::clone(&flight));
                (flight, true)
            }
        };

        if !leader {
            return flight.wait();
        }

        let mut guard = FlightGuard {
            cache: self,
            key,
            flight: &flight,
            completed: false,
        };

        // Another leader may have stored the value between our miss and our claim
        let result = match self.lookup(key) {
            Some(value) => Ok(value),
            None => match (self.function)(key) {
                Ok(value) => {
                    self.store(key.clone(), value.clone());
                    Ok(value)
                }
                Err(err) => {
                    log::warn!("Computing function failed: {err}");
                    Err(err)
                }
            },
        };

        guard.complete(result.clone());
        result
    }

    fn get_if_present(&self, key: &K) -> Option<V> {
        self.lookup(key)
    }

    fn get_all_present(&self) -> HashMap<K, V> {
        let (snapshot, expired) = {
            let mut entries = self.entries.lock();
            let expired = self.purge_expired(&mut entries);
            let snapshot = entries
                .iter()
                .map(|(key, entry)| (key.clone(), entry.value.clone()))
                .collect();
            (snapshot, expired)
        };
        self.notify_all(&expired, RemovalCause::Expired);
        snapshot
    }

    fn invalidate(&self, predicate: &dyn Fn(&K) -> bool) {
        let removed: Vec<K> = {
            let mut entries = self.entries.lock();
            let keys: Vec<K> = entries
                .iter()
                .filter(|(key, _)| predicate(key))
                .map(|(key, _)| key.clone())
                .collect();
            for key in &keys {
                entries.pop(key);
            }
            keys
        };
        self.notify_all(&removed, RemovalCause::Explicit);
    }

    fn clear(&self) {
        let removed: Vec<K> = {
            let mut entries = self.entries.lock();
            let mut keys = Vec::with_capacity(entries.len());
            while let Some((key, _)) = entries.pop_lru() {
                keys.push(key);
            }
            keys
        };
        self.notify_all(&removed, RemovalCause::Explicit);
    }

    fn size(&self) -> usize {
        let (size, expired) = {
            let mut entries = self.entries.lock();
            let expired = self.purge_expired(&mut entries);
            (entries.len(), expired)
        };
        self.notify_all(&expired, RemovalCause::Expired);
        size
    }
}

impl<K, V> fmt::Debug for ConcurrentComputingCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrentComputingCache")
            .field("len", &self.entries.lock().len())
            .field("in_flight", &self.in_flight.len())
            .field("expiration", &self.expiration)
            .field("max_size", &self.max_size)
            .finish()
    }
}
