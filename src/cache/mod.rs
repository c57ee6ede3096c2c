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

//! Computing caches
//!
//! A computing cache memoizes the result of a computing function per key. Every
//! cache in the engine (resolver metadata, compiled templates, template sources)
//! is obtained through a [`ComputingCacheFactory`] so that a single pluggable
//! implementation backs all of them.

mod concurrent;
mod factory;

pub use concurrent::ConcurrentComputingCache;
pub use factory::{AnyKey, AnyValue, ComputingCacheFactory, DefaultComputingCacheFactory, TypedCache};

use crate::error::Result;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

/// Function computing the value for a missing key
pub type ComputingFunction<K, V> = Arc<dyn Fn(&K) -> Result<V> + Send + Sync>;

/// Listener notified once for every entry removed from a cache
pub type CacheListener<K> = Arc<dyn Fn(&K, RemovalCause) + Send + Sync>;

/// Reason an entry left the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemovalCause {
    /// Evicted because the cache exceeded its maximum size
    Size,
    /// Found expired on access
    Expired,
    /// Removed by `invalidate` or `clear`
    Explicit,
}

/// A thread-safe memoizing map
///
/// The computing function of a given key never runs more than once
/// concurrently: callers requesting the same missing key wait for the
/// in-flight computation and observe its result.
pub trait ComputingCache<K, V>: Send + Sync
where
    K: Hash + Eq,
{
    /// Get the value for the key, computing and storing it if absent
    fn get(&self, key: &K) -> Result<V>;

    /// Get the value for the key without triggering a computation
    fn get_if_present(&self, key: &K) -> Option<V>;

    /// Independent snapshot of all live entries
    fn get_all_present(&self) -> HashMap<K, V>;

    /// Remove every entry whose key matches the predicate
    fn invalidate(&self, predicate: &dyn Fn(&K) -> bool);

    /// Remove all entries
    fn clear(&self);

    /// Number of live entries
    fn size(&self) -> usize;
}

/// Construction-time settings of a computing cache
pub struct CacheSettings<K> {
    /// Entries older than this are treated as absent
    pub expiration: Option<Duration>,
    /// Maximum number of entries, least recently used entries are evicted first
    pub max_size: Option<usize>,
    /// Notified for every removed entry
    pub listener: Option<CacheListener<K>>,
}

impl<K> CacheSettings<K> {
    /// Settings with no expiration, no size bound and no listener
    pub fn new() -> Self {
        Self {
            expiration: None,
            max_size: None,
            listener: None,
        }
    }

    /// Expire entries the given time after they were stored
    pub fn expire_after(mut self, timeout: Duration) -> Self {
        self.expiration = Some(timeout);
        self
    }

    /// Bound the number of entries
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = Some(max_size);
        self
    }

    /// Install a removal listener
    pub fn listener<F>(mut self, listener: F) -> Self
    where
        F: Fn(&K, RemovalCause) + Send + Sync + 'static,
    {
        self.listener = Some(Arc::new(listener));
        self
    }
}

impl<K> Default for CacheSettings<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Clone for CacheSettings<K> {
    fn clone(&self) -> Self {
        Self {
            expiration: self.expiration,
            max_size: self.max_size,
            listener: self.listener.clone(),
        }
    }
}

impl<K> fmt::Debug for CacheSettings<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheSettings")
            .field("expiration", &self.expiration)
            .field("max_size", &self.max_size)
            .field("listener", &self.listener.is_some())
            .finish()
    }
}
