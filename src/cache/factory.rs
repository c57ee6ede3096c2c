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

//! Cache factory and the type-erased key/value plumbing behind it
//!
//! Factories are shared as `Arc<dyn ComputingCacheFactory>`, so they work on
//! erased keys ([`AnyKey`]) and values ([`AnyValue`]). Consumers never see the
//! erased types: [`create_cache`](trait.ComputingCacheFactory.html#method.create_cache)
//! hands back a [`TypedCache`] which converts on the way in and out.

use super::{
    CacheListener, CacheSettings, ComputingCache, ComputingFunction, ConcurrentComputingCache,
    RemovalCause,
};
use crate::error::{MustacheError, Result};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

/// Erased cache value
pub type AnyValue = Arc<dyn Any + Send + Sync>;

trait DynKey: Any + Send + Sync + fmt::Debug {
    fn as_any(&self) -> &dyn Any;
    fn dyn_eq(&self, other: &dyn DynKey) -> bool;
    fn dyn_hash(&self, state: &mut dyn Hasher);
}

impl<T> DynKey for T
where
    T: Hash + Eq + fmt::Debug + Send + Sync + 'static,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dyn_eq(&self, other: &dyn DynKey) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| other == self)
    }

    fn dyn_hash(&self, mut state: &mut dyn Hasher) {
        TypeId::of::<T>().hash(&mut state);
        self.hash(&mut state);
    }
}

/// Erased cache key
///
/// Two keys are equal only if they wrap values of the same type that compare
/// equal.
#[derive(Clone)]
pub struct AnyKey(Arc<dyn DynKey>);

impl AnyKey {
    /// Wrap a concrete key
    pub fn new<T>(key: T) -> Self
    where
        T: Hash + Eq + fmt::Debug + Send + Sync + 'static,
    {
        AnyKey(Arc::new(key))
    }

    /// Get the concrete key if it has the given type
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }
}

impl PartialEq for AnyKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.dyn_eq(other.0.as_ref())
    }
}

impl Eq for AnyKey {}

impl Hash for AnyKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.dyn_hash(state);
    }
}

impl fmt::Debug for AnyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Creates the computing caches used throughout the engine
///
/// `consumer_id` is a stable string naming the subsystem requesting the cache
/// (e.g. `stencil::engine::MustacheEngine`), so that implementations may apply
/// per-consumer policy. Components never construct caches directly.
pub trait ComputingCacheFactory: Send + Sync + fmt::Debug {
    /// Create a new cache over erased keys and values
    fn create(
        &self,
        consumer_id: &str,
        function: ComputingFunction<AnyKey, AnyValue>,
        settings: CacheSettings<AnyKey>,
    ) -> Box<dyn ComputingCache<AnyKey, AnyValue>>;
}

impl dyn ComputingCacheFactory {
    /// Create a typed cache for the given consumer
    pub fn create_cache<K, V, F>(
        &self,
        consumer_id: &str,
        function: F,
        settings: CacheSettings<K>,
    ) -> TypedCache<K, V>
    where
        K: Hash + Eq + Clone + fmt::Debug + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
        F: Fn(&K) -> Result<V> + Send + Sync + 'static,
    {
        log::debug!("Creating computing cache for consumer {consumer_id} ({settings:?})");

        let consumer = consumer_id.to_string();
        let erased_function: ComputingFunction<AnyKey, AnyValue> =
            Arc::new(move |key: &AnyKey| -> Result<AnyValue> {
                let key = key
                    .downcast_ref::<K>()
                    .ok_or_else(|| MustacheError::CacheTypeMismatch {
                        consumer_id: consumer.clone(),
                    })?;
                function(key).map(|value| Arc::new(value) as AnyValue)
            });

        let erased_listener = settings.listener.map(|listener| {
            Arc::new(move |key: &AnyKey, cause: RemovalCause| {
                if let Some(key) = key.downcast_ref::<K>() {
                    listener(key, cause);
                }
            }) as CacheListener<AnyKey>
        });

        let erased_settings = CacheSettings {
            expiration: settings.expiration,
            max_size: settings.max_size,
            listener: erased_listener,
        };

        TypedCache {
            consumer_id: consumer_id.to_string(),
            inner: self.create(consumer_id, erased_function, erased_settings),
            _marker: PhantomData,
        }
    }
}

/// Typed view over a cache created by a [`ComputingCacheFactory`]
pub struct TypedCache<K, V> {
    consumer_id: String,
    inner: Box<dyn ComputingCache<AnyKey, AnyValue>>,
    _marker: PhantomData<fn(&K) -> V>,
}

impl<K, V> TypedCache<K, V> {
    /// Consumer the cache was created for
    pub fn consumer_id(&self) -> &str {
        &self.consumer_id
    }
}

impl<K, V> ComputingCache<K, V> for TypedCache<K, V>
where
    K: Hash + Eq + Clone + fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, key: &K) -> Result<V> {
        let value = self.inner.get(&AnyKey::new(key.clone()))?;
        value
            .downcast_ref::<V>()
            .cloned()
            .ok_or_else(|| MustacheError::CacheTypeMismatch {
                consumer_id: self.consumer_id.clone(),
            })
    }

    fn get_if_present(&self, key: &K) -> Option<V> {
        self.inner
            .get_if_present(&AnyKey::new(key.clone()))
            .and_then(|value| value.downcast_ref::<V>().cloned())
    }

    fn get_all_present(&self) -> HashMap<K, V> {
        self.inner
            .get_all_present()
            .into_iter()
            .filter_map(|(key, value)| {
                let key = key.downcast_ref::<K>()?.clone();
                let value = value.downcast_ref::<V>()?.clone();
                Some((key, value))
            })
            .collect()
    }

    fn invalidate(&self, predicate: &dyn Fn(&K) -> bool) {
        self.inner
            .invalidate(&|key: &AnyKey| key.downcast_ref::<K>().is_some_and(predicate));
    }

    fn clear(&self) {
        self.inner.clear();
    }

    fn size(&self) -> usize {
        self.inner.size()
    }
}

impl<K, V> fmt::Debug for TypedCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedCache")
            .field("consumer_id", &self.consumer_id)
            .field("size", &self.inner.size())
            .finish()
    }
}

/// Factory producing in-process [`ConcurrentComputingCache`] instances
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultComputingCacheFactory;

impl ComputingCacheFactory for DefaultComputingCacheFactory {
    fn create(
        &self,
        consumer_id: &str,
        function: ComputingFunction<AnyKey, AnyValue>,
        settings: CacheSettings<AnyKey>,
    ) -> Box<dyn ComputingCache<AnyKey, AnyValue>> {
        log::trace!("Default factory serving consumer {consumer_id}");
        Box::new(ConcurrentComputingCache::new(function, settings))
    }
}
