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

//! Engine caches obtained through a custom cache factory

mod utils;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use stencil::cache::{
    AnyKey, AnyValue, CacheSettings, ComputingCache, ComputingCacheFactory, ComputingFunction,
    DefaultComputingCacheFactory,
};
use stencil::engine::{
    COMPUTING_CACHE_CONSUMER_ID as ENGINE_CONSUMER, MapTemplateLocator, MustacheEngineBuilder,
};
use stencil::model::Value;
use stencil::resolver::reflection::COMPUTING_CACHE_CONSUMER_ID as REFLECTION_CONSUMER;
use stencil::{EngineConfig, Result};
use std::collections::HashMap;
use std::sync::Arc;
use utils::Hammer;

/// Plain map without single-flight, size bound or expiration
struct CustomComputingCache {
    map: Mutex<HashMap<AnyKey, AnyValue>>,
    function: ComputingFunction<AnyKey, AnyValue>,
}

impl CustomComputingCache {
    fn size(&self) -> usize {
        self.map.lock().len()
    }

    fn clear(&self) {
        self.map.lock().clear();
    }
}

struct CacheHandle(Arc<CustomComputingCache>);

impl ComputingCache<AnyKey, AnyValue> for CacheHandle {
    fn get(&self, key: &AnyKey) -> Result<AnyValue> {
        let mut map = self.0.map.lock();
        if let Some(value) = map.get(key) {
            return Ok(Arc::clone(value));
        }
        let value = (self.0.function)(key)?;
        map.insert(key.clone(), Arc::clone(&value));
        Ok(value)
    }

    fn get_if_present(&self, key: &AnyKey) -> Option<AnyValue> {
        self.0.map.lock().get(key).cloned()
    }

    fn get_all_present(&self) -> HashMap<AnyKey, AnyValue> {
        self.0.map.lock().clone()
    }

    fn invalidate(&self, predicate: &dyn Fn(&AnyKey) -> bool) {
        self.0.map.lock().retain(|key, _| !predicate(key));
    }

    fn clear(&self) {
        self.0.clear();
    }

    fn size(&self) -> usize {
        self.0.size()
    }
}

#[derive(Debug, Default)]
struct CustomFactory {
    caches: Mutex<Vec<(String, Arc<CustomComputingCache>)>>,
}

impl std::fmt::Debug for CustomComputingCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomComputingCache").field("size", &self.size()).finish()
    }
}

impl CustomFactory {
    fn caches_of(&self, consumer_id: &str) -> Vec<Arc<CustomComputingCache>> {
        self.caches
            .lock()
            .iter()
            .filter(|(id, _)| id == consumer_id)
            .map(|(_, cache)| Arc::clone(cache))
            .collect()
    }
}

impl ComputingCacheFactory for CustomFactory {
    fn create(
        &self,
        consumer_id: &str,
        function: ComputingFunction<AnyKey, AnyValue>,
        _settings: CacheSettings<AnyKey>,
    ) -> Box<dyn ComputingCache<AnyKey, AnyValue>> {
        let cache = Arc::new(CustomComputingCache {
            map: Mutex::new(HashMap::new()),
            function,
        });
        self.caches.lock().push((consumer_id.to_string(), Arc::clone(&cache)));
        Box::new(CacheHandle(cache))
    }
}

fn hammer() -> Value {
    Value::object(Hammer {
        age: 10,
        name: "Thor".to_string(),
    })
}

#[test]
fn test_custom_factory() {
    let factory = Arc::new(CustomFactory::default());
    let engine = MustacheEngineBuilder::new()
        .add_template_locator(MapTemplateLocator::new([("foo", "{{this.age}}")]))
        .set_computing_cache_factory(factory.clone())
        .build()
        .unwrap();

    assert_eq!(engine.get_mustache("foo").unwrap().unwrap().render(hammer()).unwrap(), "10");

    let reflection_caches = factory.caches_of(REFLECTION_CONSUMER);
    assert_eq!(reflection_caches.len(), 1);
    let reflection_cache = &reflection_caches[0];
    assert_eq!(reflection_cache.size(), 1);

    let template_caches = factory.caches_of(ENGINE_CONSUMER);
    assert_eq!(template_caches.len(), 2);
    for cache in &template_caches {
        cache.clear();
    }

    engine
        .reflection_resolver()
        .unwrap()
        .invalidate_member_cache(|_| true);
    assert_eq!(reflection_cache.size(), 0);

    assert_eq!(engine.get_mustache("foo").unwrap().unwrap().render(hammer()).unwrap(), "10");
    assert_eq!(reflection_cache.size(), 1);
}

#[test]
fn test_disabled_template_cache_requests_no_engine_caches() {
    let factory = Arc::new(CustomFactory::default());
    let _engine = MustacheEngineBuilder::new()
        .config(EngineConfig::no_caching())
        .set_computing_cache_factory(factory.clone())
        .build()
        .unwrap();

    assert_eq!(factory.caches_of(REFLECTION_CONSUMER).len(), 1);
    assert!(factory.caches_of(ENGINE_CONSUMER).is_empty());
}

/// Delegates to the default factory, bounding every cache per consumer
#[derive(Debug, Default)]
struct PolicyFactory {
    consumers: Mutex<Vec<String>>,
}

impl ComputingCacheFactory for PolicyFactory {
    fn create(
        &self,
        consumer_id: &str,
        function: ComputingFunction<AnyKey, AnyValue>,
        settings: CacheSettings<AnyKey>,
    ) -> Box<dyn ComputingCache<AnyKey, AnyValue>> {
        self.consumers.lock().push(consumer_id.to_string());
        let settings = if consumer_id == REFLECTION_CONSUMER {
            settings.max_size(1)
        } else {
            settings
        };
        DefaultComputingCacheFactory.create(consumer_id, function, settings)
    }
}

#[test]
fn test_per_consumer_policy() {
    let factory = Arc::new(PolicyFactory::default());
    let engine = MustacheEngineBuilder::new()
        .add_template_locator(MapTemplateLocator::new([("foo", "{{this.age}} {{this.name}}")]))
        .set_computing_cache_factory(factory.clone())
        .build()
        .unwrap();

    assert_eq!(
        engine.get_mustache("foo").unwrap().unwrap().render(hammer()).unwrap(),
        "10 Thor"
    );
    assert_eq!(engine.reflection_resolver().unwrap().member_cache_size(), 1);

    let mut consumers = factory.consumers.lock().clone();
    consumers.sort();
    assert_eq!(
        consumers,
        vec![
            "stencil::engine::MustacheEngine".to_string(),
            "stencil::engine::MustacheEngine".to_string(),
            "stencil::resolver::ReflectionResolver".to_string(),
        ]
    );
}
