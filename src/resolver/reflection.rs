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

//! Resolver for host object members

use super::hint::{self, Hint};
use super::{ResolutionContext, Resolver, ResolverInit};
use crate::cache::{CacheSettings, ComputingCache, TypedCache};
use crate::error::Result;
use crate::model::{Reflect, Value};
use once_cell::sync::OnceCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Consumer id of the member cache
pub const COMPUTING_CACHE_CONSUMER_ID: &str = "stencil::resolver::ReflectionResolver";

/// Key of the member cache: a member name of one host type
#[derive(Clone)]
pub struct MemberKey {
    type_name: &'static str,
    members: &'static [&'static str],
    name: String,
}

impl MemberKey {
    fn new(object: &dyn Reflect, name: &str) -> Self {
        Self {
            type_name: object.type_name(),
            members: object.members(),
            name: name.to_string(),
        }
    }

    /// Name of the host type
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Member name
    pub fn name(&self) -> &str {
        &self.name
    }

    fn find(&self) -> Option<usize> {
        self.members.iter().position(|member| *member == self.name)
    }
}

impl PartialEq for MemberKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name && self.name == other.name
    }
}

impl Eq for MemberKey {}

impl Hash for MemberKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_name.hash(state);
        self.name.hash(state);
    }
}

impl fmt::Debug for MemberKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.type_name, self.name)
    }
}

type MemberCache = TypedCache<MemberKey, Option<usize>>;

/// Resolves member names of [`Reflect`] objects
///
/// The name-to-index lookup is memoized per (type, name) in a computing cache
/// obtained from the engine's cache factory. Clones share the cache, so a
/// handle kept before the engine is built can invalidate it later.
#[derive(Clone)]
pub struct ReflectionResolver {
    priority: i32,
    member_cache: Arc<OnceCell<MemberCache>>,
}

impl ReflectionResolver {
    /// Default priority
    pub const DEFAULT_PRIORITY: i32 = 40;

    /// Create a resolver with the default priority
    pub fn new() -> Self {
        Self::with_priority(Self::DEFAULT_PRIORITY)
    }

    /// Create a resolver with a custom priority
    pub fn with_priority(priority: i32) -> Self {
        Self {
            priority,
            member_cache: Arc::new(OnceCell::new()),
        }
    }

    /// Drop memoized members of every type matching the predicate
    pub fn invalidate_member_cache(&self, predicate: impl Fn(&str) -> bool) {
        if let Some(cache) = self.member_cache.get() {
            log::debug!("Invalidating reflection member cache");
            cache.invalidate(&|key: &MemberKey| predicate(key.type_name));
        }
    }

    /// Number of memoized members
    pub fn member_cache_size(&self) -> usize {
        self.member_cache.get().map_or(0, |cache| cache.size())
    }

    fn member_index(&self, key: &MemberKey) -> Result<Option<usize>> {
        match self.member_cache.get() {
            Some(cache) => cache.get(key),
            // Not registered with an engine yet
            None => Ok(key.find()),
        }
    }
}

impl Default for ReflectionResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ReflectionResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReflectionResolver")
            .field("priority", &self.priority)
            .field("member_cache", &self.member_cache.get())
            .finish()
    }
}

impl Resolver for ReflectionResolver {
    fn name(&self) -> &'static str {
        "ReflectionResolver"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn init(&mut self, init: &ResolverInit<'_>) -> Result<()> {
        let mut settings = CacheSettings::new();
        if let Some(max_size) = init.config.reflection_cache_max_size {
            settings = settings.max_size(max_size);
        }
        let cache = init.cache_factory.create_cache(
            COMPUTING_CACHE_CONSUMER_ID,
            |key: &MemberKey| Ok(key.find()),
            settings,
        );
        if self.member_cache.set(cache).is_err() {
            log::warn!("ReflectionResolver already initialized, keeping the existing member cache");
        }
        Ok(())
    }

    fn resolve(
        &self,
        context_object: Option<&Value>,
        name: &str,
        _context: &mut ResolutionContext,
    ) -> Result<Option<Value>> {
        let Some(object) = context_object.and_then(Value::as_object) else {
            return Ok(None);
        };
        let key = MemberKey::new(object.as_ref(), name);
        Ok(self
            .member_index(&key)?
            .and_then(|index| object.member(index)))
    }

    fn create_hint(
        &self,
        context_object: Option<&Value>,
        name: &str,
        _context: &mut ResolutionContext,
    ) -> Option<Arc<dyn Hint>> {
        let Some(object) = context_object.and_then(Value::as_object) else {
            return Some(hint::inapplicable());
        };
        match MemberKey::new(object.as_ref(), name).find() {
            Some(index) => Some(Arc::new(ReflectionHint {
                type_name: object.type_name(),
                index,
            })),
            None => Some(hint::inapplicable()),
        }
    }
}

/// Reads the member at a fixed index of objects of one type
#[derive(Debug)]
struct ReflectionHint {
    type_name: &'static str,
    index: usize,
}

impl Hint for ReflectionHint {
    fn resolve(
        &self,
        context_object: Option<&Value>,
        _name: &str,
        _context: &mut ResolutionContext,
    ) -> Result<Option<Value>> {
        Ok(context_object
            .and_then(Value::as_object)
            .filter(|object| object.type_name() == self.type_name)
            .and_then(|object| object.member(self.index)))
    }
}
