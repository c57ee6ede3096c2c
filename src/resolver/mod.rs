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

//! Value resolvers
//!
//! Resolvers are tried in ascending priority order (ties keep registration
//! order), scope by scope from the innermost context object outward, and
//! finally without a context object. The first resolver reporting a match
//! wins; a matched `Value::Null` is still a match and ends the walk.

pub mod global_data;
pub mod hint;
pub mod list_index;
pub mod map;
pub mod reflection;
pub mod this;

pub use global_data::GlobalDataResolver;
pub use hint::{Hint, HintSlot};
pub use list_index::ListIndexResolver;
pub use map::MapResolver;
pub use reflection::{MemberKey, ReflectionResolver};
pub use this::ThisResolver;

use crate::cache::ComputingCacheFactory;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::model::Value;
use std::fmt;
use std::sync::Arc;

/// Cleanup action registered while resolving a value
pub type ReleaseCallback = Box<dyn FnOnce()>;

/// Per-lookup state handed to resolvers and hints
///
/// Resolvers acquiring resources with a per-lookup lifetime register a
/// release callback here; it runs exactly once when the lookup (or the scope
/// the resolved value was pushed as) ends, on every exit path.
#[derive(Default)]
pub struct ResolutionContext {
    callbacks: Vec<ReleaseCallback>,
}

impl ResolutionContext {
    /// Create an empty resolution context
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback run when the resolved value is released
    pub fn register_release_callback<F>(&mut self, callback: F)
    where
        F: FnOnce() + 'static,
    {
        self.callbacks.push(Box::new(callback));
    }

    /// Number of callbacks not yet run
    pub fn pending_callbacks(&self) -> usize {
        self.callbacks.len()
    }

    pub(crate) fn take_callbacks(&mut self) -> Vec<ReleaseCallback> {
        std::mem::take(&mut self.callbacks)
    }
}

impl fmt::Debug for ResolutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolutionContext")
            .field("pending_callbacks", &self.callbacks.len())
            .finish()
    }
}

/// Run callbacks in reverse registration order
pub(crate) fn run_release_callbacks(callbacks: Vec<ReleaseCallback>) {
    for callback in callbacks.into_iter().rev() {
        callback();
    }
}

/// Everything a resolver may need while the engine is being built
pub struct ResolverInit<'a> {
    /// Factory every resolver cache must be obtained from
    pub cache_factory: &'a Arc<dyn ComputingCacheFactory>,
    /// Engine configuration values
    pub config: &'a EngineConfig,
}

/// Strategy resolving a name against a context object
pub trait Resolver: Send + Sync + fmt::Debug {
    /// Name used in diagnostics
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Lower priorities are tried first
    fn priority(&self) -> i32;

    /// Called once while the engine is built
    fn init(&mut self, _init: &ResolverInit<'_>) -> Result<()> {
        Ok(())
    }

    /// Resolve the name
    ///
    /// `context_object` is `None` once every scope has been tried. `Ok(None)`
    /// means "no match" and lets the next resolver try.
    fn resolve(
        &self,
        context_object: Option<&Value>,
        name: &str,
        context: &mut ResolutionContext,
    ) -> Result<Option<Value>>;

    /// Create a hint after this resolver matched
    ///
    /// `None` means the resolver does not support hints at all; the
    /// [inapplicable](hint::inapplicable) hint marks a reference that can
    /// never be hinted.
    fn create_hint(
        &self,
        _context_object: Option<&Value>,
        _name: &str,
        _context: &mut ResolutionContext,
    ) -> Option<Arc<dyn Hint>> {
        None
    }
}
