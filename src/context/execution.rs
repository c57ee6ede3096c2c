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

//! Per-render execution state

use super::value_wrapper::ValueWrapper;
use crate::engine::{EngineConfiguration, MustacheEngine};
use crate::error::{MustacheError, Result};
use crate::model::Value;
use crate::resolver::hint::HintSlot;
use crate::resolver::{run_release_callbacks, ReleaseCallback};
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

struct Scope {
    value: Value,
    callbacks: Vec<ReleaseCallback>,
}

/// State of one render
///
/// Holds the stack of context objects (innermost last), the release callbacks
/// owned by each scope and the nesting depth of every template being
/// executed. Every pending callback runs when the context is dropped, so a
/// failed render still releases everything it acquired.
pub struct ExecutionContext<'e> {
    engine: &'e MustacheEngine,
    scopes: Vec<Scope>,
    callbacks: Vec<ReleaseCallback>,
    templates: SmallVec<[(Arc<str>, usize); 4]>,
}

impl<'e> ExecutionContext<'e> {
    /// Create an empty context rendering with the given engine
    pub fn new(engine: &'e MustacheEngine) -> Self {
        Self {
            engine,
            scopes: Vec::new(),
            callbacks: Vec::new(),
            templates: SmallVec::new(),
        }
    }

    /// Engine the render runs on
    pub fn engine(&self) -> &'e MustacheEngine {
        self.engine
    }

    /// Configuration of the engine
    pub fn configuration(&self) -> &'e EngineConfiguration {
        self.engine.configuration()
    }

    /// Innermost context object
    pub fn top(&self) -> Option<&Value> {
        self.scopes.last().map(|scope| &scope.value)
    }

    /// Number of pushed scopes
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Push a context object
    pub fn push_scope(&mut self, value: Value) {
        self.push_scope_with(value, Vec::new());
    }

    /// Push a context object owning the given release callbacks
    pub fn push_scope_with(&mut self, value: Value, callbacks: Vec<ReleaseCallback>) {
        self.scopes.push(Scope { value, callbacks });
    }

    /// Pop the innermost context object and run its release callbacks
    pub fn pop_scope(&mut self) -> Option<Value> {
        let scope = self.scopes.pop()?;
        run_release_callbacks(scope.callbacks);
        Some(scope.value)
    }

    /// Run `f` with the value pushed as the innermost scope
    ///
    /// The scope is popped whether `f` succeeds or not.
    pub fn with_scope<T>(
        &mut self,
        value: Value,
        callbacks: Vec<ReleaseCallback>,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        self.push_scope_with(value, callbacks);
        let result = f(self);
        self.pop_scope();
        result
    }

    /// Register a callback run when the innermost scope is popped
    ///
    /// With no scope pushed the callback runs when the render ends.
    pub fn register_release_callback<F>(&mut self, callback: F)
    where
        F: FnOnce() + 'static,
    {
        match self.scopes.last_mut() {
            Some(scope) => scope.callbacks.push(Box::new(callback)),
            None => self.callbacks.push(Box::new(callback)),
        }
    }

    /// Resolve a (possibly dotted) key against the scope stack
    ///
    /// A cached hint is only used for single-part keys while hints are
    /// enabled; it is tried against the innermost scope and the resolver
    /// chain is walked whenever it yields nothing. When the slot is still
    /// empty, the wrapper carries the hint created by the matching resolver
    /// so that the caller can store it.
    pub fn get_value(
        &mut self,
        key: &str,
        key_parts: &[String],
        hint_slot: Option<&HintSlot>,
    ) -> Result<ValueWrapper> {
        let mut wrapper = ValueWrapper::new();
        let Some((first, rest)) = key_parts.split_first() else {
            return Ok(wrapper);
        };

        let configuration = self.configuration();
        let hint_slot =
            hint_slot.filter(|_| rest.is_empty() && configuration.config().resolver_hints_enabled);

        let mut current = None;
        if let Some(hint) = hint_slot
            .and_then(HintSlot::get)
            .filter(|hint| hint.is_applicable())
        {
            current = hint.resolve(self.top(), first, &mut wrapper.resolution)?;
            if current.is_some() {
                log::trace!("Hint hit for {key}");
                wrapper.hint = Some(Arc::clone(hint));
            } else {
                log::trace!("Hint miss for {key}, walking the resolver chain");
            }
        }

        if current.is_none() {
            let create_hint = hint_slot.is_some_and(|slot| !slot.is_set());
            current = self.resolve_leading(first, &mut wrapper, create_hint)?;
        }

        let Some(mut value) = current else {
            return Ok(wrapper);
        };
        for part in rest {
            match self.resolve(Some(&value), part, &mut wrapper, false)? {
                Some(next) => value = next,
                None => return Ok(wrapper),
            }
        }
        wrapper.value = Some(value);
        Ok(wrapper)
    }

    fn resolve_leading(
        &self,
        name: &str,
        wrapper: &mut ValueWrapper,
        create_hint: bool,
    ) -> Result<Option<Value>> {
        for scope in self.scopes.iter().rev() {
            if let Some(value) = self.resolve(Some(&scope.value), name, wrapper, create_hint)? {
                return Ok(Some(value));
            }
        }
        self.resolve(None, name, wrapper, create_hint)
    }

    fn resolve(
        &self,
        context_object: Option<&Value>,
        name: &str,
        wrapper: &mut ValueWrapper,
        create_hint: bool,
    ) -> Result<Option<Value>> {
        for resolver in self.configuration().resolvers() {
            let Some(value) = resolver.resolve(context_object, name, &mut wrapper.resolution)? else {
                continue;
            };
            log::trace!("{} resolved '{name}'", resolver.name());
            if create_hint {
                wrapper.hint = resolver.create_hint(context_object, name, &mut wrapper.resolution);
            }
            return Ok(Some(value));
        }
        Ok(None)
    }

    /// Record that the named template starts executing
    pub(crate) fn enter_template(&mut self, name: &Arc<str>) -> Result<()> {
        let limit = self.configuration().config().recursive_invocation_limit;
        let depth = match self.templates.iter_mut().find(|entry| entry.0 == *name) {
            Some((_, depth)) => {
                *depth += 1;
                *depth
            }
            None => {
                self.templates.push((Arc::clone(name), 1));
                1
            }
        };
        if depth > limit {
            self.leave_template(name);
            return Err(MustacheError::RecursiveInvocationLimitExceeded {
                template: name.to_string(),
                limit,
            });
        }
        Ok(())
    }

    /// Record that the named template finished executing
    pub(crate) fn leave_template(&mut self, name: &Arc<str>) {
        if let Some(index) = self.templates.iter().position(|entry| entry.0 == *name) {
            self.templates[index].1 -= 1;
            if self.templates[index].1 == 0 {
                self.templates.swap_remove(index);
            }
        }
    }
}

impl Drop for ExecutionContext<'_> {
    fn drop(&mut self) {
        while self.pop_scope().is_some() {}
        run_release_callbacks(std::mem::take(&mut self.callbacks));
    }
}

impl fmt::Debug for ExecutionContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("scopes", &self.scopes.len())
            .field("templates", &self.templates)
            .finish()
    }
}
