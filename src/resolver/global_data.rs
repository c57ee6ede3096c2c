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

//! Resolver for engine-wide global data

use super::hint::{self, Hint};
use super::{ResolutionContext, Resolver};
use crate::error::Result;
use crate::model::Value;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Resolves names against data registered on the engine builder
///
/// Only consulted after every scope was tried, i.e. with no context object.
#[derive(Debug, Clone)]
pub struct GlobalDataResolver {
    priority: i32,
    data: Arc<FxHashMap<String, Value>>,
}

impl GlobalDataResolver {
    /// Default priority
    pub const DEFAULT_PRIORITY: i32 = 100;

    /// Create a resolver over the given data
    pub fn new(data: FxHashMap<String, Value>) -> Self {
        Self {
            priority: Self::DEFAULT_PRIORITY,
            data: Arc::new(data),
        }
    }

    /// Override the priority
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl Resolver for GlobalDataResolver {
    fn name(&self) -> &'static str {
        "GlobalDataResolver"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn resolve(
        &self,
        context_object: Option<&Value>,
        name: &str,
        _context: &mut ResolutionContext,
    ) -> Result<Option<Value>> {
        if context_object.is_some() {
            return Ok(None);
        }
        Ok(self.data.get(name).cloned())
    }

    // Hints only see the innermost scope, which cannot tell whether an outer
    // scope shadows the global name.
    fn create_hint(
        &self,
        _context_object: Option<&Value>,
        _name: &str,
        _context: &mut ResolutionContext,
    ) -> Option<Arc<dyn Hint>> {
        Some(hint::inapplicable())
    }
}
