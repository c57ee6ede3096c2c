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

//! Resolver for the current context object

use super::hint::{self, Hint};
use super::{ResolutionContext, Resolver};
use crate::error::Result;
use crate::model::Value;
use std::sync::Arc;

/// Resolves `this` and `.` to the context object itself
#[derive(Debug, Clone, Copy)]
pub struct ThisResolver {
    priority: i32,
}

impl ThisResolver {
    /// Default priority
    pub const DEFAULT_PRIORITY: i32 = 10;

    /// Create a resolver with the default priority
    pub fn new() -> Self {
        Self {
            priority: Self::DEFAULT_PRIORITY,
        }
    }

    /// Override the priority
    pub fn with_priority(priority: i32) -> Self {
        Self { priority }
    }

    fn matches(name: &str) -> bool {
        name == "this" || name == "."
    }
}

impl Default for ThisResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver for ThisResolver {
    fn name(&self) -> &'static str {
        "ThisResolver"
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
        if !Self::matches(name) {
            return Ok(None);
        }
        Ok(context_object.cloned())
    }

    fn create_hint(
        &self,
        _context_object: Option<&Value>,
        name: &str,
        _context: &mut ResolutionContext,
    ) -> Option<Arc<dyn Hint>> {
        if Self::matches(name) {
            Some(Arc::new(ThisHint))
        } else {
            Some(hint::inapplicable())
        }
    }
}

#[derive(Debug)]
struct ThisHint;

impl Hint for ThisHint {
    fn resolve(
        &self,
        context_object: Option<&Value>,
        _name: &str,
        _context: &mut ResolutionContext,
    ) -> Result<Option<Value>> {
        Ok(context_object.cloned())
    }
}
