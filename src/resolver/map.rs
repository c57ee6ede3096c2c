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

//! Resolver for map entries

use super::hint::Hint;
use super::{ResolutionContext, Resolver};
use crate::error::Result;
use crate::model::Value;
use std::sync::Arc;

/// Resolves the name as a key of a map context object
///
/// A key mapped to `Null` is a match.
#[derive(Debug, Clone, Copy)]
pub struct MapResolver {
    priority: i32,
}

impl MapResolver {
    /// Default priority
    pub const DEFAULT_PRIORITY: i32 = 30;

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
}

impl Default for MapResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn lookup(context_object: Option<&Value>, name: &str) -> Option<Value> {
    context_object?.as_map()?.get(name).cloned()
}

impl Resolver for MapResolver {
    fn name(&self) -> &'static str {
        "MapResolver"
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
        Ok(lookup(context_object, name))
    }

    fn create_hint(
        &self,
        _context_object: Option<&Value>,
        _name: &str,
        _context: &mut ResolutionContext,
    ) -> Option<Arc<dyn Hint>> {
        Some(Arc::new(MapHint))
    }
}

#[derive(Debug)]
struct MapHint;

impl Hint for MapHint {
    fn resolve(
        &self,
        context_object: Option<&Value>,
        name: &str,
        _context: &mut ResolutionContext,
    ) -> Result<Option<Value>> {
        Ok(lookup(context_object, name))
    }
}
