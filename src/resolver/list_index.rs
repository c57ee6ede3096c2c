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

//! Resolver for list elements

use super::{ResolutionContext, Resolver};
use crate::error::Result;
use crate::model::Value;

/// Resolves a numeric name as an index into a list context object
///
/// Out of range indices are not a match. Provides no hint.
#[derive(Debug, Clone, Copy)]
pub struct ListIndexResolver {
    priority: i32,
}

impl ListIndexResolver {
    /// Default priority
    pub const DEFAULT_PRIORITY: i32 = 20;

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

impl Default for ListIndexResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver for ListIndexResolver {
    fn name(&self) -> &'static str {
        "ListIndexResolver"
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
        let Some(items) = context_object.and_then(Value::as_list) else {
            return Ok(None);
        };
        if !name.bytes().all(|b| b.is_ascii_digit()) {
            return Ok(None);
        }
        Ok(name
            .parse::<usize>()
            .ok()
            .and_then(|index| items.get(index))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_index() {
        let resolver = ListIndexResolver::new();
        let mut context = ResolutionContext::new();
        let list = Value::list(["a", "b"]);

        assert_eq!(resolver.resolve(Some(&list), "1", &mut context).unwrap(), Some(Value::from("b")));
        assert_eq!(resolver.resolve(Some(&list), "2", &mut context).unwrap(), None);
        assert_eq!(resolver.resolve(Some(&list), "+1", &mut context).unwrap(), None);
        assert_eq!(resolver.resolve(Some(&list), "size", &mut context).unwrap(), None);
        assert!(resolver.create_hint(Some(&list), "1", &mut context).is_none());
    }
}
