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

//! Template locators

use crate::error::Result;
use rustc_hash::FxHashMap;
use std::fmt;

/// Finds template sources by name
pub trait TemplateLocator: Send + Sync + fmt::Debug {
    /// Lower priorities are asked first
    fn priority(&self) -> i32 {
        0
    }

    /// Source of the named template, `None` if this locator does not know it
    fn locate(&self, name: &str) -> Result<Option<String>>;

    /// Names of every template this locator can find
    fn all_identifiers(&self) -> Vec<String> {
        Vec::new()
    }
}

/// In-memory locator
#[derive(Debug, Clone, Default)]
pub struct MapTemplateLocator {
    templates: FxHashMap<String, String>,
    priority: i32,
}

impl MapTemplateLocator {
    /// Create a locator over the given (name, source) pairs
    pub fn new<I, N, S>(templates: I) -> Self
    where
        I: IntoIterator<Item = (N, S)>,
        N: Into<String>,
        S: Into<String>,
    {
        Self {
            templates: templates
                .into_iter()
                .map(|(name, source)| (name.into(), source.into()))
                .collect(),
            priority: 0,
        }
    }

    /// Override the priority
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Add or replace a template
    pub fn insert(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.templates.insert(name.into(), source.into());
    }
}

impl TemplateLocator for MapTemplateLocator {
    fn priority(&self) -> i32 {
        self.priority
    }

    fn locate(&self, name: &str) -> Result<Option<String>> {
        Ok(self.templates.get(name).cloned())
    }

    fn all_identifiers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.templates.keys().cloned().collect();
        names.sort();
        names
    }
}
