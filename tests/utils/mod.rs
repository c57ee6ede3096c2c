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

//! Shared helpers for integration tests

#![allow(dead_code)]

use stencil::engine::{MapTemplateLocator, MustacheEngineBuilder};
use stencil::model::{Reflect, Value};
use stencil::resolver::{ResolutionContext, Resolver};
use stencil::{MustacheEngine, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Build an engine serving the given templates
pub fn engine_with(templates: &[(&str, &str)]) -> MustacheEngine {
    builder_with(templates).build().unwrap()
}

/// Builder serving the given templates
pub fn builder_with(templates: &[(&str, &str)]) -> MustacheEngineBuilder {
    MustacheEngineBuilder::new().add_template_locator(MapTemplateLocator::new(
        templates.iter().map(|(name, source)| (*name, *source)),
    ))
}

/// Compile and render a single template source
pub fn render(source: &str, data: impl Into<Value>) -> String {
    let engine = MustacheEngineBuilder::new().build().unwrap();
    engine
        .compile_mustache("test", source)
        .unwrap()
        .render(data)
        .unwrap()
}

/// Host object exposed through reflection
#[derive(Debug, Clone)]
pub struct Hammer {
    pub age: i64,
    pub name: String,
}

impl Reflect for Hammer {
    fn members(&self) -> &'static [&'static str] {
        &["age", "name", "persistent"]
    }

    fn member(&self, index: usize) -> Option<Value> {
        match index {
            0 => Some(Value::Int(self.age)),
            1 => Some(Value::from(self.name.as_str())),
            2 => Some(Value::Bool(true)),
            _ => None,
        }
    }
}

/// Resolves every name in `names` to a fixed text and counts its invocations
#[derive(Debug)]
pub struct CountingResolver {
    pub priority: i32,
    pub names: Vec<&'static str>,
    pub invocations: Arc<AtomicUsize>,
}

impl CountingResolver {
    pub fn new(priority: i32, names: &[&'static str]) -> Self {
        Self {
            priority,
            names: names.to_vec(),
            invocations: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn invocations(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.invocations)
    }
}

impl Resolver for CountingResolver {
    fn name(&self) -> &'static str {
        "CountingResolver"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn resolve(
        &self,
        _context_object: Option<&Value>,
        name: &str,
        _context: &mut ResolutionContext,
    ) -> Result<Option<Value>> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .names
            .iter()
            .any(|known| *known == name)
            .then(|| Value::from(format!("counted:{name}"))))
    }
}
