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

//! Compiled templates

use crate::context::ExecutionContext;
use crate::engine::{EngineShared, MustacheEngine};
use crate::error::{MustacheError, Result};
use crate::model::Value;
use crate::segment::RootSegment;
use std::fmt;
use std::sync::{Arc, Weak};

/// A compiled template
///
/// Immutable and shareable across threads. Rendering needs the engine that
/// compiled the template, which is only referenced weakly so that cached
/// templates do not keep their engine alive.
pub struct Template {
    name: Arc<str>,
    root: RootSegment,
    engine: Weak<EngineShared>,
}

impl Template {
    pub(crate) fn new(name: Arc<str>, root: RootSegment, engine: Weak<EngineShared>) -> Self {
        Self { name, root, engine }
    }

    /// Template name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Root of the segment tree
    pub fn root(&self) -> &RootSegment {
        &self.root
    }

    /// Render the template against the data
    pub fn render(&self, data: impl Into<Value>) -> Result<String> {
        let mut out = String::new();
        self.render_to(&mut out, data)?;
        Ok(out)
    }

    /// Render the template into the sink
    ///
    /// Output written before a failure stays in the sink. Release callbacks
    /// registered during the render have all run when this returns.
    pub fn render_to(&self, out: &mut dyn fmt::Write, data: impl Into<Value>) -> Result<()> {
        let engine = self.engine()?;
        let mut ctx = ExecutionContext::new(&engine);
        let data = data.into();
        if !data.is_null() {
            ctx.push_scope(data);
        }
        self.execute(out, &mut ctx)
    }

    /// Execute the root in an existing context, tracking recursive invocations
    pub(crate) fn execute(&self, out: &mut dyn fmt::Write, ctx: &mut ExecutionContext<'_>) -> Result<()> {
        ctx.enter_template(&self.name)?;
        let result = self.root.execute(out, ctx);
        ctx.leave_template(&self.name);
        result
    }

    fn engine(&self) -> Result<MustacheEngine> {
        self.engine
            .upgrade()
            .map(MustacheEngine::from_shared)
            .ok_or_else(|| MustacheError::EngineUnavailable {
                template: self.name.to_string(),
            })
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("name", &self.name)
            .field("root", &self.root)
            .finish()
    }
}
