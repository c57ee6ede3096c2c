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

//! Partial segments

use super::Origin;
use crate::context::ExecutionContext;
use crate::error::{MustacheError, Result};
use std::fmt;

/// Renders another template in the current context
#[derive(Debug, Clone)]
pub struct PartialSegment {
    name: String,
    origin: Origin,
}

impl PartialSegment {
    /// Create a partial segment
    pub fn new(name: impl Into<String>, origin: Origin) -> Self {
        Self {
            name: name.into(),
            origin,
        }
    }

    /// Name of the partial template
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Where the segment comes from
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Look the template up through the engine and execute it
    pub fn execute(&self, out: &mut dyn fmt::Write, ctx: &mut ExecutionContext<'_>) -> Result<()> {
        let template = ctx
            .engine()
            .get_mustache(&self.name)?
            .ok_or_else(|| MustacheError::PartialNotFound {
                name: self.name.clone(),
                template: self.origin.template_name.to_string(),
                line: self.origin.line,
            })?;
        template.execute(out, ctx)
    }
}
