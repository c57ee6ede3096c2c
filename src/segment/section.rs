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

//! Section and inverted section segments

use super::value::render_one_off;
use super::{Origin, Segment, execute_all};
use crate::context::ExecutionContext;
use crate::engine::{EngineConfiguration, KeyParts};
use crate::error::{MustacheError, Result};
use crate::model::{InputType, Lambda, Value};
use std::borrow::Cow;
use std::fmt;

/// Section or inverted section
///
/// Keeps the raw source of its content for lambdas taking literal input.
#[derive(Debug)]
pub struct SectionSegment {
    text: String,
    origin: Origin,
    key_parts: KeyParts,
    content: String,
    children: Vec<Segment>,
}

impl SectionSegment {
    /// Create a section segment, splitting the key with the configured splitter
    pub fn new(
        text: impl Into<String>,
        origin: Origin,
        content: impl Into<String>,
        children: Vec<Segment>,
        configuration: &EngineConfiguration,
    ) -> Self {
        let text = text.into();
        let key_parts = configuration.key_splitter().split(&text);
        Self {
            text,
            origin,
            key_parts,
            content: content.into(),
            children,
        }
    }

    /// The key as written in the tag
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Where the segment comes from
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Raw source between the section tags
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Child segments
    pub fn children(&self) -> &[Segment] {
        &self.children
    }

    /// Render the children for a truthy value
    ///
    /// Lists render once per element, lambdas render their returned text and
    /// any other value is pushed as a scope. The resolved value is released
    /// once its scope is popped.
    pub fn execute(&self, out: &mut dyn fmt::Write, ctx: &mut ExecutionContext<'_>) -> Result<()> {
        let wrapper = ctx.get_value(&self.text, &self.key_parts, None)?;
        let Some(value) = wrapper.get().filter(|value| !value.is_falsy()).cloned() else {
            return Ok(());
        };

        match value {
            Value::List(items) => {
                for item in items.iter() {
                    ctx.with_scope(item.clone(), Vec::new(), |ctx| {
                        execute_all(&self.children, &mut *out, ctx)
                    })?;
                }
                wrapper.release();
                Ok(())
            }
            Value::Lambda(lambda) => {
                let result = self.process_lambda(out, ctx, lambda.as_ref());
                wrapper.release();
                result
            }
            other => {
                let callbacks = wrapper.into_release_callbacks();
                ctx.with_scope(other, callbacks, |ctx| execute_all(&self.children, out, ctx))
            }
        }
    }

    /// Render the children for a missing or falsy value
    pub fn execute_inverted(
        &self,
        out: &mut dyn fmt::Write,
        ctx: &mut ExecutionContext<'_>,
    ) -> Result<()> {
        let wrapper = ctx.get_value(&self.text, &self.key_parts, None)?;
        let render = wrapper.get().is_none_or(Value::is_falsy);
        wrapper.release();
        if render {
            execute_all(&self.children, out, ctx)
        } else {
            Ok(())
        }
    }

    fn process_lambda(
        &self,
        out: &mut dyn fmt::Write,
        ctx: &mut ExecutionContext<'_>,
        lambda: &dyn Lambda,
    ) -> Result<()> {
        let input = match lambda.input_type() {
            InputType::Literal => Cow::Borrowed(self.content.as_str()),
            InputType::Processed => {
                let mut rendered = String::new();
                execute_all(&self.children, &mut rendered, ctx)?;
                Cow::Owned(rendered)
            }
        };
        let returned = lambda
            .invoke(Some(&input))
            .map_err(|err| MustacheError::Lambda {
                tag: self.text.clone(),
                message: format!("{err:#}"),
            })?;

        match returned {
            Some(text) if !text.is_empty() => {
                if lambda.is_return_value_interpolated() {
                    render_one_off(&self.origin, &self.text, &text, out, ctx)
                } else {
                    out.write_str(&text).map_err(Into::into)
                }
            }
            _ => Ok(()),
        }
    }
}
