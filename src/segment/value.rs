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

//! Variable segments

use super::{MustacheTagInfo, MustacheTagType, Origin};
use crate::context::{ExecutionContext, ValueWrapper};
use crate::engine::{EngineConfiguration, KeyParts};
use crate::error::{MustacheError, Result};
use crate::model::{Lambda, Value};
use crate::resolver::hint::{Hint, HintSlot};
use once_cell::sync::Lazy;
use std::fmt::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static ONE_OFF_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Name of a template compiled from lambda output
///
/// The counter keeps names unique even for lambdas returning identical text
/// from the same segment.
pub(crate) fn one_off_template_name(origin: &Origin) -> String {
    format!(
        "oneoff_lambda_{}_{}_{}",
        origin.template_name,
        origin.line,
        ONE_OFF_COUNTER.fetch_add(1, Ordering::Relaxed)
    )
}

/// Recursion key shared by every template compiled from lambda output
///
/// Nested one-off templates get fresh names, so they are counted under one
/// key: the depth of lambda output rendered within lambda output.
static ONE_OFF_RECURSION_KEY: Lazy<Arc<str>> = Lazy::new(|| Arc::from("oneoff_lambda"));

/// Compile lambda output and render it against the current context
///
/// A compilation failure happens while rendering, so it is reported as a
/// lambda failure of the invoking tag.
pub(crate) fn render_one_off(
    origin: &Origin,
    tag: &str,
    source: &str,
    out: &mut dyn fmt::Write,
    ctx: &mut ExecutionContext<'_>,
) -> Result<()> {
    let template = ctx
        .engine()
        .compile_mustache(&one_off_template_name(origin), source)
        .map_err(|err| MustacheError::Lambda {
            tag: tag.to_string(),
            message: err.to_string(),
        })?;
    let key = Arc::clone(&ONE_OFF_RECURSION_KEY);
    ctx.enter_template(&key)?;
    let result = template.root().execute(out, ctx);
    ctx.leave_template(&key);
    result
}

/// Escaped or unescaped variable
///
/// Key parts are split once at compilation. Single-part keys get a hint slot
/// when hints are enabled; it is populated by the first render that resolves
/// the key through the resolver chain.
#[derive(Debug)]
pub struct ValueSegment {
    text: String,
    origin: Origin,
    unescape: bool,
    key_parts: KeyParts,
    hint: Option<HintSlot>,
}

impl ValueSegment {
    /// Create a value segment, splitting the key with the configured splitter
    pub fn new(
        text: impl Into<String>,
        origin: Origin,
        unescape: bool,
        configuration: &EngineConfiguration,
    ) -> Self {
        let text = text.into();
        let key_parts = configuration.key_splitter().split(&text);
        let hint = (configuration.config().resolver_hints_enabled && key_parts.len() == 1)
            .then(HintSlot::new);
        Self {
            text,
            origin,
            unescape,
            key_parts,
            hint,
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

    /// Check whether the output is written without escaping
    pub fn is_unescaped(&self) -> bool {
        self.unescape
    }

    /// Key parts resolved one after another
    pub fn key_parts(&self) -> &[String] {
        &self.key_parts
    }

    /// The cached hint, if any
    pub fn hint(&self) -> Option<&Arc<dyn Hint>> {
        self.hint.as_ref().and_then(HintSlot::get)
    }

    /// Metadata of the tag
    pub fn tag_info(&self) -> MustacheTagInfo {
        MustacheTagInfo {
            text: self.text.clone(),
            tag_type: if self.unescape {
                MustacheTagType::UnescapeVariable
            } else {
                MustacheTagType::Variable
            },
            line: self.origin.line,
            template_name: Arc::clone(&self.origin.template_name),
        }
    }

    /// Resolve the key and write the value
    pub fn execute(&self, out: &mut dyn fmt::Write, ctx: &mut ExecutionContext<'_>) -> Result<()> {
        let wrapper = ctx.get_value(&self.text, &self.key_parts, self.hint.as_ref())?;
        let result = self.process_wrapper(out, ctx, &wrapper);
        wrapper.release();
        result
    }

    fn process_wrapper(
        &self,
        out: &mut dyn fmt::Write,
        ctx: &mut ExecutionContext<'_>,
        wrapper: &ValueWrapper,
    ) -> Result<()> {
        let value = match wrapper.get() {
            Some(value) if !value.is_null() => value,
            _ => return self.process_missing(out, ctx),
        };
        if let (Some(slot), Some(hint)) = (&self.hint, wrapper.hint()) {
            if !slot.is_set() {
                slot.set(Arc::clone(hint));
            }
        }
        self.process_value(out, ctx, value)
    }

    fn process_missing(&self, out: &mut dyn fmt::Write, ctx: &mut ExecutionContext<'_>) -> Result<()> {
        let replacement = ctx
            .configuration()
            .missing_value_handler()
            .handle(&self.tag_info())?;
        match replacement {
            Some(value) if !value.is_null() => self.process_value(out, ctx, &value),
            _ => Ok(()),
        }
    }

    fn process_value(
        &self,
        out: &mut dyn fmt::Write,
        ctx: &mut ExecutionContext<'_>,
        value: &Value,
    ) -> Result<()> {
        match value {
            Value::Lambda(lambda) => self.process_lambda(out, ctx, lambda.as_ref()),
            Value::String(text) => self.write_value(out, ctx, text),
            other => {
                let mut text = String::new();
                write!(text, "{other}")?;
                self.write_value(out, ctx, &text)
            }
        }
    }

    fn process_lambda(
        &self,
        out: &mut dyn fmt::Write,
        ctx: &mut ExecutionContext<'_>,
        lambda: &dyn Lambda,
    ) -> Result<()> {
        let returned = lambda.invoke(None).map_err(|err| MustacheError::Lambda {
            tag: self.text.clone(),
            message: format!("{err:#}"),
        })?;
        let Some(text) = returned else {
            return self.process_missing(out, ctx);
        };
        if text.is_empty() {
            return Ok(());
        }
        if !lambda.is_return_value_interpolated() {
            return self.write_value(out, ctx, &text);
        }

        let mut rendered = String::new();
        render_one_off(&self.origin, &self.text, &text, &mut rendered, ctx)?;
        self.write_value(out, ctx, &rendered)
    }

    fn write_value(&self, out: &mut dyn fmt::Write, ctx: &ExecutionContext<'_>, text: &str) -> Result<()> {
        let configuration = ctx.configuration();
        if self.unescape || configuration.config().skip_value_escaping {
            out.write_str(text)?;
        } else {
            out.write_str(&configuration.text_support().escape_html(text)?)?;
        }
        Ok(())
    }
}
