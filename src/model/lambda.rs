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

//! Lambda values
//!
//! A lambda is a resolved value that produces text when invoked. In variable
//! position it is invoked without input; in section position it receives the
//! section content, either literally or already rendered.

use std::fmt;
use std::sync::Arc;

/// What a lambda in section position receives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputType {
    /// The raw, unprocessed section content
    #[default]
    Literal,
    /// The section content rendered against the current context
    Processed,
}

/// Invokable value producing text
pub trait Lambda: Send + Sync {
    /// Invoke the lambda
    ///
    /// `text` is `None` in variable position. Returning `Ok(None)` means the
    /// lambda produced no value and the missing value handler is consulted.
    fn invoke(&self, text: Option<&str>) -> anyhow::Result<Option<String>>;

    /// Input passed in section position
    fn input_type(&self) -> InputType {
        InputType::Literal
    }

    /// Whether the returned text is compiled and rendered as a template
    fn is_return_value_interpolated(&self) -> bool {
        true
    }
}

type LambdaFn = dyn Fn(Option<&str>) -> anyhow::Result<Option<String>> + Send + Sync;

/// Lambda backed by a closure
///
/// # Examples
///
/// ```rust
/// use stencil::model::{FnLambda, Value};
///
/// let upper = FnLambda::new(|text| Ok(text.map(str::to_uppercase))).interpolated(false);
/// let value = Value::lambda(upper);
/// assert!(value.as_lambda().is_some());
/// ```
#[derive(Clone)]
pub struct FnLambda {
    function: Arc<LambdaFn>,
    input_type: InputType,
    interpolated: bool,
}

impl FnLambda {
    /// Create an interpolated lambda with literal input
    pub fn new<F>(function: F) -> Self
    where
        F: Fn(Option<&str>) -> anyhow::Result<Option<String>> + Send + Sync + 'static,
    {
        Self {
            function: Arc::new(function),
            input_type: InputType::Literal,
            interpolated: true,
        }
    }

    /// Lambda always returning the same text
    pub fn constant(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(move |_| Ok(Some(text.clone())))
    }

    /// Set whether the returned text is interpolated
    pub fn interpolated(mut self, interpolated: bool) -> Self {
        self.interpolated = interpolated;
        self
    }

    /// Set the input type used in section position
    pub fn input(mut self, input_type: InputType) -> Self {
        self.input_type = input_type;
        self
    }
}

impl Lambda for FnLambda {
    fn invoke(&self, text: Option<&str>) -> anyhow::Result<Option<String>> {
        (self.function)(text)
    }

    fn input_type(&self) -> InputType {
        self.input_type
    }

    fn is_return_value_interpolated(&self) -> bool {
        self.interpolated
    }
}

impl fmt::Debug for FnLambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnLambda")
            .field("input_type", &self.input_type)
            .field("interpolated", &self.interpolated)
            .finish()
    }
}
