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

//! Host objects exposed to templates

use std::fmt;

use super::value::Value;

/// A host object whose members can be resolved by name
///
/// Member names are static per type, which lets the reflection resolver
/// memoize the name-to-index lookup once per type.
///
/// # Examples
///
/// ```rust
/// use stencil::model::{Reflect, Value};
///
/// #[derive(Debug)]
/// struct Hammer {
///     age: i64,
/// }
///
/// impl Reflect for Hammer {
///     fn members(&self) -> &'static [&'static str] {
///         &["age"]
///     }
///
///     fn member(&self, index: usize) -> Option<Value> {
///         match index {
///             0 => Some(Value::Int(self.age)),
///             _ => None,
///         }
///     }
/// }
///
/// assert!(Value::object(Hammer { age: 10 }).as_object().is_some());
/// ```
pub trait Reflect: Send + Sync + fmt::Debug {
    /// Stable name identifying the type
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Names of all members, in index order
    fn members(&self) -> &'static [&'static str];

    /// Value of the member at the given index
    fn member(&self, index: usize) -> Option<Value>;

    /// Text written when the object itself is rendered
    fn to_text(&self) -> String {
        self.type_name().to_string()
    }
}
