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

//! Logic-less template engine in Rust
//!
//! Templates compile into an immutable segment tree that many threads render
//! concurrently. Values are resolved through a priority-ordered resolver
//! chain; single-part references cache the winning strategy as a hint so that
//! repeated renders skip the chain. Every cache (reflection members, compiled
//! templates, template sources) comes from one pluggable
//! [`ComputingCacheFactory`](cache::ComputingCacheFactory).
//!
//! ```rust
//! use stencil::engine::MustacheEngineBuilder;
//! use stencil::model::Value;
//!
//! let engine = MustacheEngineBuilder::new().build().unwrap();
//! let template = engine.compile_mustache("greeting", "{{#names}}Hi {{.}}! {{/names}}").unwrap();
//! let output = template.render(Value::map([("names", Value::list(["Ann", "Bob"]))])).unwrap();
//! assert_eq!(output, "Hi Ann! Hi Bob! ");
//! ```

pub mod cache;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod model;
pub mod parser;
pub mod resolver;
pub mod segment;
pub mod template;

// Re-export main types
pub use config::EngineConfig;
pub use engine::{MustacheEngine, MustacheEngineBuilder};
pub use error::{MustacheError, Result};
pub use model::Value;
pub use template::Template;
