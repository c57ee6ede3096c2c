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

//! Error types for template compilation and rendering

use thiserror::Error;

/// Result type used throughout the engine
pub type Result<T> = std::result::Result<T, MustacheError>;

/// Errors that can occur while compiling or rendering templates
///
/// The type is `Clone` so that a single failed cache computation can be
/// handed to every thread waiting on the same key.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MustacheError {
    /// Template source could not be compiled
    ///
    /// Only raised before rendering starts. Lambda output that fails to
    /// compile during a render is a [`MustacheError::Lambda`].
    #[error("Compilation of template '{template}' failed at line {line}: {message}")]
    Compilation {
        /// Template name
        template: String,
        /// Line of the offending tag
        line: usize,
        /// Error message
        message: String,
    },

    /// A lambda value failed while being invoked
    #[error("Lambda invocation failed for tag {tag}: {message}")]
    Lambda {
        /// Tag text of the segment that invoked the lambda
        tag: String,
        /// Error message
        message: String,
    },

    /// A resolver failed instead of reporting "no match"
    ///
    /// Built by [`Resolver`](crate::resolver::Resolver) implementations,
    /// usually through [`MustacheError::resolver`]; the engine passes it on.
    #[error("Resolver {resolver} failed while resolving '{name}': {message}")]
    Resolver {
        /// Resolver name
        resolver: String,
        /// Name being resolved
        name: String,
        /// Error message
        message: String,
    },

    /// The text support failed to escape a value
    ///
    /// Built by [`TextSupport`](crate::engine::TextSupport) implementations.
    #[error("Escaping failed: {message}")]
    Escaping {
        /// Error message
        message: String,
    },

    /// Raised by the throwing missing value handler
    #[error("No value for {tag} found in template '{template}' at line {line}")]
    MissingValue {
        /// Tag text
        tag: String,
        /// Template name
        template: String,
        /// Line of the tag
        line: usize,
    },

    /// A partial tag referenced a template no locator could find
    #[error("Partial template '{name}' not found (template '{template}', line {line})")]
    PartialNotFound {
        /// Partial name
        name: String,
        /// Template containing the partial tag
        template: String,
        /// Line of the partial tag
        line: usize,
    },

    /// A template locator failed for a reason other than "not found"
    #[error("Locating template '{name}' failed: {message}")]
    TemplateLocation {
        /// Template name
        name: String,
        /// Error message
        message: String,
    },

    /// A template was invoked recursively too many times in one render
    #[error("Recursive invocation limit {limit} exceeded for template '{template}'")]
    RecursiveInvocationLimitExceeded {
        /// Template name
        template: String,
        /// Configured limit
        limit: usize,
    },

    /// A computing cache function failed
    #[error("Cache computation failed: {message}")]
    CacheComputation {
        /// Error message
        message: String,
    },

    /// A custom cache factory returned a value of an unexpected type
    #[error("Cache for consumer {consumer_id} returned a value of an unexpected type")]
    CacheTypeMismatch {
        /// Consumer the cache was created for
        consumer_id: String,
    },

    /// The engine that compiled a template has been dropped
    #[error("Engine of template '{template}' is no longer available")]
    EngineUnavailable {
        /// Template name
        template: String,
    },

    /// Writing to the output sink failed
    #[error("Unable to write rendered output")]
    Output,

    /// The engine was configured inconsistently
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration {
        /// Error message
        message: String,
    },
}

impl MustacheError {
    /// Create a compilation error
    pub fn compilation(template: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        MustacheError::Compilation {
            template: template.into(),
            line,
            message: message.into(),
        }
    }

    /// Create a resolver error
    pub fn resolver(
        resolver: impl Into<String>,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        MustacheError::Resolver {
            resolver: resolver.into(),
            name: name.into(),
            message: message.into(),
        }
    }

    /// Check whether the error was raised before rendering started
    pub fn is_compilation_error(&self) -> bool {
        matches!(self, MustacheError::Compilation { .. })
    }
}

impl From<std::fmt::Error> for MustacheError {
    fn from(_: std::fmt::Error) -> Self {
        MustacheError::Output
    }
}
