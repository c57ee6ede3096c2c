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

//! Missing value handlers

use crate::error::{MustacheError, Result};
use crate::model::Value;
use crate::segment::MustacheTagInfo;

/// Policy applied when a value tag resolves to nothing
///
/// Also consulted when a lambda in variable position returns no value. A
/// returned value is written in place of the missing one.
pub trait MissingValueHandler: Send + Sync {
    /// Handle the missing value of the given tag
    fn handle(&self, tag: &MustacheTagInfo) -> Result<Option<Value>>;
}

impl<F> MissingValueHandler for F
where
    F: Fn(&MustacheTagInfo) -> Result<Option<Value>> + Send + Sync,
{
    fn handle(&self, tag: &MustacheTagInfo) -> Result<Option<Value>> {
        self(tag)
    }
}

/// Writes nothing for missing values
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpMissingValueHandler;

impl MissingValueHandler for NoOpMissingValueHandler {
    fn handle(&self, _tag: &MustacheTagInfo) -> Result<Option<Value>> {
        Ok(None)
    }
}

/// Fails the render on the first missing value
#[derive(Debug, Default, Clone, Copy)]
pub struct ThrowingMissingValueHandler;

impl MissingValueHandler for ThrowingMissingValueHandler {
    fn handle(&self, tag: &MustacheTagInfo) -> Result<Option<Value>> {
        Err(MustacheError::MissingValue {
            tag: tag.text.clone(),
            template: tag.template_name.to_string(),
            line: tag.line,
        })
    }
}
