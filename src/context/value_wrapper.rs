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

//! Result of a single value lookup

use crate::model::Value;
use crate::resolver::hint::Hint;
use crate::resolver::{run_release_callbacks, ReleaseCallback, ResolutionContext};
use std::fmt;
use std::sync::Arc;

/// A resolved value together with the state of its lookup
///
/// Release callbacks registered while resolving run exactly once: on
/// [`release`](Self::release), when ownership moves to a pushed scope, or
/// when the wrapper is dropped.
pub struct ValueWrapper {
    pub(crate) value: Option<Value>,
    pub(crate) hint: Option<Arc<dyn Hint>>,
    pub(crate) resolution: ResolutionContext,
}

impl ValueWrapper {
    pub(crate) fn new() -> Self {
        Self {
            value: None,
            hint: None,
            resolution: ResolutionContext::new(),
        }
    }

    /// Check whether the lookup found nothing or a `Null` value
    pub fn is_null(&self) -> bool {
        self.value.as_ref().is_none_or(Value::is_null)
    }

    /// The resolved value
    pub fn get(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Hint produced by the lookup, if any
    pub fn hint(&self) -> Option<&Arc<dyn Hint>> {
        self.hint.as_ref()
    }

    /// Lookup state, e.g. to register further release callbacks
    pub fn resolution_context(&mut self) -> &mut ResolutionContext {
        &mut self.resolution
    }

    /// Run the release callbacks now
    pub fn release(mut self) {
        run_release_callbacks(self.resolution.take_callbacks());
    }

    /// Hand the release callbacks over to a new owner
    pub(crate) fn into_release_callbacks(mut self) -> Vec<ReleaseCallback> {
        self.resolution.take_callbacks()
    }
}

impl Drop for ValueWrapper {
    fn drop(&mut self) {
        run_release_callbacks(self.resolution.take_callbacks());
    }
}

impl fmt::Debug for ValueWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueWrapper")
            .field("value", &self.value)
            .field("hint", &self.hint)
            .field("resolution", &self.resolution)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn counting_wrapper(counter: &Rc<Cell<usize>>) -> ValueWrapper {
        let mut wrapper = ValueWrapper::new();
        let counter = Rc::clone(counter);
        wrapper
            .resolution_context()
            .register_release_callback(move || counter.set(counter.get() + 1));
        wrapper
    }

    #[test]
    fn test_release_runs_once() {
        let counter = Rc::new(Cell::new(0));
        counting_wrapper(&counter).release();
        assert_eq!(counter.get(), 1);
    }

    #[test]
    fn test_drop_releases() {
        let counter = Rc::new(Cell::new(0));
        drop(counting_wrapper(&counter));
        assert_eq!(counter.get(), 1);
    }

    #[test]
    fn test_handed_over_callbacks_are_not_run_on_drop() {
        let counter = Rc::new(Cell::new(0));
        let callbacks = counting_wrapper(&counter).into_release_callbacks();
        assert_eq!(counter.get(), 0);
        run_release_callbacks(callbacks);
        assert_eq!(counter.get(), 1);
    }

    #[test]
    fn test_null_states() {
        let mut wrapper = ValueWrapper::new();
        assert!(wrapper.is_null());
        wrapper.value = Some(Value::Null);
        assert!(wrapper.is_null());
        wrapper.value = Some(Value::Int(0));
        assert!(!wrapper.is_null());
    }
}
