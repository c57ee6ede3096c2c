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

//! Resolver hints
//!
//! A hint is a cached resolution strategy bound to one single-part value
//! reference of one compiled template. It is tried against the innermost
//! context object before the resolver chain; when it finds nothing the chain
//! is walked as usual and the hint stays in place.

use super::ResolutionContext;
use crate::error::Result;
use crate::model::Value;
use once_cell::sync::{Lazy, OnceCell};
use std::fmt;
use std::sync::Arc;

/// Fast-path resolution strategy
pub trait Hint: Send + Sync + fmt::Debug {
    /// Resolve the name against the innermost context object
    ///
    /// `Ok(None)` means the hint does not apply to this lookup.
    fn resolve(
        &self,
        context_object: Option<&Value>,
        name: &str,
        context: &mut ResolutionContext,
    ) -> Result<Option<Value>>;

    /// Inapplicable hints are never tried
    fn is_applicable(&self) -> bool {
        true
    }
}

#[derive(Debug)]
struct InapplicableHint;

impl Hint for InapplicableHint {
    fn resolve(
        &self,
        _context_object: Option<&Value>,
        _name: &str,
        _context: &mut ResolutionContext,
    ) -> Result<Option<Value>> {
        Ok(None)
    }

    fn is_applicable(&self) -> bool {
        false
    }
}

static INAPPLICABLE: Lazy<Arc<dyn Hint>> = Lazy::new(|| Arc::new(InapplicableHint));

/// Sentinel marking a reference whose resolver cannot provide a hint
pub fn inapplicable() -> Arc<dyn Hint> {
    Arc::clone(&INAPPLICABLE)
}

/// Set-once cell holding the hint of a value segment
///
/// Reads never block. The first successful `set` wins; later hints are
/// dropped even if they would apply as well.
#[derive(Default)]
pub struct HintSlot {
    hint: OnceCell<Arc<dyn Hint>>,
}

impl HintSlot {
    /// Create an empty slot
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached hint, if any
    pub fn get(&self) -> Option<&Arc<dyn Hint>> {
        self.hint.get()
    }

    /// Store the hint unless one is already set; returns whether it was stored
    pub fn set(&self, hint: Arc<dyn Hint>) -> bool {
        let stored = self.hint.set(hint).is_ok();
        if stored {
            log::trace!("Hint slot populated");
        }
        stored
    }

    /// Check whether a hint (possibly the inapplicable sentinel) is set
    pub fn is_set(&self) -> bool {
        self.hint.get().is_some()
    }
}

impl fmt::Debug for HintSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HintSlot").field("hint", &self.hint.get()).finish()
    }
}
