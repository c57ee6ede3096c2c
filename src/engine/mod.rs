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

//! Template engine
//!
//! The engine owns the immutable [`EngineConfiguration`] and two computing
//! caches obtained from the configured factory: compiled templates and
//! template sources. Both caches are created for the consumer id
//! [`COMPUTING_CACHE_CONSUMER_ID`].

mod builder;
mod configuration;
mod key_splitter;
mod locator;
mod missing_value;
mod text_support;

pub use builder::MustacheEngineBuilder;
pub use configuration::EngineConfiguration;
pub use key_splitter::{DotKeySplitter, KeyParts, KeySplitter};
pub use locator::{MapTemplateLocator, TemplateLocator};
pub use missing_value::{MissingValueHandler, NoOpMissingValueHandler, ThrowingMissingValueHandler};
pub use text_support::{HtmlTextSupport, TextSupport};

use crate::cache::{CacheSettings, ComputingCache, TypedCache};
use crate::error::{MustacheError, Result};
use crate::parser;
use crate::resolver::ReflectionResolver;
use crate::template::Template;
use std::fmt;
use std::sync::{Arc, Weak};

/// Consumer id of the template and template source caches
pub const COMPUTING_CACHE_CONSUMER_ID: &str = "stencil::engine::MustacheEngine";

type TemplateCache = TypedCache<String, Option<Arc<Template>>>;
type SourceCache = TypedCache<String, Option<Arc<str>>>;

pub(crate) struct EngineShared {
    configuration: EngineConfiguration,
    locators: Vec<Arc<dyn TemplateLocator>>,
    reflection: Option<ReflectionResolver>,
    template_cache: Option<TemplateCache>,
    source_cache: Option<SourceCache>,
}

impl EngineShared {
    fn locate(&self, name: &str) -> Result<Option<String>> {
        for locator in &self.locators {
            if let Some(source) = locator.locate(name)? {
                return Ok(Some(source));
            }
        }
        Ok(None)
    }

    fn load(&self, engine: &Weak<EngineShared>, name: &str) -> Result<Option<Arc<Template>>> {
        let Some(source) = self.locate(name)? else {
            log::debug!("Template {name} not found by any locator");
            return Ok(None);
        };
        let template = parser::compile(name, &source, &self.configuration, Weak::clone(engine))?;
        log::debug!("Compiled template {name}");
        Ok(Some(Arc::new(template)))
    }
}

/// Compiles, caches and renders templates
///
/// Cheap to clone; clones share configuration and caches. Safe to use from
/// any number of threads at once.
#[derive(Clone)]
pub struct MustacheEngine {
    shared: Arc<EngineShared>,
}

impl MustacheEngine {
    /// Start building an engine
    pub fn builder() -> MustacheEngineBuilder {
        MustacheEngineBuilder::new()
    }

    pub(crate) fn new(
        configuration: EngineConfiguration,
        locators: Vec<Arc<dyn TemplateLocator>>,
        reflection: Option<ReflectionResolver>,
    ) -> Self {
        let shared = Arc::new_cyclic(|weak: &Weak<EngineShared>| {
            let config = configuration.config();
            let (template_cache, source_cache) = if config.template_cache_enabled {
                let mut settings = CacheSettings::new();
                if let Some(expiration) = config.template_cache_expiration {
                    settings = settings.expire_after(expiration);
                }
                let factory = configuration.cache_factory();

                let engine = Weak::clone(weak);
                let template_cache = factory.create_cache(
                    COMPUTING_CACHE_CONSUMER_ID,
                    move |name: &String| -> Result<Option<Arc<Template>>> {
                        let shared = engine.upgrade().ok_or_else(|| MustacheError::EngineUnavailable {
                            template: name.clone(),
                        })?;
                        shared.load(&engine, name)
                    },
                    settings.clone(),
                );

                let engine = Weak::clone(weak);
                let source_cache = factory.create_cache(
                    COMPUTING_CACHE_CONSUMER_ID,
                    move |name: &String| -> Result<Option<Arc<str>>> {
                        let shared = engine.upgrade().ok_or_else(|| MustacheError::EngineUnavailable {
                            template: name.clone(),
                        })?;
                        Ok(shared.locate(name)?.map(Arc::from))
                    },
                    settings,
                );
                (Some(template_cache), Some(source_cache))
            } else {
                (None, None)
            };

            EngineShared {
                configuration,
                locators,
                reflection,
                template_cache,
                source_cache,
            }
        });
        Self { shared }
    }

    pub(crate) fn from_shared(shared: Arc<EngineShared>) -> Self {
        Self { shared }
    }

    /// The immutable configuration
    pub fn configuration(&self) -> &EngineConfiguration {
        &self.shared.configuration
    }

    /// Handle to the built-in reflection resolver, if default resolvers are registered
    pub fn reflection_resolver(&self) -> Option<&ReflectionResolver> {
        self.shared.reflection.as_ref()
    }

    /// Get the compiled template with the given name
    ///
    /// Served from the template cache when enabled; `None` if no locator
    /// knows the name.
    pub fn get_mustache(&self, name: &str) -> Result<Option<Arc<Template>>> {
        match &self.shared.template_cache {
            Some(cache) => cache.get(&name.to_string()),
            None => self.shared.load(&Arc::downgrade(&self.shared), name),
        }
    }

    /// Get the source of the template with the given name
    pub fn get_mustache_source(&self, name: &str) -> Result<Option<Arc<str>>> {
        match &self.shared.source_cache {
            Some(cache) => cache.get(&name.to_string()),
            None => Ok(self.shared.locate(name)?.map(Arc::from)),
        }
    }

    /// Compile a template from source, bypassing the template cache
    pub fn compile_mustache(&self, name: &str, source: &str) -> Result<Arc<Template>> {
        let template = parser::compile(
            name,
            source,
            &self.shared.configuration,
            Arc::downgrade(&self.shared),
        )?;
        Ok(Arc::new(template))
    }

    /// Drop cached templates and sources whose name matches the predicate
    pub fn invalidate_template_cache(&self, predicate: impl Fn(&str) -> bool) {
        log::debug!("Invalidating template cache");
        if let Some(cache) = &self.shared.template_cache {
            cache.invalidate(&|name: &String| predicate(name));
        }
        if let Some(cache) = &self.shared.source_cache {
            cache.invalidate(&|name: &String| predicate(name));
        }
    }

    /// Number of cached compiled templates
    pub fn template_cache_size(&self) -> usize {
        self.shared.template_cache.as_ref().map_or(0, |cache| cache.size())
    }

    fn precompile_all_templates(&self) -> Result<()> {
        let names: Vec<String> = self
            .shared
            .locators
            .iter()
            .flat_map(|locator| locator.all_identifiers())
            .collect();
        log::debug!("Precompiling {} templates", names.len());
        for name in names {
            self.get_mustache(&name)?;
        }
        Ok(())
    }
}

impl fmt::Debug for MustacheEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MustacheEngine")
            .field("configuration", &self.shared.configuration)
            .field("locators", &self.shared.locators)
            .field("template_cache", &self.shared.template_cache)
            .finish()
    }
}
