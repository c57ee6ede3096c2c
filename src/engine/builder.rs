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

//! Engine builder

use super::configuration::EngineConfiguration;
use super::key_splitter::{DotKeySplitter, KeySplitter};
use super::locator::TemplateLocator;
use super::missing_value::{MissingValueHandler, NoOpMissingValueHandler};
use super::text_support::{HtmlTextSupport, TextSupport};
use super::MustacheEngine;
use crate::cache::{ComputingCacheFactory, DefaultComputingCacheFactory};
use crate::config::EngineConfig;
use crate::error::{MustacheError, Result};
use crate::model::Value;
use crate::resolver::{
    GlobalDataResolver, ListIndexResolver, MapResolver, ReflectionResolver, Resolver,
    ResolverInit, ThisResolver,
};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Assembles a [`MustacheEngine`]
///
/// # Examples
///
/// ```rust
/// use stencil::engine::{MapTemplateLocator, MustacheEngineBuilder};
/// use stencil::model::Value;
///
/// let engine = MustacheEngineBuilder::new()
///     .add_template_locator(MapTemplateLocator::new([("hello", "Hello {{name}}!")]))
///     .build()
///     .unwrap();
/// let template = engine.get_mustache("hello").unwrap().unwrap();
/// assert_eq!(template.render(Value::map([("name", "world")])).unwrap(), "Hello world!");
/// ```
pub struct MustacheEngineBuilder {
    config: EngineConfig,
    resolvers: Vec<Box<dyn Resolver>>,
    default_resolvers: bool,
    global_data: FxHashMap<String, Value>,
    locators: Vec<Arc<dyn TemplateLocator>>,
    missing_value_handler: Option<Arc<dyn MissingValueHandler>>,
    text_support: Option<Arc<dyn TextSupport>>,
    key_splitter: Option<Arc<dyn KeySplitter>>,
    cache_factory: Option<Arc<dyn ComputingCacheFactory>>,
}

impl MustacheEngineBuilder {
    /// Create a builder with the default configuration
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            resolvers: Vec::new(),
            default_resolvers: true,
            global_data: FxHashMap::default(),
            locators: Vec::new(),
            missing_value_handler: None,
            text_support: None,
            key_splitter: None,
            cache_factory: None,
        }
    }

    /// Replace the configuration values
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a resolver; ties in priority keep registration order
    pub fn add_resolver(mut self, resolver: impl Resolver + 'static) -> Self {
        self.resolvers.push(Box::new(resolver));
        self
    }

    /// Do not register the built-in resolvers
    pub fn omit_default_resolvers(mut self) -> Self {
        self.default_resolvers = false;
        self
    }

    /// Add a value resolvable from every template when no scope matches
    pub fn add_global_data(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.global_data.insert(name.into(), value.into());
        self
    }

    /// Register a template locator
    pub fn add_template_locator(mut self, locator: impl TemplateLocator + 'static) -> Self {
        self.locators.push(Arc::new(locator));
        self
    }

    /// Replace the default no-op missing value handler
    pub fn set_missing_value_handler(mut self, handler: impl MissingValueHandler + 'static) -> Self {
        self.missing_value_handler = Some(Arc::new(handler));
        self
    }

    /// Replace the default HTML escaping
    pub fn set_text_support(mut self, text_support: impl TextSupport + 'static) -> Self {
        self.text_support = Some(Arc::new(text_support));
        self
    }

    /// Replace the default dot key splitter
    pub fn set_key_splitter(mut self, key_splitter: impl KeySplitter + 'static) -> Self {
        self.key_splitter = Some(Arc::new(key_splitter));
        self
    }

    /// Replace the default in-process cache factory
    pub fn set_computing_cache_factory(mut self, factory: Arc<dyn ComputingCacheFactory>) -> Self {
        self.cache_factory = Some(factory);
        self
    }

    /// Build the engine
    ///
    /// Resolvers are initialized with the cache factory and sorted stably by
    /// ascending priority.
    pub fn build(self) -> Result<MustacheEngine> {
        if self.config.recursive_invocation_limit == 0 {
            return Err(MustacheError::InvalidConfiguration {
                message: "recursive_invocation_limit must be at least 1".to_string(),
            });
        }

        let cache_factory = self
            .cache_factory
            .unwrap_or_else(|| Arc::new(DefaultComputingCacheFactory));

        let mut resolvers = self.resolvers;
        let mut reflection = None;
        if self.default_resolvers {
            let reflection_resolver = ReflectionResolver::new();
            reflection = Some(reflection_resolver.clone());
            resolvers.push(Box::new(ThisResolver::new()));
            resolvers.push(Box::new(ListIndexResolver::new()));
            resolvers.push(Box::new(MapResolver::new()));
            resolvers.push(Box::new(reflection_resolver));
        }
        if !self.global_data.is_empty() {
            resolvers.push(Box::new(GlobalDataResolver::new(self.global_data)));
        }

        let init = ResolverInit {
            cache_factory: &cache_factory,
            config: &self.config,
        };
        for resolver in &mut resolvers {
            resolver.init(&init)?;
        }
        resolvers.sort_by_key(|resolver| resolver.priority());
        let resolvers: Vec<Arc<dyn Resolver>> = resolvers.into_iter().map(Arc::from).collect();

        log::debug!(
            "Building engine with resolvers [{}]",
            resolvers
                .iter()
                .map(|resolver| format!("{}:{}", resolver.name(), resolver.priority()))
                .collect::<Vec<_>>()
                .join(", ")
        );

        let mut locators = self.locators;
        locators.sort_by_key(|locator| locator.priority());

        let configuration = EngineConfiguration::new(
            self.config,
            resolvers,
            self.missing_value_handler
                .unwrap_or_else(|| Arc::new(NoOpMissingValueHandler)),
            self.text_support.unwrap_or_else(|| Arc::new(HtmlTextSupport)),
            self.key_splitter.unwrap_or_else(|| Arc::new(DotKeySplitter)),
            cache_factory,
        );

        let engine = MustacheEngine::new(configuration, locators, reflection);
        if engine.configuration().config().precompile_all_templates {
            engine.precompile_all_templates()?;
        }
        Ok(engine)
    }
}

impl Default for MustacheEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
