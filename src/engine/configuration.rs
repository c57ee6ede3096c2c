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

//! Immutable engine configuration bundle

use super::key_splitter::KeySplitter;
use super::missing_value::MissingValueHandler;
use super::text_support::TextSupport;
use crate::cache::ComputingCacheFactory;
use crate::config::EngineConfig;
use crate::resolver::Resolver;
use std::fmt;
use std::sync::Arc;

/// Everything a render reads from the engine
///
/// Built once by [`MustacheEngineBuilder`](super::MustacheEngineBuilder) and
/// shared read-only by every render afterwards.
pub struct EngineConfiguration {
    config: EngineConfig,
    resolvers: Vec<Arc<dyn Resolver>>,
    missing_value_handler: Arc<dyn MissingValueHandler>,
    text_support: Arc<dyn TextSupport>,
    key_splitter: Arc<dyn KeySplitter>,
    cache_factory: Arc<dyn ComputingCacheFactory>,
}

impl EngineConfiguration {
    pub(crate) fn new(
        config: EngineConfig,
        resolvers: Vec<Arc<dyn Resolver>>,
        missing_value_handler: Arc<dyn MissingValueHandler>,
        text_support: Arc<dyn TextSupport>,
        key_splitter: Arc<dyn KeySplitter>,
        cache_factory: Arc<dyn ComputingCacheFactory>,
    ) -> Self {
        Self {
            config,
            resolvers,
            missing_value_handler,
            text_support,
            key_splitter,
            cache_factory,
        }
    }

    /// Configuration values
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Resolvers in the order they are tried
    pub fn resolvers(&self) -> &[Arc<dyn Resolver>] {
        &self.resolvers
    }

    /// Policy for missing values
    pub fn missing_value_handler(&self) -> &dyn MissingValueHandler {
        self.missing_value_handler.as_ref()
    }

    /// Escaping service
    pub fn text_support(&self) -> &dyn TextSupport {
        self.text_support.as_ref()
    }

    /// Key splitter used at compilation
    pub fn key_splitter(&self) -> &dyn KeySplitter {
        self.key_splitter.as_ref()
    }

    /// Factory every engine cache comes from
    pub fn cache_factory(&self) -> &Arc<dyn ComputingCacheFactory> {
        &self.cache_factory
    }
}

impl fmt::Debug for EngineConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let resolvers: Vec<(&str, i32)> = self
            .resolvers
            .iter()
            .map(|resolver| (resolver.name(), resolver.priority()))
            .collect();
        f.debug_struct("EngineConfiguration")
            .field("config", &self.config)
            .field("resolvers", &resolvers)
            .field("cache_factory", &self.cache_factory)
            .finish_non_exhaustive()
    }
}
