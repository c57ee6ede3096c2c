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

//! Engine configuration options

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration values of a [`MustacheEngine`](crate::engine::MustacheEngine)
///
/// Missing fields take their default when deserialized, so a configuration
/// file only needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Cache resolution strategies per value reference
    pub resolver_hints_enabled: bool,

    /// Cache compiled templates and template sources
    pub template_cache_enabled: bool,

    /// Optional TTL of template cache entries
    pub template_cache_expiration: Option<Duration>,

    /// Maximum number of memoized reflection members
    pub reflection_cache_max_size: Option<usize>,

    /// How many times one template may be nested within a single render
    pub recursive_invocation_limit: usize,

    /// Write values without HTML escaping
    pub skip_value_escaping: bool,

    /// Compile every template the locators know about while building the engine
    pub precompile_all_templates: bool,
}

impl EngineConfig {
    /// Create a configuration optimized for high performance
    pub fn high_performance() -> Self {
        Self {
            reflection_cache_max_size: None, // Unbounded
            precompile_all_templates: true,
            ..Self::default()
        }
    }

    /// Create a configuration with every cache disabled
    pub fn no_caching() -> Self {
        Self {
            resolver_hints_enabled: false,
            template_cache_enabled: false,
            reflection_cache_max_size: Some(0),
            ..Self::default()
        }
    }

    /// Create a configuration for testing
    pub fn testing() -> Self {
        Self {
            template_cache_expiration: Some(Duration::from_millis(100)), // Very short TTL for tests
            reflection_cache_max_size: Some(100),
            recursive_invocation_limit: 5,
            ..Self::default()
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            resolver_hints_enabled: true,
            template_cache_enabled: true,
            template_cache_expiration: None,
            reflection_cache_max_size: Some(10_000),
            recursive_invocation_limit: 10,
            skip_value_escaping: false,
            precompile_all_templates: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_default() {
        let config = EngineConfig::default();
        assert!(config.resolver_hints_enabled);
        assert!(config.template_cache_enabled);
        assert_eq!(config.template_cache_expiration, None);
        assert_eq!(config.reflection_cache_max_size, Some(10_000));
        assert_eq!(config.recursive_invocation_limit, 10);
        assert!(!config.skip_value_escaping);
        assert!(!config.precompile_all_templates);
    }

    #[test]
    fn test_engine_config_high_performance() {
        let config = EngineConfig::high_performance();
        assert!(config.resolver_hints_enabled);
        assert_eq!(config.reflection_cache_max_size, None);
        assert!(config.precompile_all_templates);
    }

    #[test]
    fn test_engine_config_no_caching() {
        let config = EngineConfig::no_caching();
        assert!(!config.resolver_hints_enabled);
        assert!(!config.template_cache_enabled);
        assert_eq!(config.reflection_cache_max_size, Some(0));
    }

    #[test]
    fn test_engine_config_testing() {
        let config = EngineConfig::testing();
        assert_eq!(config.template_cache_expiration, Some(Duration::from_millis(100)));
        assert_eq!(config.recursive_invocation_limit, 5);
    }

    #[test]
    fn test_engine_config_partial_json() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"resolver_hints_enabled": false}"#).unwrap();
        assert!(!config.resolver_hints_enabled);
        assert!(config.template_cache_enabled);
        assert_eq!(config.recursive_invocation_limit, 10);
    }
}
