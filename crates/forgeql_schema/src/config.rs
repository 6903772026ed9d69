//! Build configuration: feature flags, nullability defaults, and the
//! heterogeneous types channel.

use crate::definition::TypeSource;
use crate::plugin::Plugin;
use crate::schema::Schema;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Strategies for disambiguating abstract types at runtime.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AbstractTypeStrategies {
    /// A discriminator function on the interface/union itself.
    pub resolve_type: bool,
    /// A membership predicate on each concrete object type.
    pub is_type_of: bool,
    /// A discriminant field carried by resolved values.
    pub discriminant_field: bool,
}

impl Default for AbstractTypeStrategies {
    fn default() -> Self {
        Self {
            resolve_type: true,
            is_type_of: false,
            discriminant_field: false,
        }
    }
}

/// Feature flags governing post-build validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Features {
    /// Check once, after the schema exists, that every abstract type is
    /// runtime-disambiguable through at least one enabled strategy.
    pub abstract_type_runtime_checks: bool,
    /// Which disambiguation strategies are enabled.
    pub abstract_type_strategies: AbstractTypeStrategies,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            abstract_type_runtime_checks: true,
            abstract_type_strategies: AbstractTypeStrategies::default(),
        }
    }
}

impl Features {
    /// Applies the defaulting rules that depend on other flags.
    pub(crate) fn normalized(mut self) -> Self {
        // Whether resolved values carry the discriminant field cannot be
        // known at build time, so the runtime check is meaningless with that
        // strategy enabled.
        if self.abstract_type_strategies.discriminant_field {
            self.abstract_type_runtime_checks = false;
        }
        self
    }
}

/// Schema-wide nullability defaults, applied when a reference carries no
/// explicit marker and its type declares no override.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct NonNullDefaults {
    pub input: bool,
    pub output: bool,
}

/// Per-type nullability overrides; `None` falls through to the global
/// default.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct NonNullOverrides {
    pub input: Option<bool>,
    pub output: Option<bool>,
}

/// Heterogeneous input accepted by the types channel: single definitions,
/// nested collections, whole already-built schemas. A plugin found here is
/// rejected with a descriptive error; plugins have their own channel.
#[derive(Debug)]
pub enum SchemaSource {
    Type(Arc<TypeSource>),
    List(Vec<SchemaSource>),
    Map(IndexMap<String, SchemaSource>),
    Schema(Schema),
    Plugin(Plugin),
}

impl From<TypeSource> for SchemaSource {
    fn from(source: TypeSource) -> Self {
        Self::Type(Arc::new(source))
    }
}

impl From<Arc<TypeSource>> for SchemaSource {
    fn from(source: Arc<TypeSource>) -> Self {
        Self::Type(source)
    }
}

impl From<Vec<SchemaSource>> for SchemaSource {
    fn from(sources: Vec<SchemaSource>) -> Self {
        Self::List(sources)
    }
}

impl From<Schema> for SchemaSource {
    fn from(schema: Schema) -> Self {
        Self::Schema(schema)
    }
}

impl From<Plugin> for SchemaSource {
    fn from(plugin: Plugin) -> Self {
        Self::Plugin(plugin)
    }
}

/// Everything a build starts from.
#[derive(Debug, Default)]
pub struct SchemaConfig {
    /// The types channel, flattened recursively at registration.
    pub types: Vec<SchemaSource>,
    /// Installed plugins, in hook-invocation order.
    pub plugins: Vec<Plugin>,
    /// Post-build validation flags.
    pub features: Features,
    /// Global nullability defaults.
    pub non_null_defaults: NonNullDefaults,
    /// Free-form options, readable and settable through the registry lens.
    pub options: IndexMap<String, Value>,
}

impl SchemaConfig {
    /// Creates an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a single type source.
    pub fn with_type(mut self, source: impl Into<Arc<TypeSource>>) -> Self {
        self.types.push(SchemaSource::Type(source.into()));
        self
    }

    /// Adds a batch from the heterogeneous types channel.
    pub fn with_types(mut self, source: impl Into<SchemaSource>) -> Self {
        self.types.push(source.into());
        self
    }

    /// Installs a plugin.
    pub fn with_plugin(mut self, plugin: Plugin) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Sets the feature flags.
    pub fn with_features(mut self, features: Features) -> Self {
        self.features = features;
        self
    }

    /// Sets the global nullability defaults.
    pub fn with_non_null_defaults(mut self, defaults: NonNullDefaults) -> Self {
        self.non_null_defaults = defaults;
        self
    }

    /// Sets a free-form option.
    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }
}

/// The settings portion of the config, shared with hooks and carried on the
/// schema extension after the types and plugins are consumed.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub features: Features,
    pub non_null_defaults: NonNullDefaults,
    pub options: IndexMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discriminant_strategy_disables_runtime_checks() {
        let features = Features {
            abstract_type_runtime_checks: true,
            abstract_type_strategies: AbstractTypeStrategies {
                resolve_type: true,
                is_type_of: false,
                discriminant_field: true,
            },
        }
        .normalized();
        assert!(!features.abstract_type_runtime_checks);

        let default = Features::default().normalized();
        assert!(default.abstract_type_runtime_checks);
        assert!(default.abstract_type_strategies.resolve_type);
    }

    #[test]
    fn test_config_builders() {
        let config = SchemaConfig::new()
            .with_non_null_defaults(NonNullDefaults {
                input: false,
                output: true,
            })
            .with_option("generate_artifacts", serde_json::json!(false));
        assert!(config.non_null_defaults.output);
        assert_eq!(
            config.options.get("generate_artifacts"),
            Some(&serde_json::json!(false))
        );
    }
}
