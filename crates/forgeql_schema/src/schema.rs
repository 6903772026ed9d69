//! The assembled schema and its schema-wide extension metadata.

use crate::builder::{BuildOutput, SchemaBuilder};
use crate::config::{Features, NonNullDefaults, SchemaConfig};
use crate::types::{NamedType, TypeKind};
use crate::validate;
use forgeql_core::SchemaError;
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A registered dynamic method, described for downstream consumers.
#[derive(Debug, Clone)]
pub struct DynamicMethodInfo {
    /// The method name definition blocks invoke.
    pub name: String,
    /// For terse scalar shorthands, the scalar the method declares.
    pub scalar: Option<String>,
}

/// Schema-wide metadata carried for downstream consumers: the config
/// snapshot, the dynamic-method registries, and the root-type annotations an
/// external type-declaration generator consumes.
#[derive(Debug, Clone)]
pub struct SchemaExtension {
    pub features: Features,
    pub non_null_defaults: NonNullDefaults,
    pub options: IndexMap<String, Value>,
    pub dynamic_output_methods: Vec<DynamicMethodInfo>,
    pub dynamic_input_methods: Vec<DynamicMethodInfo>,
    /// Type name to backing source-type path.
    pub root_typings: IndexMap<String, String>,
}

/// A fully built, validated schema.
#[derive(Clone)]
pub struct Schema {
    types: IndexMap<String, Arc<NamedType>>,
    query: Arc<NamedType>,
    mutation: Option<Arc<NamedType>>,
    subscription: Option<Arc<NamedType>>,
    extension: Arc<SchemaExtension>,
}

impl Schema {
    /// The complete name → type map.
    pub fn type_map(&self) -> &IndexMap<String, Arc<NamedType>> {
        &self.types
    }

    /// Looks up a type by name.
    pub fn get_type(&self, name: &str) -> Option<&Arc<NamedType>> {
        self.types.get(name)
    }

    /// The root query type.
    pub fn query_type(&self) -> &Arc<NamedType> {
        &self.query
    }

    /// The root mutation type, if defined.
    pub fn mutation_type(&self) -> Option<&Arc<NamedType>> {
        self.mutation.as_ref()
    }

    /// The root subscription type, if defined.
    pub fn subscription_type(&self) -> Option<&Arc<NamedType>> {
        self.subscription.as_ref()
    }

    /// Schema-wide extension metadata.
    pub fn extension(&self) -> &Arc<SchemaExtension> {
        &self.extension
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("types", &self.types.len())
            .field("has_mutation", &self.mutation.is_some())
            .field("has_subscription", &self.subscription.is_some())
            .finish()
    }
}

/// Builds and validates a schema from the given config.
///
/// Construction errors abort immediately; missing-type failures are
/// deferred so the aggregated error lists every unresolved name. After-build
/// hooks run against the assembled schema before the deferred checks.
pub fn make_schema(config: SchemaConfig) -> Result<Schema, SchemaError> {
    let output = SchemaBuilder::new(config).build()?;
    let schema = assemble_schema(&output)?;
    for hook in &output.after_build_fns {
        hook(&schema);
    }
    validate::ensure_no_missing_types(&output.missing_types)?;
    validate::ensure_abstract_types_resolvable(&schema, &output.config.features)?;
    Ok(schema)
}

fn assemble_schema(output: &BuildOutput) -> Result<Schema, SchemaError> {
    let query = root_type(output, "Query")?
        .ok_or_else(|| SchemaError::Configuration("schema is missing a Query type".to_string()))?;
    let mutation = root_type(output, "Mutation")?;
    let subscription = root_type(output, "Subscription")?;
    Ok(Schema {
        types: output.types.clone(),
        query,
        mutation,
        subscription,
        extension: Arc::clone(&output.schema_extension),
    })
}

fn root_type(output: &BuildOutput, name: &str) -> Result<Option<Arc<NamedType>>, SchemaError> {
    let Some(ty) = output.types.get(name) else {
        return Ok(None);
    };
    if ty.kind() != TypeKind::Object {
        return Err(SchemaError::TypeMismatch {
            type_name: name.to_string(),
            expected: "an object type",
            actual: ty.kind().as_str(),
        });
    }
    Ok(Some(Arc::clone(ty)))
}
