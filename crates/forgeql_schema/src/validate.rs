//! Post-build validation: deferred missing-type reporting and abstract-type
//! runtime checks.

use crate::config::Features;
use crate::schema::Schema;
use crate::types::{NamedType, ObjectType};
use forgeql_core::{MissingTypeInfo, SchemaError};
use indexmap::IndexMap;

/// Raises the single aggregated missing-type error if any referenced name
/// stayed unresolved through the whole build.
pub fn ensure_no_missing_types(
    missing: &IndexMap<String, MissingTypeInfo>,
) -> Result<(), SchemaError> {
    if missing.is_empty() {
        return Ok(());
    }
    Err(SchemaError::MissingTypes {
        missing: missing.clone(),
    })
}

/// Verifies every interface and union in the schema is disambiguable at
/// runtime through at least one enabled strategy: a discriminator function
/// on the abstract type, or a membership predicate on every concrete member.
///
/// The discriminant-field strategy disables this check entirely (see
/// `Features::normalized`).
pub fn ensure_abstract_types_resolvable(
    schema: &Schema,
    features: &Features,
) -> Result<(), SchemaError> {
    if !features.abstract_type_runtime_checks {
        return Ok(());
    }
    let strategies = &features.abstract_type_strategies;
    for ty in schema.type_map().values() {
        match &**ty {
            NamedType::Union(union) => {
                let by_resolve_type = strategies.resolve_type && union.resolve_type().is_some();
                let by_is_type_of = strategies.is_type_of
                    && union
                        .members()
                        .iter()
                        .all(|m| m.as_object().is_some_and(|o| o.is_type_of().is_some()));
                if !(by_resolve_type || by_is_type_of) {
                    return Err(abstract_type_error("union", union.name.as_str(), strategies));
                }
            }
            NamedType::Interface(interface) => {
                let by_resolve_type =
                    strategies.resolve_type && interface.resolve_type().is_some();
                let by_is_type_of = strategies.is_type_of
                    && implementors(schema, &interface.name)
                        .all(|o| o.is_type_of().is_some());
                if !(by_resolve_type || by_is_type_of) {
                    return Err(abstract_type_error(
                        "interface",
                        interface.name.as_str(),
                        strategies,
                    ));
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn implementors<'a>(
    schema: &'a Schema,
    interface_name: &'a str,
) -> impl Iterator<Item = &'a ObjectType> {
    schema
        .type_map()
        .values()
        .filter_map(|t| t.as_object())
        .filter(move |o| o.interfaces().iter().any(|i| i.name() == interface_name))
}

fn abstract_type_error(
    kind: &str,
    name: &str,
    strategies: &crate::config::AbstractTypeStrategies,
) -> SchemaError {
    let mut enabled = Vec::new();
    if strategies.resolve_type {
        enabled.push("a resolve_type discriminator on the type");
    }
    if strategies.is_type_of {
        enabled.push("an is_type_of predicate on every concrete member");
    }
    let hint = if enabled.is_empty() {
        "no abstract-type strategy is enabled".to_string()
    } else {
        format!("expected one of: {}", enabled.join(", "))
    };
    SchemaError::AbstractType(format!(
        "{kind} {name} cannot be disambiguated at runtime; {hint}"
    ))
}
