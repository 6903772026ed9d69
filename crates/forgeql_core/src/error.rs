//! Error taxonomy for schema construction.

use indexmap::IndexMap;
use thiserror::Error;

/// Provenance of an unresolved type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingTypeInfo {
    /// True when the name was needed to satisfy an output position on an
    /// object or interface (field type, implements list, union member).
    pub from_object: bool,
}

/// Errors raised while building a schema graph.
///
/// Every error aborts the build immediately except [`SchemaError::MissingTypes`],
/// which is deliberately deferred: construction substitutes an inert
/// placeholder for each unknown name so a single pass can report all of them.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Invalid or conflicting configuration: duplicate definitions, empty
    /// member sets, a plugin passed through the types channel, an extension
    /// arriving after its target finalized, or circular top-level
    /// construction.
    #[error("{0}")]
    Configuration(String),

    /// An interface declares itself in its own implements list.
    #[error("interface {0} cannot implement itself")]
    SelfImplementation(String),

    /// The interface-implementation graph contains a cycle.
    #[error("interface circular dependency detected: {}", .path.join(" -> "))]
    Cycle {
        /// The cycle, from the first repeated name back to itself.
        path: Vec<String>,
    },

    /// Referenced names with no definition, aggregated over the whole build.
    #[error("missing types in schema: {}", format_missing(.missing))]
    MissingTypes {
        /// Unresolved name to provenance, in discovery order.
        missing: IndexMap<String, MissingTypeInfo>,
    },

    /// A reference resolved to a concrete type of the wrong category.
    #[error("expected {type_name} to be {expected}, saw {actual}")]
    TypeMismatch {
        type_name: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// An interface or union cannot be disambiguated at runtime by any
    /// configured strategy.
    #[error("{0}")]
    AbstractType(String),
}

fn format_missing(missing: &IndexMap<String, MissingTypeInfo>) -> String {
    let mut names: Vec<&String> = missing.keys().collect();
    names.sort();
    names
        .iter()
        .map(|name| {
            if missing[name.as_str()].from_object {
                format!("{name} (referenced from an object or interface position)")
            } else {
                (*name).clone()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_types_message_lists_every_name() {
        let mut missing = IndexMap::new();
        missing.insert("N2".to_string(), MissingTypeInfo { from_object: false });
        missing.insert("N1".to_string(), MissingTypeInfo { from_object: true });

        let err = SchemaError::MissingTypes { missing };
        let msg = err.to_string();
        assert!(msg.contains("N1 (referenced from an object or interface position)"));
        assert!(msg.contains("N2"));
        // Sorted for stable output regardless of discovery order.
        assert!(msg.find("N1").unwrap() < msg.find("N2").unwrap());
    }

    #[test]
    fn test_cycle_message_renders_path() {
        let err = SchemaError::Cycle {
            path: vec!["A".into(), "B".into(), "A".into()],
        };
        assert_eq!(
            err.to_string(),
            "interface circular dependency detected: A -> B -> A"
        );
    }
}
