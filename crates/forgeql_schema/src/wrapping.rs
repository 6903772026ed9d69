//! Wrapping stacks and nullability resolution for type references.

use crate::types::{NamedType, ResolvedType};
use std::sync::Arc;

/// A single operator in a declared wrapping stack, ordered innermost-first
/// outward from the named type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapOp {
    /// Wrap the current layer in a list.
    List,
    /// Mark the current layer non-null.
    NonNull,
    /// Mark the current layer explicitly nullable, overriding any default.
    Nullable,
}

/// A finalized operator: nullability defaults already applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalWrap {
    List,
    NonNull,
}

/// Resolves a declared wrapping stack against the nullability defaults.
///
/// Precedence: an explicit per-field override replaces the declared stack
/// entirely; within whichever stack applies, a layer with no explicit
/// `NonNull`/`Nullable` marker takes `non_null_default`.
pub fn finalize_wrapping(
    non_null_default: bool,
    declared: &[WrapOp],
    field_override: Option<&[WrapOp]>,
) -> Vec<FinalWrap> {
    let ops = field_override.unwrap_or(declared);
    let mut out = Vec::with_capacity(ops.len() + 1);
    // Nullability of the layer currently being settled; None means "use the
    // default when the next list boundary (or the end) is reached".
    let mut current: Option<bool> = None;
    for op in ops {
        match op {
            WrapOp::NonNull => current = Some(true),
            WrapOp::Nullable => current = Some(false),
            WrapOp::List => {
                if current.unwrap_or(non_null_default) {
                    out.push(FinalWrap::NonNull);
                }
                out.push(FinalWrap::List);
                current = None;
            }
        }
    }
    if current.unwrap_or(non_null_default) {
        out.push(FinalWrap::NonNull);
    }
    out
}

/// Applies a finalized wrap stack around a named type, innermost-first.
pub fn rewrap(named: Arc<NamedType>, wrapping: &[FinalWrap]) -> ResolvedType {
    let mut ty = ResolvedType::Named(named);
    for op in wrapping {
        ty = match op {
            FinalWrap::List => ResolvedType::List(Box::new(ty)),
            FinalWrap::NonNull => ResolvedType::NonNull(Box::new(ty)),
        };
    }
    ty
}

/// Unwraps a resolved type back into its named core and the finalized stack
/// that produced it.
pub fn unwrap_resolved(ty: &ResolvedType) -> (Arc<NamedType>, Vec<FinalWrap>) {
    let mut outward = Vec::new();
    let mut current = ty;
    loop {
        match current {
            ResolvedType::Named(named) => {
                outward.reverse();
                return (Arc::clone(named), outward);
            }
            ResolvedType::List(inner) => {
                outward.push(FinalWrap::List);
                current = inner;
            }
            ResolvedType::NonNull(inner) => {
                outward.push(FinalWrap::NonNull);
                current = inner;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScalarType;

    fn scalar(name: &str) -> Arc<NamedType> {
        Arc::new(NamedType::Scalar(ScalarType::new(name)))
    }

    #[test]
    fn test_bare_type_takes_default() {
        assert_eq!(finalize_wrapping(false, &[], None), vec![]);
        assert_eq!(finalize_wrapping(true, &[], None), vec![FinalWrap::NonNull]);
    }

    #[test]
    fn test_explicit_marker_beats_default() {
        assert_eq!(finalize_wrapping(true, &[WrapOp::Nullable], None), vec![]);
        assert_eq!(
            finalize_wrapping(false, &[WrapOp::NonNull], None),
            vec![FinalWrap::NonNull]
        );
    }

    #[test]
    fn test_list_layers_settle_independently() {
        // [String]! with default-nullable inner
        assert_eq!(
            finalize_wrapping(false, &[WrapOp::List, WrapOp::NonNull], None),
            vec![FinalWrap::List, FinalWrap::NonNull]
        );
        // [String!] via default
        assert_eq!(
            finalize_wrapping(true, &[WrapOp::List, WrapOp::Nullable], None),
            vec![FinalWrap::NonNull, FinalWrap::List]
        );
    }

    #[test]
    fn test_field_override_replaces_declared_stack() {
        let declared = [WrapOp::List, WrapOp::NonNull];
        let over = [WrapOp::NonNull];
        assert_eq!(
            finalize_wrapping(false, &declared, Some(&over)),
            vec![FinalWrap::NonNull]
        );
    }

    #[test]
    fn test_rewrap_then_unwrap_round_trips() {
        let wrapping = vec![FinalWrap::NonNull, FinalWrap::List, FinalWrap::NonNull];
        let ty = rewrap(scalar("String"), &wrapping);
        assert_eq!(ty.to_string(), "[String!]!");
        let (named, unwrapped) = unwrap_resolved(&ty);
        assert_eq!(named.name(), "String");
        assert_eq!(unwrapped, wrapping);
    }
}
