//! Core utilities for forgeql.
//!
//! This crate provides foundational types used throughout forgeql:
//! - `error`: The schema construction error taxonomy
//! - `diagnostics`: Warning collection and deferred-error reporting

pub mod diagnostics;
pub mod error;

pub use diagnostics::{Diagnostic, DiagnosticBag, DiagnosticSeverity, Origin};
pub use error::{MissingTypeInfo, SchemaError};
