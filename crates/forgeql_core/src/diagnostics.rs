//! Diagnostic reporting for schema builds.
//!
//! Construction collects warnings and deferred errors into a per-build bag so
//! a single pass can surface everything at once instead of stopping at the
//! first problem.

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticSeverity {
    /// A problem that fails the build, possibly deferred to its end.
    Error,
    /// A problem the build continues through.
    Warning,
}

/// Where in the schema graph a diagnostic originated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    /// The named type the diagnostic points at.
    pub type_name: String,
    /// The field within that type, when the diagnostic is field-level.
    pub field_name: Option<String>,
}

impl Origin {
    /// Creates a type-level origin.
    pub fn type_level(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            field_name: None,
        }
    }

    /// Creates a field-level origin.
    pub fn field(type_name: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            field_name: Some(field_name.into()),
        }
    }
}

/// A diagnostic message.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Severity level.
    pub severity: DiagnosticSeverity,
    /// Diagnostic code (see [`codes`]).
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Originating type/field, when known.
    pub origin: Option<Origin>,
}

impl Diagnostic {
    /// Creates a new error diagnostic.
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            code: code.into(),
            message: message.into(),
            origin: None,
        }
    }

    /// Creates a new warning diagnostic.
    pub fn warning(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            code: code.into(),
            message: message.into(),
            origin: None,
        }
    }

    /// Attaches an origin to the diagnostic.
    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = Some(origin);
        self
    }
}

/// A collection of diagnostics gathered over one build.
#[derive(Debug, Default)]
pub struct DiagnosticBag {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticBag {
    /// Creates a new empty diagnostic bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a diagnostic.
    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Adds an error diagnostic with an origin.
    pub fn error(&mut self, code: impl Into<String>, message: impl Into<String>, origin: Origin) {
        self.add(Diagnostic::error(code, message).with_origin(origin));
    }

    /// Adds a warning diagnostic with an origin.
    pub fn warning(&mut self, code: impl Into<String>, message: impl Into<String>, origin: Origin) {
        self.add(Diagnostic::warning(code, message).with_origin(origin));
    }

    /// Returns true if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == DiagnosticSeverity::Error)
    }

    /// Returns an iterator over all diagnostics.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    /// Returns an iterator over errors.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == DiagnosticSeverity::Error)
    }

    /// Returns an iterator over warnings.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == DiagnosticSeverity::Warning)
    }

    /// Returns true if there are no diagnostics.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Returns the number of diagnostics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }
}

/// Common diagnostic codes.
pub mod codes {
    pub const DUPLICATE_TYPE: &str = "E0101";
    pub const EMPTY_MEMBERS: &str = "E0102";
    pub const LATE_EXTENSION: &str = "E0103";
    pub const MISSING_TYPE: &str = "E0110";
    pub const TYPE_MISMATCH: &str = "E0120";
    pub const INTERFACE_CYCLE: &str = "E0130";
    pub const DEPRECATED_USAGE: &str = "W0100";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_bag() {
        let mut bag = DiagnosticBag::new();
        bag.error(
            codes::MISSING_TYPE,
            "unknown type Post",
            Origin::field("Query", "posts"),
        );
        bag.warning(
            codes::DEPRECATED_USAGE,
            "legacy discriminator",
            Origin::type_level("SearchResult"),
        );

        assert!(bag.has_errors());
        assert_eq!(bag.errors().count(), 1);
        assert_eq!(bag.warnings().count(), 1);
        assert_eq!(bag.len(), 2);
    }

    #[test]
    fn test_origin_helpers() {
        let origin = Origin::field("User", "email");
        assert_eq!(origin.type_name, "User");
        assert_eq!(origin.field_name.as_deref(), Some("email"));
        assert!(Origin::type_level("User").field_name.is_none());
    }
}
