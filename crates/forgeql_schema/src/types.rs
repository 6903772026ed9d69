//! Concrete schema types produced by the builder.
//!
//! Built types are two-phase: an immediately available shell carrying
//! identity, plus lazily resolved slots (field maps, interface lists, union
//! members) the builder fills on first demand. Two mutually referencing
//! shells therefore resolve correctly as long as neither slot is forced
//! before both shells exist. On a finished schema every slot is resolved.

use crate::resolver::Resolver;
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// The six named-type categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Scalar,
    Object,
    Interface,
    Union,
    Enum,
    InputObject,
}

impl TypeKind {
    /// Short lowercase name, for messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::Object => "object",
            Self::Interface => "interface",
            Self::Union => "union",
            Self::Enum => "enum",
            Self::InputObject => "input object",
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime type-discrimination function for abstract types: maps a resolved
/// value to the name of its concrete object type.
pub type ResolveTypeFn = Arc<dyn Fn(&Value) -> Option<String> + Send + Sync>;

/// Per-object runtime membership predicate.
pub type IsTypeOfFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Scalar serialize/parse behavior.
pub type ScalarValueFn = Arc<dyn Fn(&Value) -> Result<Value, String> + Send + Sync>;

/// A fully built named type, shared throughout the graph.
pub enum NamedType {
    Scalar(ScalarType),
    Object(ObjectType),
    Interface(InterfaceType),
    Union(UnionType),
    Enum(EnumType),
    InputObject(InputObjectType),
}

impl NamedType {
    /// The unique type name.
    pub fn name(&self) -> &str {
        match self {
            Self::Scalar(t) => &t.name,
            Self::Object(t) => &t.name,
            Self::Interface(t) => &t.name,
            Self::Union(t) => &t.name,
            Self::Enum(t) => &t.name,
            Self::InputObject(t) => &t.name,
        }
    }

    /// The type category.
    pub fn kind(&self) -> TypeKind {
        match self {
            Self::Scalar(_) => TypeKind::Scalar,
            Self::Object(_) => TypeKind::Object,
            Self::Interface(_) => TypeKind::Interface,
            Self::Union(_) => TypeKind::Union,
            Self::Enum(_) => TypeKind::Enum,
            Self::InputObject(_) => TypeKind::InputObject,
        }
    }

    /// The type description, if any.
    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Scalar(t) => t.description.as_deref(),
            Self::Object(t) => t.description.as_deref(),
            Self::Interface(t) => t.description.as_deref(),
            Self::Union(t) => t.description.as_deref(),
            Self::Enum(t) => t.description.as_deref(),
            Self::InputObject(t) => t.description.as_deref(),
        }
    }

    pub fn as_object(&self) -> Option<&ObjectType> {
        match self {
            Self::Object(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_interface(&self) -> Option<&InterfaceType> {
        match self {
            Self::Interface(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_union(&self) -> Option<&UnionType> {
        match self {
            Self::Union(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumType> {
        match self {
            Self::Enum(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_input_object(&self) -> Option<&InputObjectType> {
        match self {
            Self::InputObject(t) => Some(t),
            _ => None,
        }
    }

    /// True for types valid in output (field) positions.
    pub fn is_output(&self) -> bool {
        !matches!(self, Self::InputObject(_))
    }

    /// True for types valid in input (argument / input field) positions.
    pub fn is_input(&self) -> bool {
        matches!(self, Self::Scalar(_) | Self::Enum(_) | Self::InputObject(_))
    }

    /// True for interfaces and unions.
    pub fn is_abstract(&self) -> bool {
        matches!(self, Self::Interface(_) | Self::Union(_))
    }
}

impl fmt::Debug for NamedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedType")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .finish()
    }
}

/// A scalar type, carrying pass-through parse/serialize behavior.
pub struct ScalarType {
    pub name: String,
    pub description: Option<String>,
    pub serialize: Option<ScalarValueFn>,
    pub parse_value: Option<ScalarValueFn>,
}

impl ScalarType {
    /// Creates a new scalar type.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            serialize: None,
            parse_value: None,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Sets the serialize function.
    pub fn with_serialize(mut self, f: ScalarValueFn) -> Self {
        self.serialize = Some(f);
        self
    }

    /// Sets the parse function.
    pub fn with_parse_value(mut self, f: ScalarValueFn) -> Self {
        self.parse_value = Some(f);
        self
    }
}

/// An object type: shell plus lazily resolved interface list and field map.
pub struct ObjectType {
    pub name: String,
    pub description: Option<String>,
    is_type_of: Option<IsTypeOfFn>,
    interfaces: OnceLock<Vec<Arc<NamedType>>>,
    fields: OnceLock<IndexMap<String, OutputField>>,
}

impl ObjectType {
    pub(crate) fn shell(
        name: impl Into<String>,
        description: Option<String>,
        is_type_of: Option<IsTypeOfFn>,
    ) -> Self {
        Self {
            name: name.into(),
            description,
            is_type_of,
            interfaces: OnceLock::new(),
            fields: OnceLock::new(),
        }
    }

    /// The fields of this type, inherited fields included.
    pub fn fields(&self) -> &IndexMap<String, OutputField> {
        self.fields
            .get()
            .expect("object fields are resolved during schema build")
    }

    /// Looks up a field by name.
    pub fn field(&self, name: &str) -> Option<&OutputField> {
        self.fields().get(name)
    }

    /// The interfaces this type implements, transitively closed.
    pub fn interfaces(&self) -> &[Arc<NamedType>] {
        self.interfaces
            .get()
            .expect("object interfaces are resolved during schema build")
    }

    /// The runtime membership predicate, if configured.
    pub fn is_type_of(&self) -> Option<&IsTypeOfFn> {
        self.is_type_of.as_ref()
    }

    pub(crate) fn set_fields(&self, fields: IndexMap<String, OutputField>) {
        self.fields
            .set(fields)
            .map_err(|_| ())
            .expect("object fields are resolved once per build");
    }

    pub(crate) fn set_interfaces(&self, interfaces: Vec<Arc<NamedType>>) {
        self.interfaces
            .set(interfaces)
            .map_err(|_| ())
            .expect("object interfaces are resolved once per build");
    }
}

/// An interface type: shell plus lazily resolved interface list and field map.
pub struct InterfaceType {
    pub name: String,
    pub description: Option<String>,
    resolve_type: Option<ResolveTypeFn>,
    interfaces: OnceLock<Vec<Arc<NamedType>>>,
    fields: OnceLock<IndexMap<String, OutputField>>,
}

impl InterfaceType {
    pub(crate) fn shell(
        name: impl Into<String>,
        description: Option<String>,
        resolve_type: Option<ResolveTypeFn>,
    ) -> Self {
        Self {
            name: name.into(),
            description,
            resolve_type,
            interfaces: OnceLock::new(),
            fields: OnceLock::new(),
        }
    }

    /// The fields declared on this interface.
    pub fn fields(&self) -> &IndexMap<String, OutputField> {
        self.fields
            .get()
            .expect("interface fields are resolved during schema build")
    }

    /// Looks up a field by name.
    pub fn field(&self, name: &str) -> Option<&OutputField> {
        self.fields().get(name)
    }

    /// The interfaces this interface itself implements.
    pub fn interfaces(&self) -> &[Arc<NamedType>] {
        self.interfaces
            .get()
            .expect("interface interfaces are resolved during schema build")
    }

    /// The runtime discriminator, if configured.
    pub fn resolve_type(&self) -> Option<&ResolveTypeFn> {
        self.resolve_type.as_ref()
    }

    pub(crate) fn set_fields(&self, fields: IndexMap<String, OutputField>) {
        self.fields
            .set(fields)
            .map_err(|_| ())
            .expect("interface fields are resolved once per build");
    }

    pub(crate) fn set_interfaces(&self, interfaces: Vec<Arc<NamedType>>) {
        self.interfaces
            .set(interfaces)
            .map_err(|_| ())
            .expect("interface interfaces are resolved once per build");
    }
}

/// A union type: shell plus lazily resolved member list.
pub struct UnionType {
    pub name: String,
    pub description: Option<String>,
    resolve_type: Option<ResolveTypeFn>,
    members: OnceLock<Vec<Arc<NamedType>>>,
}

impl UnionType {
    pub(crate) fn shell(
        name: impl Into<String>,
        description: Option<String>,
        resolve_type: Option<ResolveTypeFn>,
    ) -> Self {
        Self {
            name: name.into(),
            description,
            resolve_type,
            members: OnceLock::new(),
        }
    }

    /// The member object types.
    pub fn members(&self) -> &[Arc<NamedType>] {
        self.members
            .get()
            .expect("union members are resolved during schema build")
    }

    /// The runtime discriminator, if configured.
    pub fn resolve_type(&self) -> Option<&ResolveTypeFn> {
        self.resolve_type.as_ref()
    }

    pub(crate) fn set_members(&self, members: Vec<Arc<NamedType>>) {
        self.members
            .set(members)
            .map_err(|_| ())
            .expect("union members are resolved once per build");
    }
}

/// An enum type. Members are resolved eagerly at construction.
#[derive(Debug, Clone)]
pub struct EnumType {
    pub name: String,
    pub description: Option<String>,
    pub values: IndexMap<String, EnumValue>,
}

/// A single enum member.
#[derive(Debug, Clone)]
pub struct EnumValue {
    pub name: String,
    pub value: Value,
    pub description: Option<String>,
    pub deprecation_reason: Option<String>,
}

/// An input object type: shell plus lazily resolved field map.
pub struct InputObjectType {
    pub name: String,
    pub description: Option<String>,
    fields: OnceLock<IndexMap<String, InputValue>>,
}

impl InputObjectType {
    pub(crate) fn shell(name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            name: name.into(),
            description,
            fields: OnceLock::new(),
        }
    }

    /// The input fields of this type.
    pub fn fields(&self) -> &IndexMap<String, InputValue> {
        self.fields
            .get()
            .expect("input object fields are resolved during schema build")
    }

    /// Looks up a field by name.
    pub fn field(&self, name: &str) -> Option<&InputValue> {
        self.fields().get(name)
    }

    pub(crate) fn set_fields(&self, fields: IndexMap<String, InputValue>) {
        self.fields
            .set(fields)
            .map_err(|_| ())
            .expect("input object fields are resolved once per build");
    }
}

/// A resolved type reference: a named type under zero or more wrappers.
#[derive(Clone)]
pub enum ResolvedType {
    Named(Arc<NamedType>),
    List(Box<ResolvedType>),
    NonNull(Box<ResolvedType>),
}

impl ResolvedType {
    /// The innermost named type.
    pub fn named_type(&self) -> &Arc<NamedType> {
        match self {
            Self::Named(t) => t,
            Self::List(inner) | Self::NonNull(inner) => inner.named_type(),
        }
    }

    /// True if the outermost layer is non-null.
    pub fn is_non_null(&self) -> bool {
        matches!(self, Self::NonNull(_))
    }
}

impl fmt::Display for ResolvedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(t) => f.write_str(t.name()),
            Self::List(inner) => write!(f, "[{inner}]"),
            Self::NonNull(inner) => write!(f, "{inner}!"),
        }
    }
}

impl fmt::Debug for ResolvedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// A fully built output field.
#[derive(Clone)]
pub struct OutputField {
    pub name: String,
    pub description: Option<String>,
    pub deprecation_reason: Option<String>,
    pub ty: ResolvedType,
    pub args: IndexMap<String, InputValue>,
    /// The effective resolver: plugin middleware composed around the user
    /// resolver or the structural default.
    pub resolver: Arc<dyn Resolver>,
    /// The effective subscribe function, for subscription-root fields.
    pub subscribe: Option<Arc<dyn Resolver>>,
}

impl fmt::Debug for OutputField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputField")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("args", &self.args.keys().collect::<Vec<_>>())
            .field("has_subscribe", &self.subscribe.is_some())
            .finish()
    }
}

/// A fully built input field or argument.
#[derive(Clone)]
pub struct InputValue {
    pub name: String,
    pub description: Option<String>,
    pub ty: ResolvedType,
    pub default_value: Option<Value>,
}

impl fmt::Debug for InputValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputValue")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("default_value", &self.default_value)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_accessors() {
        let scalar = NamedType::Scalar(ScalarType::new("DateTime").with_description("ISO-8601"));
        assert_eq!(scalar.name(), "DateTime");
        assert_eq!(scalar.kind(), TypeKind::Scalar);
        assert_eq!(scalar.description(), Some("ISO-8601"));
        assert!(scalar.is_output());
        assert!(scalar.is_input());
        assert!(!scalar.is_abstract());
    }

    #[test]
    fn test_object_shell_slots() {
        let obj = ObjectType::shell("User", None, None);
        obj.set_interfaces(Vec::new());
        obj.set_fields(IndexMap::new());
        assert!(obj.fields().is_empty());
        assert!(obj.interfaces().is_empty());
    }

    #[test]
    fn test_resolved_type_display() {
        let named = Arc::new(NamedType::Scalar(ScalarType::new("Int")));
        let ty = ResolvedType::NonNull(Box::new(ResolvedType::List(Box::new(
            ResolvedType::Named(named),
        ))));
        assert_eq!(ty.to_string(), "[Int]!");
        assert!(ty.is_non_null());
        assert_eq!(ty.named_type().name(), "Int");
    }
}
