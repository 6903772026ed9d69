//! Declarative type sources and the definition blocks their declaration
//! closures run against.
//!
//! A declaration closure is re-invocable: the walk runs it against a
//! tracking block to discover referenced types, the cycle detector runs it
//! against a throwaway block, and construction runs it one final time to
//! collect the definitions it will build from.

use crate::config::NonNullOverrides;
use crate::resolver::Resolver;
use crate::types::{IsTypeOfFn, NamedType, ResolveTypeFn, ScalarValueFn};
use crate::wrapping::WrapOp;
use forgeql_core::SchemaError;
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

type ObjectDefFn = Box<dyn Fn(&mut ObjectDefinitionBlock) + Send + Sync>;
type InputDefFn = Box<dyn Fn(&mut InputDefinitionBlock) + Send + Sync>;
type UnionDefFn = Box<dyn Fn(&mut UnionDefinitionBlock) + Send + Sync>;

/// A reference to a named type: by name, by inline definition (discovered
/// during the walk), or by already-concrete type.
#[derive(Clone)]
pub enum NamedRef {
    Name(String),
    Def(Arc<TypeSource>),
    Type(Arc<NamedType>),
}

impl NamedRef {
    /// The referenced type name.
    pub fn name(&self) -> &str {
        match self {
            Self::Name(n) => n,
            Self::Def(d) => d.name(),
            Self::Type(t) => t.name(),
        }
    }
}

impl From<&str> for NamedRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for NamedRef {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<Arc<TypeSource>> for NamedRef {
    fn from(def: Arc<TypeSource>) -> Self {
        Self::Def(def)
    }
}

impl From<Arc<NamedType>> for NamedRef {
    fn from(ty: Arc<NamedType>) -> Self {
        Self::Type(ty)
    }
}

impl fmt::Debug for NamedRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NamedRef({})", self.name())
    }
}

/// A type reference as written in a definition: a named core plus the
/// declared wrapping stack, innermost-first.
#[derive(Clone, Debug)]
pub struct TypeRefSource {
    pub named: NamedRef,
    pub wrapping: Vec<WrapOp>,
}

impl TypeRefSource {
    /// Creates a bare reference with no wrapping.
    pub fn new(named: impl Into<NamedRef>) -> Self {
        Self {
            named: named.into(),
            wrapping: Vec::new(),
        }
    }

    /// Wraps the current layer in a list.
    pub fn list(mut self) -> Self {
        self.wrapping.push(WrapOp::List);
        self
    }

    /// Marks the current layer non-null.
    pub fn non_null(mut self) -> Self {
        self.wrapping.push(WrapOp::NonNull);
        self
    }

    /// Marks the current layer explicitly nullable.
    pub fn nullable(mut self) -> Self {
        self.wrapping.push(WrapOp::Nullable);
        self
    }
}

impl From<&str> for TypeRefSource {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for TypeRefSource {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// An output field as declared.
#[derive(Clone)]
pub struct OutputFieldDef {
    pub name: String,
    pub ty: TypeRefSource,
    pub args: IndexMap<String, InputValueDef>,
    pub description: Option<String>,
    pub deprecation: Option<String>,
    pub resolver: Option<Arc<dyn Resolver>>,
    pub subscribe: Option<Arc<dyn Resolver>>,
    /// Explicit per-field wrapping; wins over the declared stack and every
    /// nullability default.
    pub wrapping_override: Option<Vec<WrapOp>>,
}

impl OutputFieldDef {
    /// Creates a new output field definition.
    pub fn new(name: impl Into<String>, ty: impl Into<TypeRefSource>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            args: IndexMap::new(),
            description: None,
            deprecation: None,
            resolver: None,
            subscribe: None,
            wrapping_override: None,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Marks the field deprecated.
    pub fn with_deprecation(mut self, reason: impl Into<String>) -> Self {
        self.deprecation = Some(reason.into());
        self
    }

    /// Adds an argument.
    pub fn with_arg(mut self, arg: InputValueDef) -> Self {
        self.args.insert(arg.name.clone(), arg);
        self
    }

    /// Sets the resolver.
    pub fn with_resolver<R: Resolver + 'static>(mut self, resolver: R) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    /// Sets the subscribe function.
    pub fn with_subscribe<R: Resolver + 'static>(mut self, subscribe: R) -> Self {
        self.subscribe = Some(Arc::new(subscribe));
        self
    }

    /// Sets the explicit per-field wrapping override.
    pub fn with_wrapping(mut self, wrapping: Vec<WrapOp>) -> Self {
        self.wrapping_override = Some(wrapping);
        self
    }
}

impl fmt::Debug for OutputFieldDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputFieldDef")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("args", &self.args.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// An input field or argument as declared.
#[derive(Clone, Debug)]
pub struct InputValueDef {
    pub name: String,
    pub ty: TypeRefSource,
    pub description: Option<String>,
    pub default_value: Option<Value>,
    pub wrapping_override: Option<Vec<WrapOp>>,
}

impl InputValueDef {
    /// Creates a new input value definition.
    pub fn new(name: impl Into<String>, ty: impl Into<TypeRefSource>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            description: None,
            default_value: None,
            wrapping_override: None,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Sets the default value.
    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Sets the explicit wrapping override.
    pub fn with_wrapping(mut self, wrapping: Vec<WrapOp>) -> Self {
        self.wrapping_override = Some(wrapping);
        self
    }
}

/// Overrides applied to a field inherited from an interface. Only the parts
/// present here change; everything else on the field passes through.
#[derive(Clone, Debug)]
pub struct FieldModification {
    pub field: String,
    pub description: Option<String>,
    pub deprecation: Option<String>,
    pub ty: Option<TypeRefSource>,
    pub args: Option<IndexMap<String, InputValueDef>>,
}

impl FieldModification {
    /// Creates a modification targeting the named inherited field.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            description: None,
            deprecation: None,
            ty: None,
            args: None,
        }
    }

    /// Overrides the description.
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Overrides the deprecation reason.
    pub fn with_deprecation(mut self, reason: impl Into<String>) -> Self {
        self.deprecation = Some(reason.into());
        self
    }

    /// Overrides the field type. A bare named reference keeps the inherited
    /// wrapping; a wrapped reference replaces it.
    pub fn with_type(mut self, ty: impl Into<TypeRefSource>) -> Self {
        self.ty = Some(ty.into());
        self
    }

    /// Overrides an argument.
    pub fn with_arg(mut self, arg: InputValueDef) -> Self {
        self.args
            .get_or_insert_with(IndexMap::new)
            .insert(arg.name.clone(), arg);
        self
    }
}

/// The member source for an enum type.
#[derive(Clone, Debug)]
pub enum EnumMemberSource {
    /// An ordered sequence of value descriptors.
    List(Vec<EnumValueDef>),
    /// A key → value mapping. Purely numeric keys are filtered out, so an
    /// integer-backed source carrying reverse-mapping artifacts stays
    /// correct.
    Mapping(IndexMap<String, Value>),
}

/// A single declared enum member.
#[derive(Clone, Debug)]
pub struct EnumValueDef {
    pub name: String,
    /// Backing value; defaults to the member name.
    pub value: Option<Value>,
    pub description: Option<String>,
    pub deprecation: Option<String>,
}

impl EnumValueDef {
    /// Creates a member whose value defaults to its name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            description: None,
            deprecation: None,
        }
    }

    /// Sets an explicit backing value.
    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Marks the member deprecated.
    pub fn with_deprecation(mut self, reason: impl Into<String>) -> Self {
        self.deprecation = Some(reason.into());
        self
    }
}

/// Declarative object type definition.
pub struct ObjectTypeDef {
    pub name: String,
    pub description: Option<String>,
    pub(crate) definition: ObjectDefFn,
    pub non_null_defaults: NonNullOverrides,
    pub(crate) is_type_of: Option<IsTypeOfFn>,
    pub root_typing: Option<String>,
}

impl ObjectTypeDef {
    /// Creates an object type definition from a declaration closure.
    pub fn new(
        name: impl Into<String>,
        definition: impl Fn(&mut ObjectDefinitionBlock) + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            definition: Box::new(definition),
            non_null_defaults: NonNullOverrides::default(),
            is_type_of: None,
            root_typing: None,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Sets per-type nullability defaults.
    pub fn with_non_null_defaults(mut self, defaults: NonNullOverrides) -> Self {
        self.non_null_defaults = defaults;
        self
    }

    /// Sets the runtime membership predicate.
    pub fn with_is_type_of(
        mut self,
        f: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.is_type_of = Some(Arc::new(f));
        self
    }

    /// Annotates the backing source type for downstream generators.
    pub fn with_root_typing(mut self, path: impl Into<String>) -> Self {
        self.root_typing = Some(path.into());
        self
    }
}

/// Declarative interface type definition.
pub struct InterfaceTypeDef {
    pub name: String,
    pub description: Option<String>,
    pub(crate) definition: ObjectDefFn,
    pub non_null_defaults: NonNullOverrides,
    pub(crate) resolve_type: Option<ResolveTypeFn>,
    pub root_typing: Option<String>,
}

impl InterfaceTypeDef {
    /// Creates an interface type definition from a declaration closure.
    pub fn new(
        name: impl Into<String>,
        definition: impl Fn(&mut ObjectDefinitionBlock) + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            definition: Box::new(definition),
            non_null_defaults: NonNullOverrides::default(),
            resolve_type: None,
            root_typing: None,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Sets per-type nullability defaults.
    pub fn with_non_null_defaults(mut self, defaults: NonNullOverrides) -> Self {
        self.non_null_defaults = defaults;
        self
    }

    /// Sets the runtime discriminator.
    pub fn with_resolve_type(
        mut self,
        f: impl Fn(&Value) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.resolve_type = Some(Arc::new(f));
        self
    }

    /// Annotates the backing source type for downstream generators.
    pub fn with_root_typing(mut self, path: impl Into<String>) -> Self {
        self.root_typing = Some(path.into());
        self
    }
}

/// Declarative union type definition.
pub struct UnionTypeDef {
    pub name: String,
    pub description: Option<String>,
    pub(crate) definition: UnionDefFn,
    pub(crate) resolve_type: Option<ResolveTypeFn>,
    pub root_typing: Option<String>,
}

impl UnionTypeDef {
    /// Creates a union type definition from a declaration closure.
    pub fn new(
        name: impl Into<String>,
        definition: impl Fn(&mut UnionDefinitionBlock) + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            definition: Box::new(definition),
            resolve_type: None,
            root_typing: None,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Sets the runtime discriminator.
    pub fn with_resolve_type(
        mut self,
        f: impl Fn(&Value) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.resolve_type = Some(Arc::new(f));
        self
    }

    /// Annotates the backing source type for downstream generators.
    pub fn with_root_typing(mut self, path: impl Into<String>) -> Self {
        self.root_typing = Some(path.into());
        self
    }
}

/// Declarative enum type definition.
#[derive(Debug)]
pub struct EnumTypeDef {
    pub name: String,
    pub description: Option<String>,
    pub members: EnumMemberSource,
    pub root_typing: Option<String>,
}

impl EnumTypeDef {
    /// Creates an enum type definition.
    pub fn new(name: impl Into<String>, members: EnumMemberSource) -> Self {
        Self {
            name: name.into(),
            description: None,
            members,
            root_typing: None,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Annotates the backing source type for downstream generators.
    pub fn with_root_typing(mut self, path: impl Into<String>) -> Self {
        self.root_typing = Some(path.into());
        self
    }
}

/// Declarative scalar type definition.
pub struct ScalarTypeDef {
    pub name: String,
    pub description: Option<String>,
    pub(crate) serialize: Option<ScalarValueFn>,
    pub(crate) parse_value: Option<ScalarValueFn>,
    /// Terse-helper method name; registers a dynamic shorthand for fields of
    /// this scalar in both the input and output method tables.
    pub shorthand: Option<String>,
    pub root_typing: Option<String>,
}

impl ScalarTypeDef {
    /// Creates a scalar type definition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            serialize: None,
            parse_value: None,
            shorthand: None,
            root_typing: None,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Sets the serialize function.
    pub fn with_serialize(
        mut self,
        f: impl Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
    ) -> Self {
        self.serialize = Some(Arc::new(f));
        self
    }

    /// Sets the parse function.
    pub fn with_parse_value(
        mut self,
        f: impl Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
    ) -> Self {
        self.parse_value = Some(Arc::new(f));
        self
    }

    /// Registers a terse-helper method name for this scalar.
    pub fn with_shorthand(mut self, method: impl Into<String>) -> Self {
        self.shorthand = Some(method.into());
        self
    }

    /// Annotates the backing source type for downstream generators.
    pub fn with_root_typing(mut self, path: impl Into<String>) -> Self {
        self.root_typing = Some(path.into());
        self
    }
}

/// Declarative input object type definition.
pub struct InputObjectTypeDef {
    pub name: String,
    pub description: Option<String>,
    pub(crate) definition: InputDefFn,
    pub non_null_defaults: NonNullOverrides,
}

impl InputObjectTypeDef {
    /// Creates an input object type definition from a declaration closure.
    pub fn new(
        name: impl Into<String>,
        definition: impl Fn(&mut InputDefinitionBlock) + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            definition: Box::new(definition),
            non_null_defaults: NonNullOverrides::default(),
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Sets per-type nullability defaults.
    pub fn with_non_null_defaults(mut self, defaults: NonNullOverrides) -> Self {
        self.non_null_defaults = defaults;
        self
    }
}

/// Additional fields targeting an object or interface defined elsewhere.
/// Applied exactly once when the target finalizes.
pub struct ExtendTypeDef {
    pub target: String,
    pub(crate) definition: ObjectDefFn,
}

impl ExtendTypeDef {
    /// Creates an extension for the named target.
    pub fn new(
        target: impl Into<String>,
        definition: impl Fn(&mut ObjectDefinitionBlock) + Send + Sync + 'static,
    ) -> Self {
        Self {
            target: target.into(),
            definition: Box::new(definition),
        }
    }
}

/// Additional fields targeting an input object defined elsewhere.
pub struct ExtendInputTypeDef {
    pub target: String,
    pub(crate) definition: InputDefFn,
}

impl ExtendInputTypeDef {
    /// Creates an input extension for the named target.
    pub fn new(
        target: impl Into<String>,
        definition: impl Fn(&mut InputDefinitionBlock) + Send + Sync + 'static,
    ) -> Self {
        Self {
            target: target.into(),
            definition: Box::new(definition),
        }
    }
}

/// A named factory splicing output fields into definition blocks on demand.
pub struct DynamicOutputMethod {
    pub name: String,
    pub(crate) factory: Arc<dyn Fn(&mut ObjectDefinitionBlock, &Value) + Send + Sync>,
}

impl DynamicOutputMethod {
    /// Creates a dynamic output method.
    pub fn new(
        name: impl Into<String>,
        factory: impl Fn(&mut ObjectDefinitionBlock, &Value) + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            factory: Arc::new(factory),
        }
    }
}

/// A named factory splicing input fields into definition blocks on demand.
pub struct DynamicInputMethod {
    pub name: String,
    pub(crate) factory: Arc<dyn Fn(&mut InputDefinitionBlock, &Value) + Send + Sync>,
}

impl DynamicInputMethod {
    /// Creates a dynamic input method.
    pub fn new(
        name: impl Into<String>,
        factory: impl Fn(&mut InputDefinitionBlock, &Value) + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            factory: Arc::new(factory),
        }
    }
}

/// Everything the registry accepts through the types channel.
pub enum TypeSource {
    Object(ObjectTypeDef),
    Interface(InterfaceTypeDef),
    Union(UnionTypeDef),
    Enum(EnumTypeDef),
    Scalar(ScalarTypeDef),
    InputObject(InputObjectTypeDef),
    ExtendObject(ExtendTypeDef),
    ExtendInput(ExtendInputTypeDef),
    DynamicOutput(DynamicOutputMethod),
    DynamicInput(DynamicInputMethod),
    /// An already-built type imported from elsewhere.
    Concrete(Arc<NamedType>),
}

impl TypeSource {
    /// The name this source registers under: the type name, the extension
    /// target, or the dynamic method name.
    pub fn name(&self) -> &str {
        match self {
            Self::Object(d) => &d.name,
            Self::Interface(d) => &d.name,
            Self::Union(d) => &d.name,
            Self::Enum(d) => &d.name,
            Self::Scalar(d) => &d.name,
            Self::InputObject(d) => &d.name,
            Self::ExtendObject(d) => &d.target,
            Self::ExtendInput(d) => &d.target,
            Self::DynamicOutput(d) => &d.name,
            Self::DynamicInput(d) => &d.name,
            Self::Concrete(t) => t.name(),
        }
    }
}

impl fmt::Debug for TypeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let variant = match self {
            Self::Object(_) => "Object",
            Self::Interface(_) => "Interface",
            Self::Union(_) => "Union",
            Self::Enum(_) => "Enum",
            Self::Scalar(_) => "Scalar",
            Self::InputObject(_) => "InputObject",
            Self::ExtendObject(_) => "ExtendObject",
            Self::ExtendInput(_) => "ExtendInput",
            Self::DynamicOutput(_) => "DynamicOutput",
            Self::DynamicInput(_) => "DynamicInput",
            Self::Concrete(_) => "Concrete",
        };
        write!(f, "TypeSource::{}({})", variant, self.name())
    }
}

macro_rules! impl_into_type_source {
    ($($def:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$def> for TypeSource {
                fn from(def: $def) -> Self {
                    TypeSource::$variant(def)
                }
            }

            impl From<$def> for Arc<TypeSource> {
                fn from(def: $def) -> Self {
                    Arc::new(TypeSource::$variant(def))
                }
            }
        )*
    };
}

impl_into_type_source! {
    ObjectTypeDef => Object,
    InterfaceTypeDef => Interface,
    UnionTypeDef => Union,
    EnumTypeDef => Enum,
    ScalarTypeDef => Scalar,
    InputObjectTypeDef => InputObject,
    ExtendTypeDef => ExtendObject,
    ExtendInputTypeDef => ExtendInput,
    DynamicOutputMethod => DynamicOutput,
    DynamicInputMethod => DynamicInput,
}

impl From<Arc<NamedType>> for TypeSource {
    fn from(ty: Arc<NamedType>) -> Self {
        TypeSource::Concrete(ty)
    }
}

/// How a definition block is being consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BlockMode {
    /// Tracking only: discover referenced types, suppress warnings.
    Walk,
    /// Construction: collected definitions become the built type.
    Build,
}

/// A dynamic-method table entry: either a scalar shorthand or a factory.
pub(crate) enum DynamicMethodEntry<B> {
    Scalar(String),
    Factory(Arc<dyn Fn(&mut B, &Value) + Send + Sync>),
}

impl<B> Clone for DynamicMethodEntry<B> {
    fn clone(&self) -> Self {
        match self {
            Self::Scalar(name) => Self::Scalar(name.clone()),
            Self::Factory(f) => Self::Factory(Arc::clone(f)),
        }
    }
}

/// Definition surface for object and interface types (and extensions of
/// either).
pub struct ObjectDefinitionBlock {
    type_name: String,
    pub(crate) mode: BlockMode,
    dynamics: IndexMap<String, DynamicMethodEntry<ObjectDefinitionBlock>>,
    pub(crate) fields: Vec<OutputFieldDef>,
    pub(crate) interfaces: Vec<NamedRef>,
    pub(crate) modifications: IndexMap<String, FieldModification>,
    pub(crate) added_types: Vec<Arc<TypeSource>>,
    pub(crate) warnings: Vec<String>,
    pub(crate) legacy_resolve_type: Option<ResolveTypeFn>,
}

impl ObjectDefinitionBlock {
    pub(crate) fn new(
        type_name: impl Into<String>,
        mode: BlockMode,
        dynamics: IndexMap<String, DynamicMethodEntry<ObjectDefinitionBlock>>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            mode,
            dynamics,
            fields: Vec::new(),
            interfaces: Vec::new(),
            modifications: IndexMap::new(),
            added_types: Vec::new(),
            warnings: Vec::new(),
            legacy_resolve_type: None,
        }
    }

    /// The name of the type being defined.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Adds an output field.
    pub fn field(&mut self, field: OutputFieldDef) {
        self.fields.push(field);
    }

    /// Declares an implemented interface.
    pub fn implements(&mut self, interface: impl Into<NamedRef>) {
        self.interfaces.push(interface.into());
    }

    /// Overrides parts of a field inherited from an interface.
    pub fn modify(&mut self, modification: FieldModification) {
        self.modifications
            .insert(modification.field.clone(), modification);
    }

    /// Registers an additional type discovered while defining this one.
    pub fn add_type(&mut self, source: impl Into<Arc<TypeSource>>) {
        self.added_types.push(source.into());
    }

    /// Records a warning; surfaced once per build, suppressed during
    /// tracking passes.
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Sets the runtime discriminator through the legacy block-level hook.
    /// Deprecated in favor of the definition-level discriminator.
    pub fn set_legacy_resolve_type(
        &mut self,
        f: impl Fn(&Value) -> Option<String> + Send + Sync + 'static,
    ) {
        self.warn(format!(
            "{}: block-level resolve_type is deprecated, configure it on the type definition",
            self.type_name
        ));
        self.legacy_resolve_type = Some(Arc::new(f));
    }

    /// Invokes a registered dynamic output method by name.
    pub fn invoke_dynamic(&mut self, method: &str, args: &Value) -> Result<(), SchemaError> {
        let Some(entry) = self.dynamics.get(method).cloned() else {
            return Err(SchemaError::Configuration(format!(
                "unknown dynamic output method `{method}` invoked while defining {}",
                self.type_name
            )));
        };
        match entry {
            DynamicMethodEntry::Scalar(type_name) => {
                let field = shorthand_output_field(&self.type_name, method, &type_name, args)?;
                self.fields.push(field);
                Ok(())
            }
            DynamicMethodEntry::Factory(factory) => {
                factory(self, args);
                Ok(())
            }
        }
    }
}

/// Definition surface for input object types (and input extensions).
pub struct InputDefinitionBlock {
    type_name: String,
    pub(crate) mode: BlockMode,
    dynamics: IndexMap<String, DynamicMethodEntry<InputDefinitionBlock>>,
    pub(crate) fields: Vec<InputValueDef>,
    pub(crate) added_types: Vec<Arc<TypeSource>>,
    pub(crate) warnings: Vec<String>,
}

impl InputDefinitionBlock {
    pub(crate) fn new(
        type_name: impl Into<String>,
        mode: BlockMode,
        dynamics: IndexMap<String, DynamicMethodEntry<InputDefinitionBlock>>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            mode,
            dynamics,
            fields: Vec::new(),
            added_types: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// The name of the type being defined.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Adds an input field.
    pub fn field(&mut self, field: InputValueDef) {
        self.fields.push(field);
    }

    /// Registers an additional type discovered while defining this one.
    pub fn add_type(&mut self, source: impl Into<Arc<TypeSource>>) {
        self.added_types.push(source.into());
    }

    /// Records a warning; surfaced once per build, suppressed during
    /// tracking passes.
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Invokes a registered dynamic input method by name.
    pub fn invoke_dynamic(&mut self, method: &str, args: &Value) -> Result<(), SchemaError> {
        let Some(entry) = self.dynamics.get(method).cloned() else {
            return Err(SchemaError::Configuration(format!(
                "unknown dynamic input method `{method}` invoked while defining {}",
                self.type_name
            )));
        };
        match entry {
            DynamicMethodEntry::Scalar(type_name) => {
                let field = shorthand_input_field(&self.type_name, method, &type_name, args)?;
                self.fields.push(field);
                Ok(())
            }
            DynamicMethodEntry::Factory(factory) => {
                factory(self, args);
                Ok(())
            }
        }
    }
}

/// Definition surface for union types.
pub struct UnionDefinitionBlock {
    type_name: String,
    pub(crate) members: Option<Vec<NamedRef>>,
    pub(crate) warnings: Vec<String>,
    pub(crate) legacy_resolve_type: Option<ResolveTypeFn>,
}

impl UnionDefinitionBlock {
    pub(crate) fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            members: None,
            warnings: Vec::new(),
            legacy_resolve_type: None,
        }
    }

    /// The name of the union being defined.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Declares the flat member list.
    pub fn members<I, R>(&mut self, members: I)
    where
        I: IntoIterator<Item = R>,
        R: Into<NamedRef>,
    {
        self.members = Some(members.into_iter().map(Into::into).collect());
    }

    /// Sets the runtime discriminator through the legacy block-level hook.
    /// Deprecated in favor of the definition-level discriminator.
    pub fn set_legacy_resolve_type(
        &mut self,
        f: impl Fn(&Value) -> Option<String> + Send + Sync + 'static,
    ) {
        self.warnings.push(format!(
            "{}: block-level resolve_type is deprecated, configure it on the union definition",
            self.type_name
        ));
        self.legacy_resolve_type = Some(Arc::new(f));
    }
}

/// Builds an output field from a terse scalar-shorthand invocation. The args
/// are either a bare field name or a config object with `name` plus optional
/// `description`, `deprecation`, `list` and `non_null` keys.
fn shorthand_output_field(
    type_name: &str,
    method: &str,
    scalar: &str,
    args: &Value,
) -> Result<OutputFieldDef, SchemaError> {
    let (name, config) = shorthand_parts(type_name, method, args)?;
    let mut field = OutputFieldDef::new(name, shorthand_type_ref(scalar, config));
    if let Some(config) = config {
        if let Some(desc) = config.get("description").and_then(Value::as_str) {
            field = field.with_description(desc);
        }
        if let Some(reason) = config.get("deprecation").and_then(Value::as_str) {
            field = field.with_deprecation(reason);
        }
    }
    Ok(field)
}

/// Builds an input field from a terse scalar-shorthand invocation.
fn shorthand_input_field(
    type_name: &str,
    method: &str,
    scalar: &str,
    args: &Value,
) -> Result<InputValueDef, SchemaError> {
    let (name, config) = shorthand_parts(type_name, method, args)?;
    let mut field = InputValueDef::new(name, shorthand_type_ref(scalar, config));
    if let Some(config) = config {
        if let Some(desc) = config.get("description").and_then(Value::as_str) {
            field = field.with_description(desc);
        }
        if let Some(default) = config.get("default") {
            field = field.with_default(default.clone());
        }
    }
    Ok(field)
}

fn shorthand_parts<'a>(
    type_name: &str,
    method: &str,
    args: &'a Value,
) -> Result<(String, Option<&'a serde_json::Map<String, Value>>), SchemaError> {
    match args {
        Value::String(name) => Ok((name.clone(), None)),
        Value::Object(config) => {
            let name = config.get("name").and_then(Value::as_str).ok_or_else(|| {
                SchemaError::Configuration(format!(
                    "dynamic method `{method}` on {type_name} requires a `name` in its config"
                ))
            })?;
            Ok((name.to_string(), Some(config)))
        }
        _ => Err(SchemaError::Configuration(format!(
            "dynamic method `{method}` on {type_name} expects a field name or a config object"
        ))),
    }
}

fn shorthand_type_ref(scalar: &str, config: Option<&serde_json::Map<String, Value>>) -> TypeRefSource {
    let mut ty = TypeRefSource::new(scalar);
    if let Some(config) = config {
        if config.get("non_null").and_then(Value::as_bool) == Some(true) {
            ty = ty.non_null();
        }
        if config.get("list").and_then(Value::as_bool) == Some(true) {
            ty = ty.list();
        }
    }
    ty
}
