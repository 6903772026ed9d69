//! Schema-graph construction for forgeql.
//!
//! This crate turns a declarative, possibly-out-of-order, possibly
//! self-referential collection of named-type definitions into a fully
//! resolved type graph:
//! - `builder`: Type registry, discovery traversal, construction
//! - `definition`: Declarative type sources and definition blocks
//! - `types`: The concrete, two-phase type graph
//! - `wrapping`: Wrapping stacks and nullability resolution
//! - `resolver`: Field resolvers and the structural default
//! - `plugin`: Plugin descriptors, hook pipeline, middleware composition
//! - `config`: Build configuration and the heterogeneous types channel
//! - `schema`: The assembled schema and its extension metadata
//! - `validate`: Deferred missing-type reporting and abstract-type checks

pub mod builder;
pub mod config;
pub mod definition;
pub mod plugin;
pub mod resolver;
pub mod schema;
pub mod types;
pub mod validate;
pub mod wrapping;

pub use builder::{BuildOutput, SchemaBuilder, UNKNOWN_TYPE_NAME};
pub use config::{
    AbstractTypeStrategies, BuildConfig, Features, NonNullDefaults, NonNullOverrides,
    SchemaConfig, SchemaSource,
};
pub use definition::{
    DynamicInputMethod, DynamicOutputMethod, EnumMemberSource, EnumTypeDef, EnumValueDef,
    ExtendInputTypeDef, ExtendTypeDef, FieldModification, InputDefinitionBlock,
    InputObjectTypeDef, InputValueDef, InterfaceTypeDef, NamedRef, ObjectDefinitionBlock,
    ObjectTypeDef, OutputFieldDef, ScalarTypeDef, TypeRefSource, TypeSource,
    UnionDefinitionBlock, UnionTypeDef,
};
pub use plugin::{
    compose_middleware, AddArgContext, BuilderLens, FieldResolveContext, MiddlewareFn, Plugin,
};
pub use resolver::{
    AsyncFnResolver, Context, DefaultResolver, FnResolver, Resolver, ResolverArgs, ResolverError,
    ResolverFuture, ResolverInfo, ResolverResult,
};
pub use schema::{make_schema, DynamicMethodInfo, Schema, SchemaExtension};
pub use types::{
    EnumType, EnumValue, InputObjectType, InputValue, InterfaceType, IsTypeOfFn, NamedType,
    ObjectType, OutputField, ResolveTypeFn, ResolvedType, ScalarType, ScalarValueFn, TypeKind,
    UnionType,
};
pub use wrapping::{FinalWrap, WrapOp};

pub use forgeql_core::{Diagnostic, DiagnosticBag, DiagnosticSeverity, MissingTypeInfo, SchemaError};
