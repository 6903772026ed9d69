//! The schema builder: type registry, discovery traversal, construction.
//!
//! A builder is created fresh per build and consumed by [`SchemaBuilder::build`];
//! independent builds share nothing. Construction is a three-phase pass:
//! registration fills the registry maps, the breadth-first walk discovers
//! types referenced only from inside declaration closures, and construction
//! turns pending definitions into concrete shells whose field maps resolve
//! lazily so reference cycles never require a type to be complete before it
//! can be pointed at.

use crate::config::{BuildConfig, NonNullOverrides, SchemaConfig, SchemaSource};
use crate::definition::{
    BlockMode, DynamicMethodEntry, EnumMemberSource, EnumTypeDef, FieldModification,
    InputDefinitionBlock, InputObjectTypeDef, InputValueDef, InterfaceTypeDef, NamedRef,
    ObjectDefinitionBlock, ObjectTypeDef, OutputFieldDef, ScalarTypeDef, TypeSource,
    UnionDefinitionBlock, UnionTypeDef,
};
use crate::plugin::{
    compose_middleware, AddArgContext, AddArgFn, AddInputFieldFn, AddOutputFieldFn, AfterBuildFn,
    BeforeBuildFn, BuilderLens, CreateFieldResolverFn, CreateFieldSubscribeFn,
    FieldResolveContext, InputObjectDefinitionHookFn, MissingTypeFn, ObjectDefinitionHookFn,
    Plugin,
};
use crate::resolver::{DefaultResolver, FnResolver, Resolver};
use crate::schema::{DynamicMethodInfo, SchemaExtension};
use crate::types::{
    EnumType, EnumValue, InputObjectType, InputValue, InterfaceType, NamedType, ObjectType,
    OutputField, ResolvedType, ScalarType, UnionType,
};
use crate::wrapping::{finalize_wrapping, rewrap, unwrap_resolved};
use forgeql_core::diagnostics::{codes, Diagnostic, Origin};
use forgeql_core::{DiagnosticBag, MissingTypeInfo, SchemaError};
use indexmap::{IndexMap, IndexSet};
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;

const BUILT_IN_SCALARS: [&str; 5] = ["Int", "Float", "String", "Boolean", "ID"];

/// Name of the inert placeholder substituted for unresolvable references so
/// one build pass can report every missing type.
pub const UNKNOWN_TYPE_NAME: &str = "FORGEQL__UNKNOWN__TYPE";

/// Everything a completed build hands to consumers.
pub struct BuildOutput {
    /// The final name → type map, in construction order.
    pub types: IndexMap<String, Arc<NamedType>>,
    /// Unresolved names with provenance, in discovery order.
    pub missing_types: IndexMap<String, MissingTypeInfo>,
    /// Schema-wide extension metadata.
    pub schema_extension: Arc<SchemaExtension>,
    /// After-build callbacks to invoke once the schema object exists.
    pub after_build_fns: Vec<AfterBuildFn>,
    /// The settings the build ran with.
    pub config: BuildConfig,
    /// Warnings and deferred errors collected during the build.
    pub diagnostics: DiagnosticBag,
}

enum ExtensionSlot {
    Queued(Vec<Arc<TypeSource>>),
    Applied,
}

enum WalkItem {
    Output(Arc<TypeSource>),
    Input(Arc<TypeSource>),
    Named(Arc<NamedType>),
}

struct OutputJob {
    shell: Arc<NamedType>,
    fields: Vec<OutputFieldDef>,
    interfaces: Vec<NamedRef>,
    modifications: IndexMap<String, FieldModification>,
    non_null: NonNullOverrides,
}

struct InputObjectJob {
    shell: Arc<NamedType>,
    fields: Vec<InputValueDef>,
    non_null: NonNullOverrides,
}

struct UnionJob {
    shell: Arc<NamedType>,
    members: Vec<NamedRef>,
}

struct ConcreteJob {
    shell: Arc<NamedType>,
    source: Arc<NamedType>,
}

enum ResolveJob {
    Output(OutputJob),
    InputObject(InputObjectJob),
    Union(UnionJob),
    Concrete(ConcreteJob),
}

/// Builds a schema graph out of registered type sources. One builder per
/// build; all registry maps and marker sets live and die with it.
pub struct SchemaBuilder {
    config: BuildConfig,
    plugins: Vec<Plugin>,
    sources: Vec<SchemaSource>,

    /// Declarative definitions not yet processed into concrete types.
    pending_types: IndexMap<String, Arc<TypeSource>>,
    /// All types as they are built.
    final_types: IndexMap<String, Arc<NamedType>>,
    /// Types imported already-concrete, for redefinition detection.
    defined_types: FxHashMap<String, Arc<NamedType>>,
    /// Referenced names with no definition, first provenance wins.
    missing_types: IndexMap<String, MissingTypeInfo>,

    /// Single-use extension queues per target name.
    type_extensions: IndexMap<String, ExtensionSlot>,
    input_type_extensions: IndexMap<String, ExtensionSlot>,

    dynamic_output_methods: IndexMap<String, DynamicMethodEntry<ObjectDefinitionBlock>>,
    dynamic_input_methods: IndexMap<String, DynamicMethodEntry<InputDefinitionBlock>>,

    /// Type name to backing source-type path, for downstream generators.
    root_typings: IndexMap<String, String>,

    /// Breadth-first discovery queue.
    types_to_walk: VecDeque<WalkItem>,
    /// Guards against unsafe recursion during top-level construction.
    building: IndexSet<String>,
    /// Lazy slots awaiting resolution, keyed by type name.
    resolve_jobs: IndexMap<String, ResolveJob>,

    built_ins: IndexMap<String, Arc<NamedType>>,
    unknown_type: Arc<NamedType>,
    diagnostics: DiagnosticBag,
    schema_extension: Option<Arc<SchemaExtension>>,

    on_before_build_fns: Vec<BeforeBuildFn>,
    on_missing_type_fns: Vec<MissingTypeFn>,
    on_object_definition_fns: Vec<ObjectDefinitionHookFn>,
    on_input_object_definition_fns: Vec<InputObjectDefinitionHookFn>,
    on_add_output_field_fns: Vec<AddOutputFieldFn>,
    on_add_input_field_fns: Vec<AddInputFieldFn>,
    on_add_arg_fns: Vec<AddArgFn>,
    on_create_resolver_fns: Vec<CreateFieldResolverFn>,
    on_create_subscribe_fns: Vec<CreateFieldSubscribeFn>,
    on_after_build_fns: Vec<AfterBuildFn>,
}

impl SchemaBuilder {
    /// Creates a builder for one build of the given config.
    pub fn new(config: SchemaConfig) -> Self {
        let SchemaConfig {
            types,
            plugins,
            features,
            non_null_defaults,
            options,
        } = config;

        let mut built_ins = IndexMap::new();
        for name in BUILT_IN_SCALARS {
            built_ins.insert(
                name.to_string(),
                Arc::new(NamedType::Scalar(
                    ScalarType::new(name).with_description(format!("Built-in {name} scalar")),
                )),
            );
        }
        let unknown_type = Arc::new(NamedType::Scalar(
            ScalarType::new(UNKNOWN_TYPE_NAME)
                .with_description("Placeholder for a type that could not be resolved"),
        ));

        Self {
            config: BuildConfig {
                features: features.normalized(),
                non_null_defaults,
                options,
            },
            plugins,
            sources: types,
            pending_types: IndexMap::new(),
            final_types: IndexMap::new(),
            defined_types: FxHashMap::default(),
            missing_types: IndexMap::new(),
            type_extensions: IndexMap::new(),
            input_type_extensions: IndexMap::new(),
            dynamic_output_methods: IndexMap::new(),
            dynamic_input_methods: IndexMap::new(),
            root_typings: IndexMap::new(),
            types_to_walk: VecDeque::new(),
            building: IndexSet::new(),
            resolve_jobs: IndexMap::new(),
            built_ins,
            unknown_type,
            diagnostics: DiagnosticBag::new(),
            schema_extension: None,
            on_before_build_fns: Vec::new(),
            on_missing_type_fns: Vec::new(),
            on_object_definition_fns: Vec::new(),
            on_input_object_definition_fns: Vec::new(),
            on_add_output_field_fns: Vec::new(),
            on_add_input_field_fns: Vec::new(),
            on_add_arg_fns: Vec::new(),
            on_create_resolver_fns: Vec::new(),
            on_create_subscribe_fns: Vec::new(),
            on_after_build_fns: Vec::new(),
        }
    }

    /// Runs the whole build: registration, hook collection, discovery,
    /// before-build hooks, cycle check, construction, lazy resolution.
    pub fn build(mut self) -> Result<BuildOutput, SchemaError> {
        let sources = std::mem::take(&mut self.sources);
        for source in sources {
            self.add_types(source)?;
        }
        self.collect_plugin_hooks()?;
        self.schema_extension = Some(Arc::new(self.make_schema_extension()));
        self.walk()?;
        self.run_before_build_hooks()?;
        self.check_interface_cycles()?;
        self.construct_pending_types()?;
        self.resolve_lazy_types()?;

        // Rebuilt so root typings recorded during construction are included.
        let schema_extension = Arc::new(self.make_schema_extension());
        Ok(BuildOutput {
            types: self.final_types,
            missing_types: self.missing_types,
            schema_extension,
            after_build_fns: self.on_after_build_fns,
            config: self.config,
            diagnostics: self.diagnostics,
        })
    }

    /// True if the registry already knows the named type.
    pub fn has_type(&self, name: &str) -> bool {
        self.pending_types.contains_key(name) || self.final_types.contains_key(name)
    }

    /// Sets a free-form config option.
    pub fn set_config_option(&mut self, key: impl Into<String>, value: Value) {
        self.config.options.insert(key.into(), value);
    }

    /// True if a free-form config option is set.
    pub fn has_config_option(&self, key: &str) -> bool {
        self.config.options.contains_key(key)
    }

    /// Reads a free-form config option.
    pub fn get_config_option(&self, key: &str) -> Option<&Value> {
        self.config.options.get(key)
    }

    /// Pulls one source into the registry, classified by capability.
    pub fn add_type(&mut self, source: impl Into<Arc<TypeSource>>) -> Result<(), SchemaError> {
        let source: Arc<TypeSource> = source.into();

        // Dynamic method providers are recorded by name, not as types.
        match &*source {
            TypeSource::DynamicOutput(method) => {
                self.dynamic_output_methods.insert(
                    method.name.clone(),
                    DynamicMethodEntry::Factory(Arc::clone(&method.factory)),
                );
                return Ok(());
            }
            TypeSource::DynamicInput(method) => {
                self.dynamic_input_methods.insert(
                    method.name.clone(),
                    DynamicMethodEntry::Factory(Arc::clone(&method.factory)),
                );
                return Ok(());
            }
            _ => {}
        }

        let name = source.name().to_string();
        // Internal names are never registered.
        if name.starts_with("__") {
            return Ok(());
        }

        match &*source {
            TypeSource::ExtendObject(_) => return self.queue_extension(&name, source, false),
            TypeSource::ExtendInput(_) => return self.queue_extension(&name, source, true),
            _ => {}
        }

        if let Some(existing) = self.pending_types.get(&name) {
            // Importing the same definition more than once is a no-op.
            if Arc::ptr_eq(existing, &source) {
                return Ok(());
            }
            return Err(redefined_error(&name));
        }
        if let Some(existing) = self.defined_types.get(&name) {
            if let TypeSource::Concrete(ty) = &*source {
                if Arc::ptr_eq(existing, ty) {
                    return Ok(());
                }
            }
            return Err(redefined_error(&name));
        }

        match &*source {
            TypeSource::Scalar(def) => {
                if let Some(method) = &def.shorthand {
                    self.dynamic_output_methods
                        .insert(method.clone(), DynamicMethodEntry::Scalar(name.clone()));
                    self.dynamic_input_methods
                        .insert(method.clone(), DynamicMethodEntry::Scalar(name.clone()));
                }
                if let Some(root) = &def.root_typing {
                    self.root_typings.insert(name.clone(), root.clone());
                }
                self.pending_types.insert(name, source.clone());
            }
            TypeSource::Concrete(ty) => {
                // Re-importing a built-in scalar is a no-op.
                if matches!(&**ty, NamedType::Scalar(_)) && self.built_ins.contains_key(&name) {
                    return Ok(());
                }
                self.defined_types.insert(name.clone(), Arc::clone(ty));
                let rewrapped = self.rewrap_concrete(ty);
                self.final_types.insert(name, rewrapped);
                self.types_to_walk.push_back(WalkItem::Named(Arc::clone(ty)));
            }
            TypeSource::Object(_) | TypeSource::Interface(_) => {
                self.pending_types.insert(name, Arc::clone(&source));
                self.types_to_walk.push_back(WalkItem::Output(source));
            }
            TypeSource::InputObject(_) => {
                self.pending_types.insert(name, Arc::clone(&source));
                self.types_to_walk.push_back(WalkItem::Input(source));
            }
            TypeSource::Union(_) | TypeSource::Enum(_) => {
                self.pending_types.insert(name, source.clone());
            }
            TypeSource::ExtendObject(_)
            | TypeSource::ExtendInput(_)
            | TypeSource::DynamicOutput(_)
            | TypeSource::DynamicInput(_) => unreachable!("handled above"),
        }
        Ok(())
    }

    /// Flattens the heterogeneous types channel recursively.
    pub fn add_types(&mut self, source: impl Into<SchemaSource>) -> Result<(), SchemaError> {
        match source.into() {
            SchemaSource::Type(ty) => self.add_type(ty),
            SchemaSource::List(list) => {
                for entry in list {
                    self.add_types(entry)?;
                }
                Ok(())
            }
            SchemaSource::Map(map) => {
                for (_, entry) in map {
                    self.add_types(entry)?;
                }
                Ok(())
            }
            SchemaSource::Schema(schema) => {
                for ty in schema.type_map().values() {
                    self.add_type(Arc::new(TypeSource::Concrete(Arc::clone(ty))))?;
                }
                Ok(())
            }
            SchemaSource::Plugin(plugin) => Err(SchemaError::Configuration(format!(
                "plugin `{}` was seen in the types input, but must be provided through the \
                 plugins list instead",
                plugin.name()
            ))),
        }
    }

    fn queue_extension(
        &mut self,
        name: &str,
        source: Arc<TypeSource>,
        input: bool,
    ) -> Result<(), SchemaError> {
        let map = if input {
            &mut self.input_type_extensions
        } else {
            &mut self.type_extensions
        };
        match map.entry(name.to_string()) {
            indexmap::map::Entry::Occupied(mut entry) => match entry.get_mut() {
                ExtensionSlot::Queued(queue) => queue.push(Arc::clone(&source)),
                ExtensionSlot::Applied => {
                    self.diagnostics.error(
                        codes::LATE_EXTENSION,
                        format!("extension for {name} arrived after {name} was finalized"),
                        Origin::type_level(name),
                    );
                    return Err(SchemaError::Configuration(format!(
                        "extension for {name} arrived after {name} was finalized; register \
                         extensions before the schema is built"
                    )));
                }
            },
            indexmap::map::Entry::Vacant(entry) => {
                entry.insert(ExtensionSlot::Queued(vec![Arc::clone(&source)]));
            }
        }
        self.types_to_walk.push_back(if input {
            WalkItem::Input(source)
        } else {
            WalkItem::Output(source)
        });
        Ok(())
    }

    fn collect_plugin_hooks(&mut self) -> Result<(), SchemaError> {
        let plugins = std::mem::take(&mut self.plugins);
        for plugin in plugins {
            tracing::debug!(plugin = plugin.name(), "installing plugin");
            if let Some(f) = &plugin.on_install {
                f(&mut BuilderLens::new(self))?;
            }
            if let Some(f) = plugin.on_before_build {
                self.on_before_build_fns.push(f);
            }
            if let Some(f) = plugin.on_missing_type {
                self.on_missing_type_fns.push(f);
            }
            if let Some(f) = plugin.on_object_definition {
                self.on_object_definition_fns.push(f);
            }
            if let Some(f) = plugin.on_input_object_definition {
                self.on_input_object_definition_fns.push(f);
            }
            if let Some(f) = plugin.on_add_output_field {
                self.on_add_output_field_fns.push(f);
            }
            if let Some(f) = plugin.on_add_input_field {
                self.on_add_input_field_fns.push(f);
            }
            if let Some(f) = plugin.on_add_arg {
                self.on_add_arg_fns.push(f);
            }
            if let Some(f) = plugin.on_create_field_resolver {
                self.on_create_resolver_fns.push(f);
            }
            if let Some(f) = plugin.on_create_field_subscribe {
                self.on_create_subscribe_fns.push(f);
            }
            if let Some(f) = plugin.on_after_build {
                self.on_after_build_fns.push(f);
            }
        }
        Ok(())
    }

    fn make_schema_extension(&self) -> SchemaExtension {
        SchemaExtension {
            features: self.config.features.clone(),
            non_null_defaults: self.config.non_null_defaults,
            options: self.config.options.clone(),
            dynamic_output_methods: self
                .dynamic_output_methods
                .iter()
                .map(|(name, entry)| describe_method(name, entry))
                .collect(),
            dynamic_input_methods: self
                .dynamic_input_methods
                .iter()
                .map(|(name, entry)| describe_method(name, entry))
                .collect(),
            root_typings: self.root_typings.clone(),
        }
    }

    fn run_before_build_hooks(&mut self) -> Result<(), SchemaError> {
        let hooks = self.on_before_build_fns.clone();
        for hook in hooks {
            hook(&mut BuilderLens::new(self))?;
            if !self.types_to_walk.is_empty() {
                self.walk()?;
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Discovery traversal
    // ------------------------------------------------------------------

    /// Drains the discovery queue, running declaration closures in tracking
    /// mode and forwarding inline definitions back into the registry.
    fn walk(&mut self) -> Result<(), SchemaError> {
        while let Some(item) = self.types_to_walk.pop_front() {
            match item {
                WalkItem::Output(def) => self.walk_output(&def)?,
                WalkItem::Input(def) => self.walk_input(&def)?,
                WalkItem::Named(ty) => self.walk_named(&ty)?,
            }
        }
        Ok(())
    }

    fn walk_output(&mut self, def: &Arc<TypeSource>) -> Result<(), SchemaError> {
        let mut block = self.output_block(def.name(), BlockMode::Walk);
        match &**def {
            TypeSource::Object(d) => (d.definition)(&mut block),
            TypeSource::Interface(d) => (d.definition)(&mut block),
            TypeSource::ExtendObject(d) => (d.definition)(&mut block),
            _ => return Ok(()),
        }
        for field in &block.fields {
            self.track_ref(&field.ty.named)?;
            for arg in field.args.values() {
                self.track_ref(&arg.ty.named)?;
            }
        }
        for interface in &block.interfaces {
            self.track_ref(interface)?;
        }
        for modification in block.modifications.values() {
            if let Some(ty) = &modification.ty {
                self.track_ref(&ty.named)?;
            }
            if let Some(args) = &modification.args {
                for arg in args.values() {
                    self.track_ref(&arg.ty.named)?;
                }
            }
        }
        let added: Vec<_> = block.added_types.drain(..).collect();
        for source in added {
            self.add_type(source)?;
        }
        Ok(())
    }

    fn walk_input(&mut self, def: &Arc<TypeSource>) -> Result<(), SchemaError> {
        let mut block = self.input_block(def.name(), BlockMode::Walk);
        match &**def {
            TypeSource::InputObject(d) => (d.definition)(&mut block),
            TypeSource::ExtendInput(d) => (d.definition)(&mut block),
            _ => return Ok(()),
        }
        for field in &block.fields {
            self.track_ref(&field.ty.named)?;
        }
        let added: Vec<_> = block.added_types.drain(..).collect();
        for source in added {
            self.add_type(source)?;
        }
        Ok(())
    }

    /// Structural discovery over an imported concrete type.
    fn walk_named(&mut self, ty: &Arc<NamedType>) -> Result<(), SchemaError> {
        match &**ty {
            NamedType::Object(object) => {
                for field in object.fields().values() {
                    self.track_concrete_field(field)?;
                }
                for interface in object.interfaces() {
                    self.add_unknown(interface)?;
                }
            }
            NamedType::Interface(interface) => {
                for field in interface.fields().values() {
                    self.track_concrete_field(field)?;
                }
                for parent in interface.interfaces() {
                    self.add_unknown(parent)?;
                }
            }
            NamedType::InputObject(input) => {
                for field in input.fields().values() {
                    self.add_unknown(field.ty.named_type())?;
                }
            }
            NamedType::Union(union) => {
                for member in union.members() {
                    self.add_unknown(member)?;
                }
            }
            NamedType::Scalar(_) | NamedType::Enum(_) => {}
        }
        Ok(())
    }

    fn track_concrete_field(&mut self, field: &OutputField) -> Result<(), SchemaError> {
        self.add_unknown(field.ty.named_type())?;
        for arg in field.args.values() {
            self.add_unknown(arg.ty.named_type())?;
        }
        Ok(())
    }

    fn track_ref(&mut self, named: &NamedRef) -> Result<(), SchemaError> {
        match named {
            NamedRef::Name(_) => Ok(()),
            NamedRef::Def(def) => self.add_type(Arc::clone(def)),
            NamedRef::Type(ty) => self.add_unknown(ty),
        }
    }

    fn add_unknown(&mut self, ty: &Arc<NamedType>) -> Result<(), SchemaError> {
        if self.defined_types.contains_key(ty.name()) {
            return Ok(());
        }
        self.add_type(Arc::new(TypeSource::Concrete(Arc::clone(ty))))
    }

    // ------------------------------------------------------------------
    // Cycle detection
    // ------------------------------------------------------------------

    /// Depth-first pass over pending interface definitions, rejecting any
    /// cycle in the implements graph. Runs declaration closures against
    /// throwaway tracking blocks; the registry is never mutated.
    fn check_interface_cycles(&self) -> Result<(), SchemaError> {
        let mut interfaces: IndexMap<String, Arc<TypeSource>> = IndexMap::new();
        for (name, def) in &self.pending_types {
            if matches!(&**def, TypeSource::Interface(_)) {
                interfaces.insert(name.clone(), Arc::clone(def));
            }
        }
        let mut already_checked = FxHashSet::default();
        let mut path = Vec::new();
        for def in interfaces.values() {
            self.visit_interface(def, &interfaces, &mut already_checked, &mut path)?;
        }
        Ok(())
    }

    fn visit_interface(
        &self,
        def: &Arc<TypeSource>,
        interfaces: &IndexMap<String, Arc<TypeSource>>,
        already_checked: &mut FxHashSet<String>,
        path: &mut Vec<String>,
    ) -> Result<(), SchemaError> {
        let name = def.name();
        if already_checked.contains(name) {
            return Ok(());
        }
        if path.iter().any(|p| p == name) {
            if path.last().map(String::as_str) == Some(name) {
                return Err(SchemaError::SelfImplementation(name.to_string()));
            }
            let start = path.iter().position(|p| p == name).unwrap_or(0);
            let mut cycle = path[start..].to_vec();
            cycle.push(name.to_string());
            return Err(SchemaError::Cycle { path: cycle });
        }
        let TypeSource::Interface(interface) = &**def else {
            return Ok(());
        };
        let mut block = self.output_block(name, BlockMode::Walk);
        (interface.definition)(&mut block);
        path.push(name.to_string());
        for parent in &block.interfaces {
            if let Some(child) = interfaces.get(parent.name()) {
                self.visit_interface(child, interfaces, already_checked, path)?;
            }
        }
        path.pop();
        already_checked.insert(name.to_string());
        Ok(())
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    fn construct_pending_types(&mut self) -> Result<(), SchemaError> {
        let mut order: Vec<String> = self.pending_types.keys().cloned().collect();
        // A schema always has a Query type; an absent one falls through to
        // the missing-type chain, which synthesizes a placeholder.
        if !self.has_type("Query") {
            order.push("Query".to_string());
        }
        for name in order {
            if !self.types_to_walk.is_empty() {
                self.walk()?;
            }
            if self.final_types.contains_key(&name) {
                continue;
            }
            if self.defined_types.contains_key(&name) {
                return Err(redefined_error(&name));
            }
            let built = self.get_or_build_type(&NamedRef::Name(name.clone()), false)?;
            self.final_types.insert(name, built);
            self.building.clear();
        }

        // An extension queue whose target was never defined declares an
        // implicit object / input-object type.
        let leftover: Vec<String> = self
            .type_extensions
            .iter()
            .filter(|(_, slot)| matches!(slot, ExtensionSlot::Queued(_)))
            .map(|(name, _)| name.clone())
            .collect();
        for name in leftover {
            if self.final_types.contains_key(&name) {
                return Err(SchemaError::Configuration(format!(
                    "type {name} was extended but built without consuming its extensions; \
                     only object and interface types can be extended"
                )));
            }
            let def = ObjectTypeDef::new(name, |_| {});
            self.construct_object(&def)?;
            self.building.clear();
        }
        let leftover_input: Vec<String> = self
            .input_type_extensions
            .iter()
            .filter(|(_, slot)| matches!(slot, ExtensionSlot::Queued(_)))
            .map(|(name, _)| name.clone())
            .collect();
        for name in leftover_input {
            if self.final_types.contains_key(&name) {
                return Err(SchemaError::Configuration(format!(
                    "type {name} was extended but built without consuming its extensions; \
                     input extensions can only target input object types"
                )));
            }
            let def = InputObjectTypeDef::new(name, |_| {});
            self.construct_input_object(&def)?;
            self.building.clear();
        }
        Ok(())
    }

    /// Returns the concrete type for a reference: cached, newly constructed,
    /// or the missing-type fallback.
    fn get_or_build_type(
        &mut self,
        named: &NamedRef,
        from_object: bool,
    ) -> Result<Arc<NamedType>, SchemaError> {
        match named {
            NamedRef::Type(ty) => Ok(Arc::clone(ty)),
            NamedRef::Def(def) => {
                if !self.has_type(def.name()) {
                    self.add_type(Arc::clone(def))?;
                    if !self.types_to_walk.is_empty() {
                        self.walk()?;
                    }
                }
                let name = def.name().to_string();
                self.get_or_build_type(&NamedRef::Name(name), true)
            }
            NamedRef::Name(name) => {
                if let Some(built_in) = self.ensure_built_in(name) {
                    return Ok(built_in);
                }
                if let Some(ty) = self.final_types.get(name) {
                    return Ok(Arc::clone(ty));
                }
                if self.building.contains(name) {
                    let chain: Vec<&str> = self.building.iter().map(String::as_str).collect();
                    return Err(SchemaError::Configuration(format!(
                        "circular dependency detected while building types: {}",
                        chain.join(", ")
                    )));
                }
                if let Some(pending) = self.pending_types.get(name).cloned() {
                    self.building.insert(name.clone());
                    let built = match &*pending {
                        TypeSource::Object(def) => self.construct_object(def)?,
                        TypeSource::Interface(def) => self.construct_interface(def)?,
                        TypeSource::Union(def) => self.construct_union(def)?,
                        TypeSource::Enum(def) => self.construct_enum(def)?,
                        TypeSource::Scalar(def) => self.construct_scalar(def),
                        TypeSource::InputObject(def) => self.construct_input_object(def)?,
                        other => {
                            tracing::warn!(
                                type_name = name.as_str(),
                                "unbuildable pending definition {other:?}, treating as missing"
                            );
                            return self.missing_type(name, from_object);
                        }
                    };
                    return Ok(built);
                }
                self.missing_type(name, from_object)
            }
        }
    }

    /// Fallback chain for a reference that cannot be found. The first
    /// missing-type hook returning a replacement wins; a missing "Query"
    /// synthesizes the default root; everything else records provenance and
    /// continues with the inert placeholder.
    fn missing_type(
        &mut self,
        name: &str,
        from_object: bool,
    ) -> Result<Arc<NamedType>, SchemaError> {
        let hooks = self.on_missing_type_fns.clone();
        for hook in &hooks {
            if let Some(replacement) = hook(name, &mut BuilderLens::new(self)) {
                let replacement_name = replacement.name().to_string();
                self.add_type(Arc::clone(&replacement))?;
                if !self.types_to_walk.is_empty() {
                    self.walk()?;
                }
                return self.get_or_build_type(&NamedRef::Name(replacement_name), from_object);
            }
        }
        if name == "Query" {
            return Ok(self.default_query_type());
        }
        if !self.missing_types.contains_key(name) {
            tracing::debug!(type_name = name, from_object, "deferring missing type");
            self.missing_types
                .insert(name.to_string(), MissingTypeInfo { from_object });
            self.diagnostics.error(
                codes::MISSING_TYPE,
                format!("unknown type {name}"),
                Origin::type_level(name),
            );
        }
        Ok(Arc::clone(&self.unknown_type))
    }

    fn default_query_type(&mut self) -> Arc<NamedType> {
        let object = ObjectType::shell("Query", None, None);
        let boolean = self
            .ensure_built_in("Boolean")
            .expect("built-in scalars are registered at construction");
        let mut fields = IndexMap::new();
        fields.insert(
            "ok".to_string(),
            OutputField {
                name: "ok".to_string(),
                description: None,
                deprecation_reason: None,
                ty: ResolvedType::NonNull(Box::new(ResolvedType::Named(boolean))),
                args: IndexMap::new(),
                resolver: Arc::new(FnResolver::new(|_, _, _, _| Ok(Value::Bool(true)))),
                subscribe: None,
            },
        );
        object.set_interfaces(Vec::new());
        object.set_fields(fields);
        let ty = Arc::new(NamedType::Object(object));
        self.final_types.insert("Query".to_string(), Arc::clone(&ty));
        ty
    }

    fn ensure_built_in(&mut self, name: &str) -> Option<Arc<NamedType>> {
        let ty = Arc::clone(self.built_ins.get(name)?);
        self.final_types
            .entry(name.to_string())
            .or_insert_with(|| Arc::clone(&ty));
        Some(ty)
    }

    fn finalize(&mut self, ty: Arc<NamedType>) -> Arc<NamedType> {
        self.final_types
            .insert(ty.name().to_string(), Arc::clone(&ty));
        ty
    }

    fn output_block(&self, name: &str, mode: BlockMode) -> ObjectDefinitionBlock {
        ObjectDefinitionBlock::new(name, mode, self.dynamic_output_methods.clone())
    }

    fn input_block(&self, name: &str, mode: BlockMode) -> InputDefinitionBlock {
        InputDefinitionBlock::new(name, mode, self.dynamic_input_methods.clone())
    }

    fn construct_object(&mut self, def: &ObjectTypeDef) -> Result<Arc<NamedType>, SchemaError> {
        tracing::debug!(type_name = def.name.as_str(), "building object type");
        let mut block = self.output_block(&def.name, BlockMode::Build);
        (def.definition)(&mut block);
        let hooks = self.on_object_definition_fns.clone();
        for hook in &hooks {
            hook(&mut block)?;
        }
        self.apply_type_extensions(&def.name, &mut block);
        self.drain_output_block(&mut block)?;
        if let Some(root) = &def.root_typing {
            self.root_typings.insert(def.name.clone(), root.clone());
        }
        let shell = Arc::new(NamedType::Object(ObjectType::shell(
            &def.name,
            def.description.clone(),
            def.is_type_of.clone(),
        )));
        self.resolve_jobs.insert(
            def.name.clone(),
            ResolveJob::Output(OutputJob {
                shell: Arc::clone(&shell),
                fields: std::mem::take(&mut block.fields),
                interfaces: std::mem::take(&mut block.interfaces),
                modifications: std::mem::take(&mut block.modifications),
                non_null: def.non_null_defaults,
            }),
        );
        Ok(self.finalize(shell))
    }

    fn construct_interface(
        &mut self,
        def: &InterfaceTypeDef,
    ) -> Result<Arc<NamedType>, SchemaError> {
        tracing::debug!(type_name = def.name.as_str(), "building interface type");
        let mut block = self.output_block(&def.name, BlockMode::Build);
        (def.definition)(&mut block);
        self.apply_type_extensions(&def.name, &mut block);
        self.drain_output_block(&mut block)?;
        if let Some(root) = &def.root_typing {
            self.root_typings.insert(def.name.clone(), root.clone());
        }
        let resolve_type = def
            .resolve_type
            .clone()
            .or_else(|| block.legacy_resolve_type.clone());
        let shell = Arc::new(NamedType::Interface(InterfaceType::shell(
            &def.name,
            def.description.clone(),
            resolve_type,
        )));
        self.resolve_jobs.insert(
            def.name.clone(),
            ResolveJob::Output(OutputJob {
                shell: Arc::clone(&shell),
                fields: std::mem::take(&mut block.fields),
                interfaces: std::mem::take(&mut block.interfaces),
                modifications: std::mem::take(&mut block.modifications),
                non_null: def.non_null_defaults,
            }),
        );
        Ok(self.finalize(shell))
    }

    fn construct_union(&mut self, def: &UnionTypeDef) -> Result<Arc<NamedType>, SchemaError> {
        tracing::debug!(type_name = def.name.as_str(), "building union type");
        let mut block = UnionDefinitionBlock::new(&def.name);
        (def.definition)(&mut block);
        for warning in block.warnings.drain(..) {
            tracing::warn!("{warning}");
            self.diagnostics
                .add(Diagnostic::warning(codes::DEPRECATED_USAGE, warning));
        }
        let members = block.members.take().ok_or_else(|| {
            SchemaError::Configuration(format!(
                "missing union members for {}; declare them with members(...) in the union \
                 definition",
                def.name
            ))
        })?;
        if members.is_empty() {
            return Err(SchemaError::Configuration(format!(
                "union {} must have at least one member type",
                def.name
            )));
        }
        if let Some(root) = &def.root_typing {
            self.root_typings.insert(def.name.clone(), root.clone());
        }
        let resolve_type = def
            .resolve_type
            .clone()
            .or_else(|| block.legacy_resolve_type.clone());
        let shell = Arc::new(NamedType::Union(UnionType::shell(
            &def.name,
            def.description.clone(),
            resolve_type,
        )));
        self.resolve_jobs.insert(
            def.name.clone(),
            ResolveJob::Union(UnionJob {
                shell: Arc::clone(&shell),
                members,
            }),
        );
        Ok(self.finalize(shell))
    }

    fn construct_enum(&mut self, def: &EnumTypeDef) -> Result<Arc<NamedType>, SchemaError> {
        let mut values: IndexMap<String, EnumValue> = IndexMap::new();
        match &def.members {
            EnumMemberSource::List(members) => {
                for member in members {
                    values.insert(
                        member.name.clone(),
                        EnumValue {
                            name: member.name.clone(),
                            value: member
                                .value
                                .clone()
                                .unwrap_or_else(|| Value::String(member.name.clone())),
                            description: member.description.clone(),
                            deprecation_reason: member.deprecation.clone(),
                        },
                    );
                }
            }
            EnumMemberSource::Mapping(mapping) => {
                for (key, value) in mapping {
                    // Integer-backed enum sources carry reverse-mapping
                    // entries keyed by their numeric values; skip those.
                    if key.parse::<f64>().is_ok() {
                        continue;
                    }
                    values.insert(
                        key.clone(),
                        EnumValue {
                            name: key.clone(),
                            value: value.clone(),
                            description: None,
                            deprecation_reason: None,
                        },
                    );
                }
            }
        }
        if values.is_empty() {
            return Err(SchemaError::Configuration(format!(
                "enum {} must have at least one member",
                def.name
            )));
        }
        if let Some(root) = &def.root_typing {
            self.root_typings.insert(def.name.clone(), root.clone());
        }
        Ok(self.finalize(Arc::new(NamedType::Enum(EnumType {
            name: def.name.clone(),
            description: def.description.clone(),
            values,
        }))))
    }

    fn construct_scalar(&mut self, def: &ScalarTypeDef) -> Arc<NamedType> {
        if let Some(root) = &def.root_typing {
            self.root_typings.insert(def.name.clone(), root.clone());
        }
        let mut scalar = ScalarType::new(&def.name);
        scalar.description = def.description.clone();
        scalar.serialize = def.serialize.clone();
        scalar.parse_value = def.parse_value.clone();
        self.finalize(Arc::new(NamedType::Scalar(scalar)))
    }

    fn construct_input_object(
        &mut self,
        def: &InputObjectTypeDef,
    ) -> Result<Arc<NamedType>, SchemaError> {
        tracing::debug!(type_name = def.name.as_str(), "building input object type");
        let mut block = self.input_block(&def.name, BlockMode::Build);
        (def.definition)(&mut block);
        let hooks = self.on_input_object_definition_fns.clone();
        for hook in &hooks {
            hook(&mut block)?;
        }
        self.apply_input_extensions(&def.name, &mut block);
        self.drain_input_block(&mut block)?;
        let shell = Arc::new(NamedType::InputObject(InputObjectType::shell(
            &def.name,
            def.description.clone(),
        )));
        self.resolve_jobs.insert(
            def.name.clone(),
            ResolveJob::InputObject(InputObjectJob {
                shell: Arc::clone(&shell),
                fields: std::mem::take(&mut block.fields),
                non_null: def.non_null_defaults,
            }),
        );
        Ok(self.finalize(shell))
    }

    fn apply_type_extensions(&mut self, name: &str, block: &mut ObjectDefinitionBlock) {
        let Some(slot) = self.type_extensions.get_mut(name) else {
            return;
        };
        let queued = match std::mem::replace(slot, ExtensionSlot::Applied) {
            ExtensionSlot::Queued(queued) => queued,
            ExtensionSlot::Applied => Vec::new(),
        };
        for extension in queued {
            if let TypeSource::ExtendObject(ext) = &*extension {
                (ext.definition)(block);
            }
        }
    }

    fn apply_input_extensions(&mut self, name: &str, block: &mut InputDefinitionBlock) {
        let Some(slot) = self.input_type_extensions.get_mut(name) else {
            return;
        };
        let queued = match std::mem::replace(slot, ExtensionSlot::Applied) {
            ExtensionSlot::Queued(queued) => queued,
            ExtensionSlot::Applied => Vec::new(),
        };
        for extension in queued {
            if let TypeSource::ExtendInput(ext) = &*extension {
                (ext.definition)(block);
            }
        }
    }

    fn drain_output_block(&mut self, block: &mut ObjectDefinitionBlock) -> Result<(), SchemaError> {
        let added: Vec<_> = block.added_types.drain(..).collect();
        for source in added {
            self.add_type(source)?;
        }
        if block.mode == BlockMode::Build {
            for warning in block.warnings.drain(..) {
                tracing::warn!("{warning}");
                self.diagnostics
                    .add(Diagnostic::warning(codes::DEPRECATED_USAGE, warning));
            }
        }
        Ok(())
    }

    fn drain_input_block(&mut self, block: &mut InputDefinitionBlock) -> Result<(), SchemaError> {
        let added: Vec<_> = block.added_types.drain(..).collect();
        for source in added {
            self.add_type(source)?;
        }
        if block.mode == BlockMode::Build {
            for warning in block.warnings.drain(..) {
                tracing::warn!("{warning}");
                self.diagnostics
                    .add(Diagnostic::warning(codes::DEPRECATED_USAGE, warning));
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Lazy slot resolution
    // ------------------------------------------------------------------

    /// Forces every lazy slot until the graph is quiescent. Resolving one
    /// slot may construct further shells (missing-type replacements, inline
    /// definitions), which enqueue their own jobs.
    fn resolve_lazy_types(&mut self) -> Result<(), SchemaError> {
        loop {
            if !self.types_to_walk.is_empty() {
                self.walk()?;
            }
            let Some((_, job)) = self.resolve_jobs.shift_remove_index(0) else {
                break;
            };
            self.run_resolve_job(job)?;
            self.building.clear();
        }
        Ok(())
    }

    /// Forces the named type's lazy slots now, if still unresolved. The
    /// demand-driven analog of evaluating a field thunk.
    fn ensure_resolved(&mut self, name: &str) -> Result<(), SchemaError> {
        if let Some(job) = self.resolve_jobs.shift_remove(name) {
            self.run_resolve_job(job)?;
        }
        Ok(())
    }

    fn run_resolve_job(&mut self, job: ResolveJob) -> Result<(), SchemaError> {
        match job {
            ResolveJob::Output(job) => self.resolve_output_job(job),
            ResolveJob::InputObject(job) => self.resolve_input_object_job(job),
            ResolveJob::Union(job) => self.resolve_union_job(job),
            ResolveJob::Concrete(job) => self.resolve_concrete_job(job),
        }
    }

    fn resolve_output_job(&mut self, job: OutputJob) -> Result<(), SchemaError> {
        let OutputJob {
            shell,
            fields: field_defs,
            interfaces: interface_refs,
            modifications,
            non_null,
        } = job;
        let parent_name = shell.name().to_string();
        let interfaces = self.build_interface_list(&interface_refs)?;
        let mut fields =
            self.build_inherited_fields(&interfaces, &modifications, non_null)?;
        for def in field_defs {
            let field = self.build_output_field(def, &parent_name, non_null)?;
            // Own fields win on name collision with inherited ones.
            fields.insert(field.name.clone(), field);
        }
        match &*shell {
            NamedType::Object(object) => {
                object.set_interfaces(interfaces);
                object.set_fields(fields);
            }
            NamedType::Interface(interface) => {
                interface.set_interfaces(interfaces);
                interface.set_fields(fields);
            }
            _ => {}
        }
        Ok(())
    }

    fn resolve_input_object_job(&mut self, job: InputObjectJob) -> Result<(), SchemaError> {
        let InputObjectJob {
            shell,
            fields: field_defs,
            non_null,
        } = job;
        let hooks = self.on_add_input_field_fns.clone();
        let mut fields = IndexMap::new();
        for def in field_defs {
            let mut def = def;
            for hook in &hooks {
                if let Some(replacement) = hook(&def) {
                    def = replacement;
                }
            }
            let value = self.build_input_value(def, non_null)?;
            fields.insert(value.name.clone(), value);
        }
        if let NamedType::InputObject(input) = &*shell {
            input.set_fields(fields);
        }
        Ok(())
    }

    fn resolve_union_job(&mut self, job: UnionJob) -> Result<(), SchemaError> {
        let UnionJob { shell, members } = job;
        let mut resolved = Vec::with_capacity(members.len());
        for member in &members {
            resolved.push(self.get_object_type(member)?);
        }
        if let NamedType::Union(union) = &*shell {
            union.set_members(resolved);
        }
        Ok(())
    }

    /// Re-resolves an imported concrete type against the current registry so
    /// substitutions made in this build take effect.
    fn resolve_concrete_job(&mut self, job: ConcreteJob) -> Result<(), SchemaError> {
        let ConcreteJob { shell, source } = job;
        match (&*shell, &*source) {
            (NamedType::Object(dst), NamedType::Object(src)) => {
                let mut interfaces = Vec::with_capacity(src.interfaces().len());
                for interface in src.interfaces() {
                    interfaces.push(
                        self.get_interface_type(&NamedRef::Name(interface.name().to_string()))?,
                    );
                }
                let fields = self.rebuild_concrete_fields(src.fields(), shell.name())?;
                dst.set_interfaces(interfaces);
                dst.set_fields(fields);
            }
            (NamedType::Interface(dst), NamedType::Interface(src)) => {
                let mut interfaces = Vec::with_capacity(src.interfaces().len());
                for interface in src.interfaces() {
                    interfaces.push(
                        self.get_interface_type(&NamedRef::Name(interface.name().to_string()))?,
                    );
                }
                let fields = self.rebuild_concrete_fields(src.fields(), shell.name())?;
                dst.set_interfaces(interfaces);
                dst.set_fields(fields);
            }
            (NamedType::Union(dst), NamedType::Union(src)) => {
                let mut members = Vec::with_capacity(src.members().len());
                for member in src.members() {
                    members
                        .push(self.get_object_type(&NamedRef::Name(member.name().to_string()))?);
                }
                dst.set_members(members);
            }
            _ => {}
        }
        Ok(())
    }

    fn rebuild_concrete_fields(
        &mut self,
        source_fields: &IndexMap<String, OutputField>,
        parent_type: &str,
    ) -> Result<IndexMap<String, OutputField>, SchemaError> {
        let originals: Vec<OutputField> = source_fields.values().cloned().collect();
        let hooks = self.on_create_resolver_fns.clone();
        let mut fields = IndexMap::new();
        for field in originals {
            let ty = self.replace_named_type(&field.ty);
            let mut args = IndexMap::new();
            for (name, arg) in &field.args {
                args.insert(
                    name.clone(),
                    InputValue {
                        name: arg.name.clone(),
                        description: arg.description.clone(),
                        ty: self.replace_named_type(&arg.ty),
                        default_value: arg.default_value.clone(),
                    },
                );
            }
            let resolver = self.compose_with_hooks(
                &hooks,
                &field.name,
                &ty,
                parent_type,
                true,
                Arc::clone(&field.resolver),
            );
            fields.insert(
                field.name.clone(),
                OutputField {
                    name: field.name,
                    description: field.description,
                    deprecation_reason: field.deprecation_reason,
                    ty,
                    args,
                    resolver,
                    subscribe: field.subscribe,
                },
            );
        }
        Ok(fields)
    }

    /// Re-points a resolved reference at this build's version of the named
    /// type, preserving the wrapping. References whose final and imported
    /// types are the same object pass through untouched.
    fn replace_named_type(&self, ty: &ResolvedType) -> ResolvedType {
        let (named, wrapping) = unwrap_resolved(ty);
        let name = named.name();
        match (self.final_types.get(name), self.defined_types.get(name)) {
            (Some(finalized), Some(defined)) if Arc::ptr_eq(finalized, defined) => ty.clone(),
            (Some(finalized), _) => rewrap(Arc::clone(finalized), &wrapping),
            _ => ty.clone(),
        }
    }

    fn rewrap_concrete(&mut self, ty: &Arc<NamedType>) -> Arc<NamedType> {
        let shell = match &**ty {
            NamedType::Object(object) => Arc::new(NamedType::Object(ObjectType::shell(
                &object.name,
                object.description.clone(),
                object.is_type_of().cloned(),
            ))),
            NamedType::Interface(interface) => {
                Arc::new(NamedType::Interface(InterfaceType::shell(
                    &interface.name,
                    interface.description.clone(),
                    interface.resolve_type().cloned(),
                )))
            }
            NamedType::Union(union) => Arc::new(NamedType::Union(UnionType::shell(
                &union.name,
                union.description.clone(),
                union.resolve_type().cloned(),
            ))),
            // Leaf and input kinds carry no cross-references worth
            // re-resolving; import them as-is.
            _ => return Arc::clone(ty),
        };
        self.resolve_jobs.insert(
            ty.name().to_string(),
            ResolveJob::Concrete(ConcreteJob {
                shell: Arc::clone(&shell),
                source: Arc::clone(ty),
            }),
        );
        shell
    }

    // ------------------------------------------------------------------
    // Field resolution
    // ------------------------------------------------------------------

    fn build_interface_list(
        &mut self,
        refs: &[NamedRef],
    ) -> Result<Vec<Arc<NamedType>>, SchemaError> {
        let mut list: Vec<Arc<NamedType>> = Vec::new();
        for named in refs {
            let interface = self.get_interface_type(named)?;
            self.ensure_resolved(interface.name())?;
            let parents: Vec<Arc<NamedType>> = interface
                .as_interface()
                .map(|i| i.interfaces().to_vec())
                .unwrap_or_default();
            list.push(interface);
            list.extend(parents);
        }
        let mut seen = FxHashSet::default();
        list.retain(|ty| seen.insert(ty.name().to_string()));
        Ok(list)
    }

    /// Merges fields inherited from each implemented interface, applying any
    /// modification entry. Non-overridden parts pass through untouched,
    /// inherited resolvers included.
    fn build_inherited_fields(
        &mut self,
        interfaces: &[Arc<NamedType>],
        modifications: &IndexMap<String, FieldModification>,
        non_null: NonNullOverrides,
    ) -> Result<IndexMap<String, OutputField>, SchemaError> {
        let mut fields: IndexMap<String, OutputField> = IndexMap::new();
        for interface_type in interfaces {
            self.ensure_resolved(interface_type.name())?;
            let Some(interface) = interface_type.as_interface() else {
                continue;
            };
            let inherited: Vec<OutputField> = interface.fields().values().cloned().collect();
            for mut field in inherited {
                if let Some(modification) = modifications.get(&field.name) {
                    if let Some(description) = &modification.description {
                        field.description = Some(description.clone());
                    }
                    if let Some(reason) = &modification.deprecation {
                        field.deprecation_reason = Some(reason.clone());
                    }
                    if let Some(ty) = &modification.ty {
                        let named = self.get_output_type(&ty.named)?;
                        field.ty = if ty.wrapping.is_empty() {
                            // A bare name keeps the inherited wrapping.
                            let (_, wrapping) = unwrap_resolved(&field.ty);
                            rewrap(named, &wrapping)
                        } else {
                            rewrap(named, &finalize_wrapping(false, &ty.wrapping, None))
                        };
                    }
                    if let Some(args) = &modification.args {
                        for (name, def) in args {
                            let value = self.build_input_value(def.clone(), non_null)?;
                            field.args.insert(name.clone(), value);
                        }
                    }
                }
                fields.insert(field.name.clone(), field);
            }
        }
        Ok(fields)
    }

    fn build_output_field(
        &mut self,
        def: OutputFieldDef,
        parent_type: &str,
        non_null: NonNullOverrides,
    ) -> Result<OutputField, SchemaError> {
        let mut def = def;
        let add_hooks = self.on_add_output_field_fns.clone();
        for hook in &add_hooks {
            if let Some(replacement) = hook(&def) {
                def = replacement;
            }
        }
        let non_null_default = non_null
            .output
            .unwrap_or(self.config.non_null_defaults.output);
        let wrapping = finalize_wrapping(
            non_null_default,
            &def.ty.wrapping,
            def.wrapping_override.as_deref(),
        );
        let named = self.get_output_type(&def.ty.named)?;
        let ty = rewrap(named, &wrapping);
        let args = self.build_arguments(&def.args, parent_type, &def.name, non_null)?;

        let has_user_resolver = def.resolver.is_some();
        let base: Arc<dyn Resolver> = def
            .resolver
            .clone()
            .unwrap_or_else(|| Arc::new(DefaultResolver));
        let resolver_hooks = self.on_create_resolver_fns.clone();
        let resolver = self.compose_with_hooks(
            &resolver_hooks,
            &def.name,
            &ty,
            parent_type,
            has_user_resolver,
            base,
        );
        let subscribe = match def.subscribe.clone() {
            Some(subscribe) => {
                let subscribe_hooks = self.on_create_subscribe_fns.clone();
                Some(self.compose_with_hooks(
                    &subscribe_hooks,
                    &def.name,
                    &ty,
                    parent_type,
                    true,
                    subscribe,
                ))
            }
            None => None,
        };
        Ok(OutputField {
            name: def.name,
            description: def.description,
            deprecation_reason: def.deprecation,
            ty,
            args,
            resolver,
            subscribe,
        })
    }

    fn build_arguments(
        &mut self,
        args: &IndexMap<String, InputValueDef>,
        parent_type: &str,
        field_name: &str,
        non_null: NonNullOverrides,
    ) -> Result<IndexMap<String, InputValue>, SchemaError> {
        let hooks = self.on_add_arg_fns.clone();
        let mut out = IndexMap::new();
        for (arg_name, def) in args {
            let mut def = def.clone();
            let context = AddArgContext {
                arg_name,
                field_name,
                parent_type,
            };
            for hook in &hooks {
                if let Some(replacement) = hook(&context, &def) {
                    def = replacement;
                }
            }
            let value = self.build_input_value(def, non_null)?;
            out.insert(arg_name.clone(), value);
        }
        Ok(out)
    }

    fn build_input_value(
        &mut self,
        def: InputValueDef,
        non_null: NonNullOverrides,
    ) -> Result<InputValue, SchemaError> {
        let non_null_default = non_null
            .input
            .unwrap_or(self.config.non_null_defaults.input);
        let wrapping = finalize_wrapping(
            non_null_default,
            &def.ty.wrapping,
            def.wrapping_override.as_deref(),
        );
        let named = self.get_input_type(&def.ty.named)?;
        Ok(InputValue {
            name: def.name,
            description: def.description,
            ty: rewrap(named, &wrapping),
            default_value: def.default_value,
        })
    }

    fn compose_with_hooks(
        &self,
        hooks: &[CreateFieldResolverFn],
        field_name: &str,
        field_type: &ResolvedType,
        parent_type: &str,
        has_user_resolver: bool,
        base: Arc<dyn Resolver>,
    ) -> Arc<dyn Resolver> {
        if hooks.is_empty() {
            return base;
        }
        let extension = self
            .schema_extension
            .as_ref()
            .expect("schema extension is created before construction");
        let context = FieldResolveContext {
            field_name,
            field_type,
            parent_type,
            has_user_resolver,
            config: &self.config,
            extension: extension.as_ref(),
            builder: self,
        };
        let middleware: Vec<_> = hooks.iter().filter_map(|hook| hook(&context)).collect();
        if middleware.is_empty() {
            base
        } else {
            compose_middleware(middleware, base)
        }
    }

    // ------------------------------------------------------------------
    // Category-checked lookups
    // ------------------------------------------------------------------

    fn get_output_type(&mut self, named: &NamedRef) -> Result<Arc<NamedType>, SchemaError> {
        let ty = self.get_or_build_type(named, true)?;
        if !ty.is_output() {
            return Err(SchemaError::TypeMismatch {
                type_name: named.name().to_string(),
                expected: "a valid output type",
                actual: ty.kind().as_str(),
            });
        }
        Ok(ty)
    }

    fn get_input_type(&mut self, named: &NamedRef) -> Result<Arc<NamedType>, SchemaError> {
        let ty = self.get_or_build_type(named, false)?;
        if !ty.is_input() {
            return Err(SchemaError::TypeMismatch {
                type_name: named.name().to_string(),
                expected: "a valid input type",
                actual: ty.kind().as_str(),
            });
        }
        Ok(ty)
    }

    fn get_interface_type(&mut self, named: &NamedRef) -> Result<Arc<NamedType>, SchemaError> {
        let ty = self.get_or_build_type(named, true)?;
        if ty.as_interface().is_none() {
            return Err(SchemaError::TypeMismatch {
                type_name: named.name().to_string(),
                expected: "an interface type",
                actual: ty.kind().as_str(),
            });
        }
        Ok(ty)
    }

    fn get_object_type(&mut self, named: &NamedRef) -> Result<Arc<NamedType>, SchemaError> {
        let ty = self.get_or_build_type(named, true)?;
        if ty.as_object().is_none() {
            return Err(SchemaError::TypeMismatch {
                type_name: named.name().to_string(),
                expected: "an object type",
                actual: ty.kind().as_str(),
            });
        }
        Ok(ty)
    }
}

fn redefined_error(name: &str) -> SchemaError {
    SchemaError::Configuration(format!(
        "{name} was already defined and imported as a type; a name can only be registered once"
    ))
}

fn describe_method<B>(name: &str, entry: &DynamicMethodEntry<B>) -> DynamicMethodInfo {
    DynamicMethodInfo {
        name: name.to_string(),
        scalar: match entry {
            DynamicMethodEntry::Scalar(scalar) => Some(scalar.clone()),
            DynamicMethodEntry::Factory(_) => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::EnumValueDef;
    use serde_json::json;

    fn empty_builder() -> SchemaBuilder {
        SchemaBuilder::new(SchemaConfig::new())
    }

    #[test]
    fn test_identical_registration_is_noop_and_clash_errors() {
        let mut builder = empty_builder();
        let def: Arc<TypeSource> = Arc::new(ObjectTypeDef::new("User", |_| {}).into());

        builder.add_type(Arc::clone(&def)).unwrap();
        builder.add_type(Arc::clone(&def)).unwrap();
        assert!(builder.has_type("User"));

        let clash: Arc<TypeSource> = Arc::new(ObjectTypeDef::new("User", |_| {}).into());
        let err = builder.add_type(clash).unwrap_err();
        assert!(err.to_string().contains("User"));
    }

    #[test]
    fn test_internal_names_are_skipped() {
        let mut builder = empty_builder();
        builder
            .add_type(ObjectTypeDef::new("__Internal", |_| {}))
            .unwrap();
        assert!(!builder.has_type("__Internal"));
    }

    #[test]
    fn test_plugin_in_types_channel_is_rejected() {
        let mut builder = empty_builder();
        let err = builder
            .add_types(SchemaSource::Plugin(Plugin::new("auth")))
            .unwrap_err();
        assert!(err.to_string().contains("auth"));
        assert!(err.to_string().contains("plugins list"));
    }

    #[test]
    fn test_enum_mapping_filters_reverse_mapping_keys() {
        let mut builder = empty_builder();
        let mut mapping = IndexMap::new();
        mapping.insert("Red".to_string(), json!(0));
        mapping.insert("Green".to_string(), json!(1));
        mapping.insert("0".to_string(), json!("Red"));
        mapping.insert("1".to_string(), json!("Green"));
        let def = EnumTypeDef::new("Color", EnumMemberSource::Mapping(mapping));

        let built = builder.construct_enum(&def).unwrap();
        let values = &built.as_enum().unwrap().values;
        assert_eq!(values.len(), 2);
        assert!(values.contains_key("Red"));
        assert!(values.contains_key("Green"));
    }

    #[test]
    fn test_enum_members_default_to_their_names() {
        let mut builder = empty_builder();
        let def = EnumTypeDef::new(
            "Role",
            EnumMemberSource::List(vec![
                EnumValueDef::new("ADMIN"),
                EnumValueDef::new("USER").with_value(json!(2)),
            ]),
        );
        let built = builder.construct_enum(&def).unwrap();
        let values = &built.as_enum().unwrap().values;
        assert_eq!(values["ADMIN"].value, json!("ADMIN"));
        assert_eq!(values["USER"].value, json!(2));
    }

    #[test]
    fn test_empty_enum_is_rejected() {
        let mut builder = empty_builder();
        let def = EnumTypeDef::new("Empty", EnumMemberSource::List(Vec::new()));
        let err = builder.construct_enum(&def).unwrap_err();
        assert!(err.to_string().contains("Empty"));
        assert!(err.to_string().contains("at least one member"));
    }

    #[test]
    fn test_union_without_members_is_rejected() {
        let mut builder = empty_builder();
        let def = UnionTypeDef::new("Nothing", |_| {});
        let err = builder.construct_union(&def).unwrap_err();
        assert!(err.to_string().contains("missing union members"));

        let def = UnionTypeDef::new("AlsoNothing", |block| {
            block.members(Vec::<&str>::new());
        });
        let err = builder.construct_union(&def).unwrap_err();
        assert!(err.to_string().contains("at least one member"));
    }

    #[test]
    fn test_scalar_shorthand_registers_dynamic_methods() {
        let mut builder = empty_builder();
        builder
            .add_type(ScalarTypeDef::new("DateTime").with_shorthand("dateTime"))
            .unwrap();
        assert!(builder.dynamic_output_methods.contains_key("dateTime"));
        assert!(builder.dynamic_input_methods.contains_key("dateTime"));
    }

    #[test]
    fn test_interface_self_implementation_is_detected() {
        let mut builder = empty_builder();
        builder
            .add_type(InterfaceTypeDef::new("Node", |block| {
                block.implements("Node");
            }))
            .unwrap();
        let err = builder.check_interface_cycles().unwrap_err();
        assert!(matches!(err, SchemaError::SelfImplementation(name) if name == "Node"));
    }

    #[test]
    fn test_interface_cycle_reports_full_path() {
        let mut builder = empty_builder();
        builder
            .add_type(InterfaceTypeDef::new("A", |block| {
                block.implements("B");
            }))
            .unwrap();
        builder
            .add_type(InterfaceTypeDef::new("B", |block| {
                block.implements("A");
            }))
            .unwrap();
        let err = builder.check_interface_cycles().unwrap_err();
        assert_eq!(
            err.to_string(),
            "interface circular dependency detected: A -> B -> A"
        );
    }
}
