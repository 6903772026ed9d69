//! Plugin descriptors, the hook pipeline, and middleware composition.
//!
//! A plugin is an explicit record of optional handler slots, populated once
//! at installation and iterated as ordered sequences per hook point. Nothing
//! is probed at dispatch time.

use crate::builder::SchemaBuilder;
use crate::config::BuildConfig;
use crate::definition::{
    InputDefinitionBlock, InputValueDef, ObjectDefinitionBlock, OutputFieldDef, TypeSource,
};
use crate::resolver::{Context, Resolver, ResolverArgs, ResolverFuture, ResolverInfo};
use crate::schema::{Schema, SchemaExtension};
use crate::types::ResolvedType;
use forgeql_core::SchemaError;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Capability handle into the registry, passed to install, before-build and
/// missing-type hooks.
pub struct BuilderLens<'a> {
    builder: &'a mut SchemaBuilder,
}

impl<'a> BuilderLens<'a> {
    pub(crate) fn new(builder: &'a mut SchemaBuilder) -> Self {
        Self { builder }
    }

    /// True if the registry already knows the named type.
    pub fn has_type(&self, name: &str) -> bool {
        self.builder.has_type(name)
    }

    /// Registers an additional type source.
    pub fn add_type(&mut self, source: impl Into<Arc<TypeSource>>) -> Result<(), SchemaError> {
        self.builder.add_type(source)
    }

    /// Sets a free-form config option.
    pub fn set_config_option(&mut self, key: impl Into<String>, value: Value) {
        self.builder.set_config_option(key, value);
    }

    /// True if a free-form config option is set.
    pub fn has_config_option(&self, key: &str) -> bool {
        self.builder.has_config_option(key)
    }

    /// Reads a free-form config option.
    pub fn get_config_option(&self, key: &str) -> Option<&Value> {
        self.builder.get_config_option(key)
    }
}

/// Immutable context handed to resolver- and subscribe-creation hooks.
pub struct FieldResolveContext<'a> {
    /// The field being finalized.
    pub field_name: &'a str,
    /// The field's resolved type.
    pub field_type: &'a ResolvedType,
    /// The owning type's name.
    pub parent_type: &'a str,
    /// True when the field declared its own resolver rather than falling
    /// back to the structural default.
    pub has_user_resolver: bool,
    /// The global build config.
    pub config: &'a BuildConfig,
    /// Schema-wide extension state.
    pub extension: &'a SchemaExtension,
    pub(crate) builder: &'a SchemaBuilder,
}

impl FieldResolveContext<'_> {
    /// True if the registry knows the named type.
    pub fn has_type(&self, name: &str) -> bool {
        self.builder.has_type(name)
    }
}

/// Context handed to on-add-argument hooks.
#[derive(Debug, Clone, Copy)]
pub struct AddArgContext<'a> {
    pub arg_name: &'a str,
    pub field_name: &'a str,
    pub parent_type: &'a str,
}

/// Resolver middleware: receives the resolution inputs plus the next
/// resolver in the chain.
pub type MiddlewareFn = Arc<
    dyn Fn(Value, ResolverArgs, Context, ResolverInfo, Arc<dyn Resolver>) -> ResolverFuture<'static>
        + Send
        + Sync,
>;

pub type InstallFn = Arc<dyn Fn(&mut BuilderLens<'_>) -> Result<(), SchemaError> + Send + Sync>;
pub type BeforeBuildFn =
    Arc<dyn Fn(&mut BuilderLens<'_>) -> Result<(), SchemaError> + Send + Sync>;
pub type MissingTypeFn =
    Arc<dyn Fn(&str, &mut BuilderLens<'_>) -> Option<Arc<TypeSource>> + Send + Sync>;
pub type ObjectDefinitionHookFn =
    Arc<dyn Fn(&mut ObjectDefinitionBlock) -> Result<(), SchemaError> + Send + Sync>;
pub type InputObjectDefinitionHookFn =
    Arc<dyn Fn(&mut InputDefinitionBlock) -> Result<(), SchemaError> + Send + Sync>;
pub type AddOutputFieldFn = Arc<dyn Fn(&OutputFieldDef) -> Option<OutputFieldDef> + Send + Sync>;
pub type AddInputFieldFn = Arc<dyn Fn(&InputValueDef) -> Option<InputValueDef> + Send + Sync>;
pub type AddArgFn =
    Arc<dyn Fn(&AddArgContext<'_>, &InputValueDef) -> Option<InputValueDef> + Send + Sync>;
pub type CreateFieldResolverFn =
    Arc<dyn Fn(&FieldResolveContext<'_>) -> Option<MiddlewareFn> + Send + Sync>;
pub type CreateFieldSubscribeFn =
    Arc<dyn Fn(&FieldResolveContext<'_>) -> Option<MiddlewareFn> + Send + Sync>;
pub type AfterBuildFn = Arc<dyn Fn(&Schema) + Send + Sync>;

/// A named bundle of optional lifecycle hooks. Every slot is optional; the
/// builder collects the populated ones into per-hook ordered sequences at
/// build start.
#[derive(Clone, Default)]
pub struct Plugin {
    name: String,
    pub(crate) on_install: Option<InstallFn>,
    pub(crate) on_before_build: Option<BeforeBuildFn>,
    pub(crate) on_missing_type: Option<MissingTypeFn>,
    pub(crate) on_object_definition: Option<ObjectDefinitionHookFn>,
    pub(crate) on_input_object_definition: Option<InputObjectDefinitionHookFn>,
    pub(crate) on_add_output_field: Option<AddOutputFieldFn>,
    pub(crate) on_add_input_field: Option<AddInputFieldFn>,
    pub(crate) on_add_arg: Option<AddArgFn>,
    pub(crate) on_create_field_resolver: Option<CreateFieldResolverFn>,
    pub(crate) on_create_field_subscribe: Option<CreateFieldSubscribeFn>,
    pub(crate) on_after_build: Option<AfterBuildFn>,
}

impl Plugin {
    /// Creates a plugin with no handlers.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// The plugin name, used in diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs once at plugin resolution; may register types.
    pub fn on_install(
        mut self,
        f: impl Fn(&mut BuilderLens<'_>) -> Result<(), SchemaError> + Send + Sync + 'static,
    ) -> Self {
        self.on_install = Some(Arc::new(f));
        self
    }

    /// Runs after discovery, before cycle-check and construction; may add
    /// types, re-triggering discovery.
    pub fn on_before_build(
        mut self,
        f: impl Fn(&mut BuilderLens<'_>) -> Result<(), SchemaError> + Send + Sync + 'static,
    ) -> Self {
        self.on_before_build = Some(Arc::new(f));
        self
    }

    /// Chainable fallback consulted when a referenced name has no
    /// definition; the first hook returning a replacement wins.
    pub fn on_missing_type(
        mut self,
        f: impl Fn(&str, &mut BuilderLens<'_>) -> Option<Arc<TypeSource>> + Send + Sync + 'static,
    ) -> Self {
        self.on_missing_type = Some(Arc::new(f));
        self
    }

    /// Runs right after an object type's declaration closure, before
    /// extensions and fields finalize.
    pub fn on_object_definition(
        mut self,
        f: impl Fn(&mut ObjectDefinitionBlock) -> Result<(), SchemaError> + Send + Sync + 'static,
    ) -> Self {
        self.on_object_definition = Some(Arc::new(f));
        self
    }

    /// Runs right after an input object type's declaration closure.
    pub fn on_input_object_definition(
        mut self,
        f: impl Fn(&mut InputDefinitionBlock) -> Result<(), SchemaError> + Send + Sync + 'static,
    ) -> Self {
        self.on_input_object_definition = Some(Arc::new(f));
        self
    }

    /// May replace each output field definition before it resolves.
    pub fn on_add_output_field(
        mut self,
        f: impl Fn(&OutputFieldDef) -> Option<OutputFieldDef> + Send + Sync + 'static,
    ) -> Self {
        self.on_add_output_field = Some(Arc::new(f));
        self
    }

    /// May replace each input field definition before it resolves.
    pub fn on_add_input_field(
        mut self,
        f: impl Fn(&InputValueDef) -> Option<InputValueDef> + Send + Sync + 'static,
    ) -> Self {
        self.on_add_input_field = Some(Arc::new(f));
        self
    }

    /// May replace each argument definition before it resolves.
    pub fn on_add_arg(
        mut self,
        f: impl Fn(&AddArgContext<'_>, &InputValueDef) -> Option<InputValueDef>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.on_add_arg = Some(Arc::new(f));
        self
    }

    /// May contribute middleware composed around each field resolver.
    pub fn on_create_field_resolver(
        mut self,
        f: impl Fn(&FieldResolveContext<'_>) -> Option<MiddlewareFn> + Send + Sync + 'static,
    ) -> Self {
        self.on_create_field_resolver = Some(Arc::new(f));
        self
    }

    /// May contribute middleware composed around each subscribe function.
    pub fn on_create_field_subscribe(
        mut self,
        f: impl Fn(&FieldResolveContext<'_>) -> Option<MiddlewareFn> + Send + Sync + 'static,
    ) -> Self {
        self.on_create_field_subscribe = Some(Arc::new(f));
        self
    }

    /// Runs once, given the finished schema.
    pub fn on_after_build(mut self, f: impl Fn(&Schema) + Send + Sync + 'static) -> Self {
        self.on_after_build = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut hooks = Vec::new();
        if self.on_install.is_some() {
            hooks.push("on_install");
        }
        if self.on_before_build.is_some() {
            hooks.push("on_before_build");
        }
        if self.on_missing_type.is_some() {
            hooks.push("on_missing_type");
        }
        if self.on_object_definition.is_some() {
            hooks.push("on_object_definition");
        }
        if self.on_input_object_definition.is_some() {
            hooks.push("on_input_object_definition");
        }
        if self.on_add_output_field.is_some() {
            hooks.push("on_add_output_field");
        }
        if self.on_add_input_field.is_some() {
            hooks.push("on_add_input_field");
        }
        if self.on_add_arg.is_some() {
            hooks.push("on_add_arg");
        }
        if self.on_create_field_resolver.is_some() {
            hooks.push("on_create_field_resolver");
        }
        if self.on_create_field_subscribe.is_some() {
            hooks.push("on_create_field_subscribe");
        }
        if self.on_after_build.is_some() {
            hooks.push("on_after_build");
        }
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field("hooks", &hooks)
            .finish()
    }
}

/// Composes middleware around a base resolver so that the first-registered
/// entry is outermost: its pre-logic runs first and its post-logic last.
pub fn compose_middleware(
    middleware: Vec<MiddlewareFn>,
    base: Arc<dyn Resolver>,
) -> Arc<dyn Resolver> {
    middleware.into_iter().rev().fold(base, |next, mw| {
        Arc::new(MiddlewareResolver { mw, next }) as Arc<dyn Resolver>
    })
}

struct MiddlewareResolver {
    mw: MiddlewareFn,
    next: Arc<dyn Resolver>,
}

impl Resolver for MiddlewareResolver {
    fn resolve<'a>(
        &'a self,
        parent: &'a Value,
        args: &'a ResolverArgs,
        ctx: &'a Context,
        info: &'a ResolverInfo,
    ) -> ResolverFuture<'a> {
        (self.mw)(
            parent.clone(),
            args.clone(),
            ctx.clone(),
            info.clone(),
            Arc::clone(&self.next),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::FnResolver;
    use serde_json::json;
    use std::sync::Mutex;

    fn recording_middleware(name: &'static str, log: Arc<Mutex<Vec<String>>>) -> MiddlewareFn {
        Arc::new(move |parent, args, ctx, info, next: Arc<dyn Resolver>| {
            let log = Arc::clone(&log);
            Box::pin(async move {
                log.lock().unwrap().push(format!("{name}-pre"));
                let result = next.resolve(&parent, &args, &ctx, &info).await;
                log.lock().unwrap().push(format!("{name}-post"));
                result
            })
        })
    }

    #[tokio::test]
    async fn test_first_registered_middleware_is_outermost() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let base_log = Arc::clone(&log);
        let base: Arc<dyn Resolver> = Arc::new(FnResolver::new(move |_, _, _, _| {
            base_log.lock().unwrap().push("resolve".to_string());
            Ok(json!("value"))
        }));

        let composed = compose_middleware(
            vec![
                recording_middleware("m1", Arc::clone(&log)),
                recording_middleware("m2", Arc::clone(&log)),
            ],
            base,
        );

        let parent = json!({});
        let args = ResolverArgs::new();
        let ctx = Context::new();
        let info = ResolverInfo::new("field", "Query");
        let result = composed.resolve(&parent, &args, &ctx, &info).await.unwrap();

        assert_eq!(result, json!("value"));
        assert_eq!(
            *log.lock().unwrap(),
            vec!["m1-pre", "m2-pre", "resolve", "m2-post", "m1-post"]
        );
    }

    #[tokio::test]
    async fn test_no_middleware_leaves_base_untouched() {
        let base: Arc<dyn Resolver> =
            Arc::new(FnResolver::new(|_, _, _, _| Ok(json!("plain"))));
        let composed = compose_middleware(Vec::new(), Arc::clone(&base));

        let parent = json!({});
        let args = ResolverArgs::new();
        let ctx = Context::new();
        let info = ResolverInfo::new("field", "Query");
        assert_eq!(
            composed.resolve(&parent, &args, &ctx, &info).await.unwrap(),
            json!("plain")
        );
    }

    #[test]
    fn test_plugin_debug_lists_populated_hooks() {
        let plugin = Plugin::new("auth")
            .on_install(|_| Ok(()))
            .on_create_field_resolver(|_| None);
        let debug = format!("{plugin:?}");
        assert!(debug.contains("auth"));
        assert!(debug.contains("on_install"));
        assert!(debug.contains("on_create_field_resolver"));
        assert!(!debug.contains("on_after_build"));
    }
}
