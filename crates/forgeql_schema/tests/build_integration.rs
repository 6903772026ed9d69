//! Integration tests for full schema builds.

use forgeql_schema::{
    make_schema, Context, EnumMemberSource, EnumTypeDef, ExtendTypeDef, Features,
    FieldModification, FnResolver, InputObjectTypeDef, InputValueDef, InterfaceTypeDef,
    MiddlewareFn, NonNullDefaults, NonNullOverrides, ObjectTypeDef, OutputFieldDef, Plugin,
    Resolver, ResolverArgs, ResolverInfo, ScalarTypeDef, Schema, SchemaConfig, SchemaError,
    SchemaSource, TypeRefSource, TypeSource, UnionTypeDef, WrapOp,
};
use indexmap::IndexMap;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

async fn resolve_field(schema: &Schema, type_name: &str, field: &str) -> Value {
    let object = schema
        .get_type(type_name)
        .unwrap_or_else(|| panic!("type {type_name} not in schema"))
        .as_object()
        .unwrap_or_else(|| panic!("type {type_name} is not an object"));
    let field = object
        .field(field)
        .unwrap_or_else(|| panic!("field {field} not on {type_name}"));
    let parent = json!({});
    let args = ResolverArgs::new();
    let ctx = Context::new();
    let info = ResolverInfo::new(&field.name, type_name);
    field
        .resolver
        .resolve(&parent, &args, &ctx, &info)
        .await
        .unwrap()
}

fn node_interface() -> InterfaceTypeDef {
    InterfaceTypeDef::new("Node", |block| {
        block.field(
            OutputFieldDef::new("id", TypeRefSource::new("ID").non_null())
                .with_arg(InputValueDef::new("version", "Int")),
        );
        block.field(OutputFieldDef::new("createdAt", "String"));
    })
    .with_resolve_type(|value| {
        value
            .get("kind")
            .and_then(Value::as_str)
            .map(ToString::to_string)
    })
}

#[test]
fn builds_regardless_of_registration_order() {
    init_tracing();
    for flip in [false, true] {
        let author = ObjectTypeDef::new("Author", |block| {
            block.field(OutputFieldDef::new("name", "String"));
        });
        let post = ObjectTypeDef::new("Post", |block| {
            block.field(OutputFieldDef::new(
                "author",
                TypeRefSource::new("Author").non_null(),
            ));
        });
        let mut config = SchemaConfig::new();
        if flip {
            config = config.with_type(post).with_type(author);
        } else {
            config = config.with_type(author).with_type(post);
        }
        let schema = make_schema(config).unwrap();
        let post = schema.get_type("Post").unwrap().as_object().unwrap();
        let author_ty = post.field("author").unwrap().ty.named_type();
        assert_eq!(author_ty.name(), "Author");
        assert!(author_ty.as_object().is_some());
    }
}

#[test]
fn mutually_recursive_types_resolve_through_lazy_fields() {
    let schema = make_schema(
        SchemaConfig::new()
            .with_type(ObjectTypeDef::new("User", |block| {
                block.field(OutputFieldDef::new(
                    "posts",
                    TypeRefSource::new("Post").non_null().list().non_null(),
                ));
            }))
            .with_type(ObjectTypeDef::new("Post", |block| {
                block.field(OutputFieldDef::new("author", "User"));
            })),
    )
    .unwrap();

    let user = schema.get_type("User").unwrap().as_object().unwrap();
    assert_eq!(user.field("posts").unwrap().ty.to_string(), "[Post!]!");
    let post = schema.get_type("Post").unwrap().as_object().unwrap();
    assert_eq!(post.field("author").unwrap().ty.to_string(), "User");
    // Both shells point at each other through their resolved fields.
    let user_ty = post.field("author").unwrap().ty.named_type();
    assert!(Arc::ptr_eq(user_ty, schema.get_type("User").unwrap()));
}

#[test]
fn object_inherits_interface_fields_unchanged() {
    let schema = make_schema(
        SchemaConfig::new()
            .with_type(node_interface())
            .with_type(ObjectTypeDef::new("Article", |block| {
                block.implements("Node");
            })),
    )
    .unwrap();

    let article = schema.get_type("Article").unwrap().as_object().unwrap();
    assert_eq!(article.fields().len(), 2);
    let id = article.field("id").unwrap();
    assert_eq!(id.ty.to_string(), "ID!");
    assert!(id.args.contains_key("version"));
    assert_eq!(article.field("createdAt").unwrap().ty.to_string(), "String");
    assert_eq!(article.interfaces().len(), 1);
    assert_eq!(article.interfaces()[0].name(), "Node");
}

#[test]
fn modification_overrides_only_what_it_names() {
    let schema = make_schema(
        SchemaConfig::new()
            .with_type(node_interface())
            .with_type(ObjectTypeDef::new("Annotated", |block| {
                block.implements("Node");
                block.modify(FieldModification::new("id").with_description("stable identity"));
            })),
    )
    .unwrap();

    let annotated = schema.get_type("Annotated").unwrap().as_object().unwrap();
    let id = annotated.field("id").unwrap();
    assert_eq!(id.description.as_deref(), Some("stable identity"));
    assert_eq!(id.ty.to_string(), "ID!");
    assert!(id.args.contains_key("version"));

    let created_at = annotated.field("createdAt").unwrap();
    assert_eq!(created_at.ty.to_string(), "String");
    assert!(created_at.description.is_none());
}

#[test]
fn own_fields_win_over_inherited_on_collision() {
    let schema = make_schema(
        SchemaConfig::new()
            .with_type(node_interface())
            .with_type(ObjectTypeDef::new("Override", |block| {
                block.implements("Node");
                block.field(
                    OutputFieldDef::new("createdAt", TypeRefSource::new("String").non_null())
                        .with_description("own field"),
                );
            })),
    )
    .unwrap();

    let object = schema.get_type("Override").unwrap().as_object().unwrap();
    let created_at = object.field("createdAt").unwrap();
    assert_eq!(created_at.ty.to_string(), "String!");
    assert_eq!(created_at.description.as_deref(), Some("own field"));
}

#[test]
fn interface_cycle_reports_full_path() {
    let err = make_schema(
        SchemaConfig::new()
            .with_type(InterfaceTypeDef::new("A", |block| {
                block.implements("B");
            }))
            .with_type(InterfaceTypeDef::new("B", |block| {
                block.implements("A");
            })),
    )
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        "interface circular dependency detected: A -> B -> A"
    );
}

#[test]
fn interface_self_implementation_is_an_error() {
    let err = make_schema(SchemaConfig::new().with_type(InterfaceTypeDef::new(
        "Node",
        |block| {
            block.implements("Node");
        },
    )))
    .unwrap_err();
    assert_eq!(err.to_string(), "interface Node cannot implement itself");
}

#[tokio::test]
async fn missing_query_synthesizes_default_root() {
    let schema = make_schema(SchemaConfig::new().with_type(ObjectTypeDef::new(
        "Orphan",
        |block| {
            block.field(OutputFieldDef::new("name", "String"));
        },
    )))
    .unwrap();

    let query = schema.query_type().as_object().unwrap();
    assert_eq!(query.fields().len(), 1);
    let ok = query.field("ok").unwrap();
    assert_eq!(ok.ty.to_string(), "Boolean!");
    assert_eq!(resolve_field(&schema, "Query", "ok").await, json!(true));
}

#[test]
fn missing_types_are_aggregated_with_provenance() {
    let err = make_schema(
        SchemaConfig::new()
            .with_type(ObjectTypeDef::new("Query", |block| {
                block.field(OutputFieldDef::new("thing", "N1"));
            }))
            .with_type(InputObjectTypeDef::new("Filter", |block| {
                block.field(InputValueDef::new("by", "N2"));
            })),
    )
    .unwrap_err();

    let SchemaError::MissingTypes { missing } = err else {
        panic!("expected MissingTypes, got {err}");
    };
    assert_eq!(missing.len(), 2);
    assert!(missing["N1"].from_object);
    assert!(!missing["N2"].from_object);
}

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

fn middleware_plugin(name: &'static str, log: Arc<Mutex<Vec<String>>>) -> Plugin {
    let middleware = recording_middleware(name, log);
    Plugin::new(name).on_create_field_resolver(move |ctx| {
        (ctx.parent_type == "Query").then(|| Arc::clone(&middleware))
    })
}

fn logging_query(log: Arc<Mutex<Vec<String>>>) -> ObjectTypeDef {
    ObjectTypeDef::new("Query", move |block| {
        let log = Arc::clone(&log);
        block.field(
            OutputFieldDef::new("value", "String").with_resolver(FnResolver::new(
                move |_, _, _, _| {
                    log.lock().unwrap().push("R".to_string());
                    Ok(json!("result"))
                },
            )),
        );
    })
}

#[tokio::test]
async fn middleware_composes_in_registration_order() {
    init_tracing();
    let log = Arc::new(Mutex::new(Vec::new()));
    let schema = make_schema(
        SchemaConfig::new()
            .with_type(logging_query(Arc::clone(&log)))
            .with_plugin(middleware_plugin("m1", Arc::clone(&log)))
            .with_plugin(middleware_plugin("m2", Arc::clone(&log))),
    )
    .unwrap();

    assert_eq!(resolve_field(&schema, "Query", "value").await, json!("result"));
    assert_eq!(
        *log.lock().unwrap(),
        vec!["m1-pre", "m2-pre", "R", "m2-post", "m1-post"]
    );
}

#[tokio::test]
async fn without_plugins_the_user_resolver_runs_alone() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let schema = make_schema(SchemaConfig::new().with_type(logging_query(Arc::clone(&log))))
        .unwrap();

    assert_eq!(resolve_field(&schema, "Query", "value").await, json!("result"));
    assert_eq!(*log.lock().unwrap(), vec!["R"]);
}

#[test]
fn nullability_precedence_is_field_then_type_then_global() {
    let schema = make_schema(
        SchemaConfig::new()
            .with_non_null_defaults(NonNullDefaults {
                input: false,
                output: true,
            })
            .with_type(ObjectTypeDef::new("Defaults", |block| {
                block.field(OutputFieldDef::new("a", "String"));
                block.field(OutputFieldDef::new(
                    "b",
                    TypeRefSource::new("String").nullable(),
                ));
            }))
            .with_type(
                ObjectTypeDef::new("Overridden", |block| {
                    block.field(OutputFieldDef::new("c", "String"));
                    block.field(
                        OutputFieldDef::new("d", "String")
                            .with_wrapping(vec![WrapOp::NonNull]),
                    );
                })
                .with_non_null_defaults(NonNullOverrides {
                    input: None,
                    output: Some(false),
                }),
            ),
    )
    .unwrap();

    let defaults = schema.get_type("Defaults").unwrap().as_object().unwrap();
    // Global default applies to a bare reference.
    assert_eq!(defaults.field("a").unwrap().ty.to_string(), "String!");
    // An explicit marker beats the global default.
    assert_eq!(defaults.field("b").unwrap().ty.to_string(), "String");

    let overridden = schema.get_type("Overridden").unwrap().as_object().unwrap();
    // The per-type default beats the global one.
    assert_eq!(overridden.field("c").unwrap().ty.to_string(), "String");
    // An explicit field wrapping beats both defaults.
    assert_eq!(overridden.field("d").unwrap().ty.to_string(), "String!");
}

#[test]
fn numeric_backed_enum_keeps_only_forward_entries() {
    let mut mapping = IndexMap::new();
    mapping.insert("Red".to_string(), json!(0));
    mapping.insert("Green".to_string(), json!(1));
    mapping.insert("0".to_string(), json!("Red"));
    mapping.insert("1".to_string(), json!("Green"));

    let schema = make_schema(
        SchemaConfig::new()
            .with_type(EnumTypeDef::new("Color", EnumMemberSource::Mapping(mapping)))
            .with_type(ObjectTypeDef::new("Query", |block| {
                block.field(OutputFieldDef::new("color", "Color"));
            })),
    )
    .unwrap();

    let color = schema.get_type("Color").unwrap().as_enum().unwrap();
    assert_eq!(color.values.len(), 2);
}

#[test]
fn extensions_apply_once_and_orphans_become_implicit_types() {
    let schema = make_schema(
        SchemaConfig::new()
            .with_type(ObjectTypeDef::new("User", |block| {
                block.field(OutputFieldDef::new("id", TypeRefSource::new("ID").non_null()));
            }))
            .with_type(ExtendTypeDef::new("User", |block| {
                block.field(OutputFieldDef::new("email", "String"));
            }))
            .with_type(ExtendTypeDef::new("Stats", |block| {
                block.field(OutputFieldDef::new("count", "Int"));
            })),
    )
    .unwrap();

    let user = schema.get_type("User").unwrap().as_object().unwrap();
    assert_eq!(user.fields().len(), 2);
    assert!(user.field("email").is_some());

    // A target never defined elsewhere declares an implicit object type.
    let stats = schema.get_type("Stats").unwrap().as_object().unwrap();
    assert_eq!(stats.field("count").unwrap().ty.to_string(), "Int");
}

#[test]
fn extension_after_target_finalized_is_an_error() {
    // "Late" holds off until field resolution, by which point User has been
    // built and its extension queue consumed; the replacement the hook
    // returns is an extension that can no longer apply.
    let plugin = Plugin::new("late-extender").on_missing_type(|name, _lens| {
        (name == "Late").then(|| {
            Arc::new(TypeSource::ExtendObject(ExtendTypeDef::new(
                "User",
                |block| {
                    block.field(OutputFieldDef::new("smuggled", "String"));
                },
            )))
        })
    });

    let err = make_schema(
        SchemaConfig::new()
            .with_plugin(plugin)
            .with_type(ObjectTypeDef::new("User", |block| {
                block.field(OutputFieldDef::new("id", "ID"));
            }))
            .with_type(ExtendTypeDef::new("User", |block| {
                block.field(OutputFieldDef::new("email", "String"));
            }))
            .with_type(ObjectTypeDef::new("Query", |block| {
                block.field(OutputFieldDef::new("late", "Late"));
            })),
    )
    .unwrap_err();

    assert!(err.to_string().contains("after User was finalized"));
}

#[test]
fn identical_concrete_reimport_is_noop_and_clash_errors() {
    let schema = make_schema(SchemaConfig::new().with_type(ObjectTypeDef::new(
        "Post",
        |block| {
            block.field(OutputFieldDef::new("title", "String"));
        },
    )))
    .unwrap();
    let post = Arc::clone(schema.get_type("Post").unwrap());

    // Same concrete object twice: fine.
    make_schema(
        SchemaConfig::new()
            .with_type(TypeSource::Concrete(Arc::clone(&post)))
            .with_type(TypeSource::Concrete(Arc::clone(&post))),
    )
    .unwrap();

    // A different definition under the same name: rejected.
    let err = make_schema(
        SchemaConfig::new()
            .with_type(TypeSource::Concrete(post))
            .with_type(ObjectTypeDef::new("Post", |block| {
                block.field(OutputFieldDef::new("body", "String"));
            })),
    )
    .unwrap_err();
    assert!(err.to_string().contains("Post"));
    assert!(err.to_string().contains("already defined"));
}

#[test]
fn imported_schema_types_are_rewrapped_for_substitution() {
    let first = make_schema(
        SchemaConfig::new()
            .with_type(ObjectTypeDef::new("Post", |block| {
                block.field(OutputFieldDef::new("title", "String"));
            }))
            .with_type(ObjectTypeDef::new("Query", |block| {
                block.field(OutputFieldDef::new("post", "Post"));
            })),
    )
    .unwrap();
    let original_post = Arc::clone(first.get_type("Post").unwrap());

    let second = make_schema(SchemaConfig::new().with_types(SchemaSource::Schema(first))).unwrap();
    let new_post = second.get_type("Post").unwrap();
    assert!(!Arc::ptr_eq(new_post, &original_post));

    // The imported Query's field re-points at this build's Post.
    let query = second.get_type("Query").unwrap().as_object().unwrap();
    let field_post = query.field("post").unwrap().ty.named_type();
    assert!(Arc::ptr_eq(field_post, new_post));
}

#[test]
fn before_build_hook_can_add_types_retriggering_discovery() {
    let stamp: Arc<TypeSource> = Arc::new(ScalarTypeDef::new("Stamp").into());
    let plugin = Plugin::new("extra").on_before_build(move |lens| {
        let stamp = Arc::clone(&stamp);
        lens.add_type(ObjectTypeDef::new("Extra", move |block| {
            block.field(OutputFieldDef::new(
                "at",
                TypeRefSource::new(Arc::clone(&stamp)),
            ));
        }))
    });

    let schema = make_schema(SchemaConfig::new().with_plugin(plugin)).unwrap();
    assert!(schema.get_type("Extra").is_some());
    // The inline scalar reference was discovered by the re-triggered walk.
    assert!(schema.get_type("Stamp").is_some());
}

#[test]
fn missing_type_hook_supplies_replacements() {
    let plugin = Plugin::new("auto-viewer").on_missing_type(|name, _lens| {
        (name == "Viewer").then(|| {
            Arc::new(TypeSource::Object(ObjectTypeDef::new("Viewer", |block| {
                block.field(OutputFieldDef::new("id", "ID"));
            })))
        })
    });

    let schema = make_schema(
        SchemaConfig::new()
            .with_plugin(plugin)
            .with_type(ObjectTypeDef::new("Query", |block| {
                block.field(OutputFieldDef::new("viewer", "Viewer"));
            })),
    )
    .unwrap();

    let viewer = schema.get_type("Viewer").unwrap().as_object().unwrap();
    assert!(viewer.field("id").is_some());
}

#[test]
fn scalar_shorthand_is_usable_as_dynamic_method() {
    let schema = make_schema(
        SchemaConfig::new()
            .with_type(ScalarTypeDef::new("DateTime").with_shorthand("dateTime"))
            .with_type(ObjectTypeDef::new("Post", |block| {
                block
                    .invoke_dynamic("dateTime", &json!("createdAt"))
                    .unwrap();
            })),
    )
    .unwrap();

    let post = schema.get_type("Post").unwrap().as_object().unwrap();
    assert_eq!(post.field("createdAt").unwrap().ty.to_string(), "DateTime");
}

#[test]
fn union_members_must_be_object_types() {
    let err = make_schema(
        SchemaConfig::new()
            .with_type(EnumTypeDef::new(
                "Color",
                EnumMemberSource::List(vec![forgeql_schema::EnumValueDef::new("Red")]),
            ))
            .with_type(
                UnionTypeDef::new("Anything", |block| {
                    block.members(["Color"]);
                })
                .with_resolve_type(|_| None),
            ),
    )
    .unwrap_err();

    let SchemaError::TypeMismatch {
        type_name,
        expected,
        ..
    } = err
    else {
        panic!("expected TypeMismatch");
    };
    assert_eq!(type_name, "Color");
    assert_eq!(expected, "an object type");
}

#[test]
fn abstract_types_need_a_configured_strategy() {
    let searchable = || {
        vec![
            SchemaSource::from(TypeSource::from(ObjectTypeDef::new("Post", |block| {
                block.field(OutputFieldDef::new("title", "String"));
            }))),
            SchemaSource::from(TypeSource::from(ObjectTypeDef::new("Query", |block| {
                block.field(OutputFieldDef::new("search", "SearchResult"));
            }))),
        ]
    };

    // No strategy configured on the union: rejected.
    let err = make_schema(
        SchemaConfig::new()
            .with_types(searchable())
            .with_type(UnionTypeDef::new("SearchResult", |block| {
                block.members(["Post"]);
            })),
    )
    .unwrap_err();
    assert!(matches!(err, SchemaError::AbstractType(_)));
    assert!(err.to_string().contains("SearchResult"));

    // A discriminator satisfies the check.
    make_schema(
        SchemaConfig::new()
            .with_types(searchable())
            .with_type(
                UnionTypeDef::new("SearchResult", |block| {
                    block.members(["Post"]);
                })
                .with_resolve_type(|_| Some("Post".to_string())),
            ),
    )
    .unwrap();

    // The discriminant-field strategy disables the runtime check entirely.
    let mut features = Features::default();
    features.abstract_type_strategies.discriminant_field = true;
    make_schema(
        SchemaConfig::new()
            .with_features(features)
            .with_types(searchable())
            .with_type(UnionTypeDef::new("SearchResult", |block| {
                block.members(["Post"]);
            })),
    )
    .unwrap();
}

#[test]
fn query_must_be_an_object_type() {
    let err = make_schema(SchemaConfig::new().with_type(EnumTypeDef::new(
        "Query",
        EnumMemberSource::List(vec![forgeql_schema::EnumValueDef::new("A")]),
    )))
    .unwrap_err();

    let SchemaError::TypeMismatch { type_name, .. } = err else {
        panic!("expected TypeMismatch");
    };
    assert_eq!(type_name, "Query");
}

#[tokio::test]
async fn subscribe_chain_composes_like_resolvers() {
    let plugin = Plugin::new("subscription-wrapper").on_create_field_subscribe(|ctx| {
        (ctx.parent_type == "Subscription").then(|| {
            let middleware: MiddlewareFn =
                Arc::new(|parent, args, ctx, info, next: Arc<dyn Resolver>| {
                    Box::pin(async move {
                        let inner = next.resolve(&parent, &args, &ctx, &info).await?;
                        Ok(json!(format!("wrapped:{}", inner.as_str().unwrap_or(""))))
                    })
                });
            middleware
        })
    });

    let schema = make_schema(
        SchemaConfig::new()
            .with_plugin(plugin)
            .with_type(ObjectTypeDef::new("Subscription", |block| {
                block.field(
                    OutputFieldDef::new("ticks", "String")
                        .with_resolver(FnResolver::new(|parent, _, _, _| Ok(parent.clone())))
                        .with_subscribe(FnResolver::new(|_, _, _, _| Ok(json!("tick")))),
                );
            })),
    )
    .unwrap();

    let subscription = schema
        .subscription_type()
        .unwrap()
        .as_object()
        .unwrap();
    let ticks = subscription.field("ticks").unwrap();
    let subscribe = ticks.subscribe.as_ref().unwrap();

    let parent = json!({});
    let args = ResolverArgs::new();
    let ctx = Context::new();
    let info = ResolverInfo::new("ticks", "Subscription");
    let value = subscribe.resolve(&parent, &args, &ctx, &info).await.unwrap();
    assert_eq!(value, json!("wrapped:tick"));
}

#[test]
fn sequential_builds_share_no_state() {
    let build = || {
        make_schema(SchemaConfig::new().with_type(ObjectTypeDef::new("Query", |block| {
            block.field(OutputFieldDef::new("ping", "String"));
        })))
        .unwrap()
    };
    let first = build();
    let second = build();
    assert!(!Arc::ptr_eq(
        first.get_type("Query").unwrap(),
        second.get_type("Query").unwrap()
    ));
}
