//! Integration tests exercising class composition through the public API.

use std::sync::Arc;
use std::time::Duration;

use horizon_trellis_core::class::{ClassBuilder, Instance};
use horizon_trellis_core::member::{MemberTable, MethodReturn};
use horizon_trellis_core::mixin::MixinDef;
use horizon_trellis_core::runtime::Runtime;
use horizon_trellis_core::singleton::SingletonDef;
use horizon_trellis_core::uniquify::InstanceRegistry;
use horizon_trellis_core::variant::Variant;

fn setup() -> Runtime {
    let runtime = Runtime::new();

    runtime.mixins().register(MixinDef::new(
        "identifiable",
        MemberTable::new().with_data("id", Variant::Null),
    ));
    runtime.mixins().register(
        MixinDef::new(
            "auditable",
            MemberTable::new()
                .with_data("revision", 0)
                .with_method("touch", |instance, _args| {
                    let revision = instance.get("revision").as_int().unwrap_or(0) + 1;
                    instance.set("revision", revision);
                    MethodReturn::value(revision)
                }),
        ),
    );

    runtime
}

#[test]
fn composed_class_full_lifecycle() {
    let runtime = setup();

    ClassBuilder::new("Record")
        .mixin("identifiable, auditable")
        .members(
            MemberTable::new()
                .with_data("title", "")
                .with_method("rename", |instance, args| {
                    let title = args.first().cloned().unwrap_or(Variant::Null);
                    instance.set("title", title.clone());
                    Ok(MethodReturn::Value(title))
                }),
        )
        .build(&runtime)
        .unwrap();

    let class = runtime.classes().get("Record").unwrap();
    let record = Instance::create(class);

    // State seeded from both mixins and own members.
    assert_eq!(record.get("revision"), Variant::from(0));
    assert_eq!(record.get("title"), Variant::from(""));

    record.call("rename", &["first draft".into()]).unwrap();
    record.call("touch", &[]).unwrap();
    assert_eq!(record.get("title"), Variant::from("first draft"));
    assert_eq!(record.get("revision"), Variant::from(1));
}

#[test]
fn subclass_overrides_and_reaches_back() {
    let runtime = setup();

    ClassBuilder::new("Shape")
        .members(MemberTable::new().with_method("describe", |_i, _a| {
            MethodReturn::value("a shape")
        }))
        .build(&runtime)
        .unwrap();

    let circle_class = ClassBuilder::new("Circle")
        .superclass("Shape")
        .members(MemberTable::new().with_method("describe", |instance, args| {
            let base = match instance.as_ancestor("Shape", "describe", args)? {
                MethodReturn::Value(v) => v.into_text().unwrap_or_default(),
                MethodReturn::Deferred(_) => String::new(),
            };
            MethodReturn::value(format!("{base}, specifically a circle"))
        }))
        .build(&runtime)
        .unwrap();

    let circle = Instance::create(circle_class);
    match circle.call("describe", &[]).unwrap() {
        MethodReturn::Value(v) => {
            assert_eq!(v, Variant::from("a shape, specifically a circle"));
        }
        MethodReturn::Deferred(_) => panic!("expected immediate value"),
    }
}

#[test]
fn debounced_save_coalesces_across_burst() {
    let runtime = setup();

    let class = ClassBuilder::new("Document")
        .mixin("auditable")
        .members(MemberTable::new().with_method("save", |instance, _args| {
            instance.call("touch", &[])
        }))
        .build(&runtime)
        .unwrap();

    let doc = Instance::create(class);
    let mut handles = Vec::new();
    for _ in 0..5 {
        handles.push(doc.soon_after("save", Duration::from_millis(2), vec![]));
    }
    for pair in handles.windows(2) {
        assert!(pair[0].same_handle(&pair[1]));
    }

    std::thread::sleep(Duration::from_millis(5));
    assert_eq!(doc.scheduler().process_ready(), 1);
    assert_eq!(doc.get("revision"), Variant::from(1));
    assert_eq!(handles[0].result(), Some(Ok(Variant::from(1))));
}

#[test]
fn uniquify_guards_singleton_does_not() {
    let runtime = setup();
    let registry = InstanceRegistry::new();

    let class = ClassBuilder::new("User")
        .mixin("identifiable")
        .build(&runtime)
        .unwrap();

    let alice = Instance::create(class.clone());
    alice.set("id", "alice");
    let impostor = Instance::create(class);
    impostor.set("id", "alice");

    registry.register(&alice, None).unwrap();
    assert!(registry.register(&impostor, None).is_err());

    // Singleton re-creation, by contrast, silently replaces.
    let first = runtime
        .singletons()
        .create(&runtime, SingletonDef::new("session"))
        .unwrap();
    let second = runtime
        .singletons()
        .create(&runtime, SingletonDef::new("session"))
        .unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(
        &runtime.singletons().get("session").unwrap(),
        &second
    ));
}

#[test]
fn bound_handles_survive_connection_round_trip() {
    let runtime = setup();
    let class = ClassBuilder::new("Emitter")
        .mixin("auditable")
        .build(&runtime)
        .unwrap();
    let emitter = Instance::create(class);

    let bound = emitter.bind("touch");
    let again = emitter.bind("touch");
    assert!(Arc::ptr_eq(&bound, &again));

    bound.invoke(&[]).unwrap();
    assert_eq!(emitter.get("revision"), Variant::from(1));
}
