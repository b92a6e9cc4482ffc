//! JSON hydration into typed instances.
//!
//! Raw JSON nodes become [`Variant`] trees, and object nodes become
//! [`Instance`]s of registered classes by way of the runtime's
//! constructor registry. Classes self-register their type tags from
//! their `init_class` hooks, typically with [`register_class_constructor`].

use std::collections::BTreeMap;
use std::sync::Arc;

use horizon_trellis_core::class::{Class, Instance};
use horizon_trellis_core::runtime::Runtime;
use horizon_trellis_core::variant::Variant;
use serde_json::Value;

/// Convert a JSON node into a [`Variant`] tree.
///
/// Numbers that fit an `i64` become `Int`, everything else numeric
/// becomes `Float`.
pub fn json_to_variant(value: &Value) -> Variant {
    match value {
        Value::Null => Variant::Null,
        Value::Bool(b) => Variant::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Variant::Int(i),
            None => Variant::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => Variant::Text(s.clone()),
        Value::Array(items) => Variant::List(items.iter().map(json_to_variant).collect()),
        Value::Object(fields) => Variant::Map(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), json_to_variant(v)))
                .collect::<BTreeMap<_, _>>(),
        ),
    }
}

/// Convert a [`Variant`] tree back into JSON.
///
/// `Custom` payloads have no JSON form; they serialize as null with a
/// warning.
pub fn variant_to_json(value: &Variant) -> Value {
    match value {
        Variant::Null => Value::Null,
        Variant::Bool(b) => Value::Bool(*b),
        Variant::Int(i) => Value::Number((*i).into()),
        Variant::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Variant::Text(s) => Value::String(s.clone()),
        Variant::List(items) => Value::Array(items.iter().map(variant_to_json).collect()),
        Variant::Map(fields) => Value::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), variant_to_json(v)))
                .collect(),
        ),
        Variant::Custom(_) => {
            tracing::warn!(
                target: "horizon_trellis_data::json_data",
                "custom variant has no JSON form; serializing as null"
            );
            Value::Null
        }
    }
}

/// Stamp a map-shaped data node into an instance's state.
///
/// Non-map nodes are ignored with a warning; partial data is normal, so
/// fields absent from the node keep their class defaults.
pub fn hydrate_instance(instance: &Arc<Instance>, data: &Variant) {
    let Some(fields) = data.as_map() else {
        if !data.is_null() {
            tracing::warn!(
                target: "horizon_trellis_data::json_data",
                class = %instance.class().name(),
                "hydration data is not a map; skipping"
            );
        }
        return;
    };
    for (name, value) in fields {
        instance.set(name, value.clone());
    }
}

/// Register a constructor that builds and hydrates instances of `class`
/// for `tag`.
pub fn register_class_constructor(runtime: &Runtime, tag: impl Into<String>, class: Arc<Class>) {
    runtime.constructors().register(tag, move |data| {
        let instance = Instance::create(class.clone());
        hydrate_instance(&instance, data);
        Ok(instance)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use horizon_trellis_core::class::ClassBuilder;
    use horizon_trellis_core::member::MemberTable;
    use serde_json::json;

    #[test]
    fn test_json_round_trips_through_variant() {
        let source = json!({
            "id": "n1",
            "count": 3,
            "ratio": 0.5,
            "done": false,
            "tags": ["a", "b"],
            "nested": {"x": null}
        });
        let variant = json_to_variant(&source);
        assert_eq!(variant.get("count"), Some(&Variant::Int(3)));
        assert_eq!(variant.get("ratio"), Some(&Variant::Float(0.5)));
        assert_eq!(variant_to_json(&variant), source);
    }

    #[test]
    fn test_hydrate_merges_over_defaults() {
        let rt = Runtime::new();
        let class = ClassBuilder::new("Note")
            .members(
                MemberTable::new()
                    .with_data("id", Variant::Null)
                    .with_data("text", "")
                    .with_data("pinned", false),
            )
            .build(&rt)
            .unwrap();

        let note = Instance::create(class);
        hydrate_instance(&note, &json_to_variant(&json!({"id": "n1", "text": "hi"})));

        assert_eq!(note.get("id"), Variant::from("n1"));
        assert_eq!(note.get("text"), Variant::from("hi"));
        // Absent fields keep their defaults.
        assert_eq!(note.get("pinned"), Variant::from(false));
    }

    #[test]
    fn test_register_class_constructor() {
        let rt = Runtime::new();
        let class = ClassBuilder::new("Task")
            .members(MemberTable::new().with_data("id", Variant::Null))
            .build(&rt)
            .unwrap();
        register_class_constructor(&rt, "task", class);

        let built = rt
            .constructors()
            .construct("task", &json_to_variant(&json!({"id": "t9"})))
            .unwrap()
            .unwrap();
        assert_eq!(built.class().name(), "Task");
        assert_eq!(built.get("id"), Variant::from("t9"));
    }
}
