//! Property tests for the compiled checker.

use cirrus_validate::{CompiledSchema, FieldType, FormatRegistry, Schema, Validator, ViolationKind};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

const FIELDS: [&str; 4] = ["a", "b", "c", "d"];

fn field_type() -> impl Strategy<Value = FieldType> {
    prop_oneof![
        Just(FieldType::String),
        Just(FieldType::Number),
        Just(FieldType::Integer),
        Just(FieldType::Boolean),
        Just(FieldType::Object),
        Just(FieldType::Array),
    ]
}

fn json_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i32>().prop_map(Value::from),
        (-1000.0f64..1000.0).prop_map(|f| json!(f)),
        "[ a-z0-9]{0,6}".prop_map(Value::from),
        Just(json!([1, "two"])),
        Just(json!({"nested": true})),
    ]
}

/// (type, uses nonEmptyOrBlank) per field, `None` when undescribed.
type Described = Vec<Option<(FieldType, bool)>>;

fn schema_parts() -> impl Strategy<Value = (Described, Vec<bool>)> {
    (
        prop::collection::vec(prop::option::of((field_type(), any::<bool>())), FIELDS.len()),
        prop::collection::vec(any::<bool>(), FIELDS.len()),
    )
}

fn data_object() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::vec(prop::option::of(json_value()), FIELDS.len()).prop_map(|values| {
        FIELDS
            .iter()
            .zip(values)
            .filter_map(|(name, value)| value.map(|v| ((*name).to_string(), v)))
            .collect()
    })
}

fn build_schema(described: &Described, required: &[bool]) -> Schema {
    let mut builder = Schema::builder();
    for (name, described_as) in FIELDS.iter().zip(described) {
        if let Some((field_type, formatted)) = described_as {
            builder = if *formatted && *field_type == FieldType::String {
                builder.property_with_format(*name, *field_type, "nonEmptyOrBlank")
            } else {
                builder.property(*name, *field_type)
            };
        }
    }
    for (name, is_required) in FIELDS.iter().zip(required) {
        if *is_required {
            builder = builder.required(*name);
        }
    }
    builder.build()
}

fn type_matches(field_type: FieldType, value: &Value) -> bool {
    match field_type {
        FieldType::String => value.is_string(),
        FieldType::Number => value.is_number(),
        FieldType::Integer => value.as_f64().is_some_and(|f| f.fract() == 0.0),
        FieldType::Boolean => value.is_boolean(),
        FieldType::Object => value.is_object(),
        FieldType::Array => value.is_array(),
    }
}

fn expected_valid(described: &Described, required: &[bool], data: &Map<String, Value>) -> bool {
    let required_ok = FIELDS
        .iter()
        .zip(required)
        .all(|(name, is_required)| !is_required || data.contains_key(*name));

    let properties_ok = FIELDS.iter().zip(described).all(|(name, described_as)| {
        match (described_as, data.get(*name)) {
            (Some((field_type, formatted)), Some(value)) => {
                let format_ok = !(*formatted && *field_type == FieldType::String)
                    || value.as_str().map_or(true, |s| !s.trim().is_empty());
                type_matches(*field_type, value) && format_ok
            }
            _ => true,
        }
    });

    required_ok && properties_ok
}

proptest! {
    #[test]
    fn check_is_valid_iff_every_rule_holds(
        (described, required) in schema_parts(),
        data in data_object(),
    ) {
        let schema = build_schema(&described, &required);
        let checker = CompiledSchema::compile(&schema, &FormatRegistry::default()).unwrap();
        let result = checker.check(&Value::Object(data.clone()));

        prop_assert_eq!(result.valid, expected_valid(&described, &required, &data));
        prop_assert_eq!(result.valid, result.errors.is_empty());
    }

    #[test]
    fn validate_message_lists_every_violation(
        (described, required) in schema_parts(),
        data in data_object(),
    ) {
        let schema = build_schema(&described, &required);
        let validator = Validator::new();
        let data = Value::Object(data);
        let result = validator.check(&schema, &data).unwrap();

        match validator.validate(&schema, &data) {
            Ok(()) => prop_assert!(result.valid),
            Err(err) => {
                prop_assert!(!result.valid);
                for violation in &result.errors {
                    prop_assert!(err.message().contains(&violation.message));
                }
                let missing = result.errors.iter().filter(|v| v.kind == ViolationKind::Required).count();
                prop_assert_eq!(err.message().matches("required property").count(), missing);
            }
        }
    }

    #[test]
    fn recompiling_gives_identical_results(
        (described, required) in schema_parts(),
        data in data_object(),
    ) {
        let schema = build_schema(&described, &required);
        let formats = FormatRegistry::default();
        let first = CompiledSchema::compile(&schema, &formats).unwrap();
        let second = CompiledSchema::compile(&schema.clone(), &formats).unwrap();
        let data = Value::Object(data);

        prop_assert_eq!(first.check(&data), second.check(&data));
    }
}
