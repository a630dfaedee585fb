//! Property-based tests for the parser's core invariants.
//!
//! Validates:
//! - every successful parse leaves the type context's stacks empty
//! - re-serializing an `Any`-typed value and re-parsing it is stable
//! - a record with an open rest type tolerates arbitrary extra fields
//! - a machine that just failed a parse recovers cleanly on the next call

use std::collections::BTreeMap;

use proptest::prelude::*;
use tyjson_core::{Machine, Options, SliceReader};
use tyjson_types::{ExpectedType, FieldDesc, RecordType, ScalarKind};
use tyjson_value::{DefaultBuilder, Value};

fn int_record(rest: Option<ExpectedType>) -> ExpectedType {
    let mut fields = BTreeMap::new();
    fields.insert("a".to_string(), FieldDesc::new("a", ExpectedType::Scalar(ScalarKind::Int), true));
    ExpectedType::Record(RecordType::new(fields, rest))
}

fn to_json(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(n) => n.to_string(),
        Value::Float(f) => format!("{f}"),
        Value::Decimal(d) => d.clone(),
        Value::String(s) => format!("{:?}", s),
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(to_json).collect();
            format!("[{}]", inner.join(","))
        }
        Value::Record(fields) => {
            let inner: Vec<String> = fields
                .iter()
                .map(|(k, v)| format!("{:?}:{}", k, to_json(v)))
                .collect();
            format!("{{{}}}", inner.join(","))
        }
    }
}

fn arb_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(|n| Value::Int(i64::from(n))),
        "[a-zA-Z0-9_ ]{0,12}".prop_map(Value::String),
    ]
}

fn arb_value() -> impl Strategy<Value = Value> {
    arb_scalar().prop_recursive(3, 16, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4).prop_map(Value::Record),
        ]
    })
}

proptest! {
    #[test]
    fn successful_parse_leaves_context_stacks_empty(extra_fields in prop::collection::vec("[a-z]{1,8}", 0..5)) {
        let ty = int_record(None);
        let mut input = String::from(r#"{"a":1"#);
        for (i, name) in extra_fields.iter().enumerate() {
            if name != "a" {
                input.push_str(&format!(r#","{name}":{i}"#));
            }
        }
        input.push('}');

        let mut reader = SliceReader::new(&input);
        let mut machine = Machine::new(DefaultBuilder, Options::default());
        let value = machine.parse(&mut reader, &ty).unwrap();
        prop_assert!(machine.context_is_empty());
        let Value::Record(map) = value else { panic!("expected record") };
        prop_assert_eq!(map.get("a"), Some(&Value::Int(1)));
    }

    #[test]
    fn any_typed_value_round_trips_through_reserialization(value in arb_value()) {
        let json = to_json(&value);
        let mut reader = SliceReader::new(&json);
        let mut machine = Machine::new(DefaultBuilder, Options::default());
        let reparsed = machine.parse(&mut reader, &ExpectedType::Any).unwrap();
        prop_assert_eq!(reparsed, value);
    }

    #[test]
    fn open_rest_type_tolerates_arbitrary_extra_int_fields(
        extra_names in prop::collection::vec("[a-z]{2,6}", 0..6),
        extra_values in prop::collection::vec(any::<i16>(), 0..6),
    ) {
        let ty = int_record(Some(ExpectedType::Scalar(ScalarKind::Int)));
        let mut input = String::from(r#"{"a":1"#);
        for (name, value) in extra_names.iter().zip(extra_values.iter()) {
            if name != "a" {
                input.push_str(&format!(r#","{name}":{value}"#));
            }
        }
        input.push('}');

        let mut reader = SliceReader::new(&input);
        let mut machine = Machine::new(DefaultBuilder, Options::default());
        let value = machine.parse(&mut reader, &ty).unwrap();
        let Value::Record(map) = value else { panic!("expected record") };
        prop_assert_eq!(map.get("a"), Some(&Value::Int(1)));
    }

    #[test]
    fn machine_recovers_after_an_arbitrary_failed_parse(garbage in "[^\"{}\\[\\]]{0,20}") {
        let ty = int_record(None);
        let mut machine = Machine::new(DefaultBuilder, Options::default());

        let mut bad = SliceReader::new(&garbage);
        let _ = machine.parse(&mut bad, &ty);

        let mut good = SliceReader::new(r#"{"a":7}"#);
        let value = machine.parse(&mut good, &ty).expect("machine must recover after any prior failure");
        let Value::Record(map) = value else { panic!("expected record") };
        prop_assert_eq!(map.get("a"), Some(&Value::Int(7)));
    }
}
