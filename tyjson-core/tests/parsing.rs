//! Integration tests exercising `Machine::parse` end to end: plain `#[test]`
//! functions, deliberately tiny buffers to force the driver across several
//! chunk refills instead of asserting only against single-chunk input.

use std::collections::BTreeMap;
use std::io::Cursor;

use tyjson_core::{CharSource, Error, IoErrorKind, Machine, Options, SliceReader, Utf8Reader};
use tyjson_types::{ArrayType, ExpectedType, FieldDesc, RecordType, ScalarKind, TupleType};
use tyjson_value::{BuildError, DefaultBuilder, Value};

fn record(fields: Vec<(&str, ExpectedType, bool)>, rest: Option<ExpectedType>) -> ExpectedType {
    let mut map = BTreeMap::new();
    for (name, ty, required) in fields {
        map.insert(name.to_string(), FieldDesc::new(name, ty, required));
    }
    ExpectedType::Record(RecordType::new(map, rest))
}

fn parse_with_chunk_size(input: &str, ty: &ExpectedType, chunk_size: usize) -> Result<Value, Error<BuildError>> {
    let mut reader = SliceReader::new(input);
    let mut machine = Machine::new(
        DefaultBuilder,
        Options {
            chunk_size,
            ..Options::default()
        },
    );
    machine.parse(&mut reader, ty)
}

#[test]
fn small_chunk_size_does_not_change_the_result() {
    let ty = record(
        vec![
            ("a", ExpectedType::Scalar(ScalarKind::Int), true),
            ("b", ExpectedType::Scalar(ScalarKind::String), true),
        ],
        None,
    );
    let whole = parse_with_chunk_size(r#"{"a":1,"b":"x"}"#, &ty, 1024).unwrap();
    let chunked = parse_with_chunk_size(r#"{"a":1,"b":"x"}"#, &ty, 1).unwrap();
    assert_eq!(whole, chunked);
}

#[test]
fn string_spanning_many_chunk_refills_is_reassembled_correctly() {
    let long_value = "x".repeat(50);
    let input = format!(r#""{long_value}""#);
    let value = parse_with_chunk_size(&input, &ExpectedType::Scalar(ScalarKind::String), 3).unwrap();
    assert_eq!(value, Value::String(long_value));
}

#[test]
fn utf8_reader_decodes_multibyte_characters_from_a_byte_stream() {
    let input = "\"Ae\u{0301}\"".as_bytes().to_vec();
    let mut cursor = Cursor::new(input);
    let mut reader = Utf8Reader::new(&mut cursor);
    let mut collected = String::new();
    while let Some(ch) = reader.next_char().unwrap() {
        collected.push(ch);
    }
    assert_eq!(collected, "\"Ae\u{0301}\"");
}

#[test]
fn utf8_reader_decodes_non_ascii_text() {
    let input = "\"Ae\u{0301}\"".as_bytes().to_vec();
    let mut cursor = Cursor::new(input);
    let mut reader = Utf8Reader::new(&mut cursor);
    let mut machine = Machine::new(DefaultBuilder, Options::default());
    let value = machine
        .parse(&mut reader, &ExpectedType::Scalar(ScalarKind::String))
        .unwrap();
    assert_eq!(value, Value::String("Ae\u{0301}".to_string()));
}

#[test]
fn invalid_utf8_byte_sequence_is_an_io_error() {
    let input: Vec<u8> = vec![b'"', 0xFF, b'"'];
    let mut cursor = Cursor::new(input);
    let mut reader = Utf8Reader::new(&mut cursor);
    let mut machine = Machine::new(DefaultBuilder, Options::default());
    let err = machine
        .parse(&mut reader, &ExpectedType::Scalar(ScalarKind::String))
        .unwrap_err();
    assert!(matches!(err, Error::Io(IoErrorKind::InvalidUtf8)));
}

#[test]
fn location_points_at_the_unexpected_character() {
    let ty = record(vec![("a", ExpectedType::Scalar(ScalarKind::Int), true)], None);
    let err = parse_with_chunk_size("{\n  \"a\": 1\n  x\n}", &ty, 1024).unwrap_err();
    match err {
        Error::Syntax { at, .. } => {
            assert_eq!(at.line, 3);
        }
        other => panic!("expected a syntax error, got {other:?}"),
    }
}

#[test]
fn array_of_records_nests_correctly() {
    let element = record(
        vec![
            ("id", ExpectedType::Scalar(ScalarKind::Int), true),
            ("name", ExpectedType::Scalar(ScalarKind::String), false),
        ],
        None,
    );
    let ty = ExpectedType::Array(ArrayType::open(element));
    let value = parse_with_chunk_size(r#"[{"id":1,"name":"a"},{"id":2}]"#, &ty, 5).unwrap();
    let Value::Array(items) = value else { panic!("expected array") };
    assert_eq!(items.len(), 2);
    let Value::Record(first) = &items[0] else { panic!("expected record") };
    assert_eq!(first["id"], Value::Int(1));
}

#[test]
fn union_of_scalars_picks_the_first_matching_member() {
    let ty = record(
        vec![("a", ExpectedType::Union(vec![
            ExpectedType::Scalar(ScalarKind::Int),
            ExpectedType::Scalar(ScalarKind::String),
        ]), true)],
        None,
    );
    let value = parse_with_chunk_size(r#"{"a":1}"#, &ty, 1024).unwrap();
    let Value::Record(map) = value else { panic!("expected record") };
    assert_eq!(map["a"], Value::Int(1));

    let value = parse_with_chunk_size(r#"{"a":"hi"}"#, &ty, 1024).unwrap();
    let Value::Record(map) = value else { panic!("expected record") };
    assert_eq!(map["a"], Value::String("hi".to_string()));
}

#[test]
fn union_with_a_record_member_is_unsupported() {
    let inner = record(vec![], None);
    let ty = record(
        vec![("a", ExpectedType::Union(vec![inner, ExpectedType::Scalar(ScalarKind::String)]), true)],
        None,
    );
    let err = parse_with_chunk_size(r#"{"a":"hi"}"#, &ty, 1024).unwrap_err();
    assert!(matches!(err, Error::UnsupportedType));
}

#[test]
fn tuple_open_position_falls_back_to_rest_type() {
    let ty = ExpectedType::Tuple(TupleType::new(
        vec![ExpectedType::Scalar(ScalarKind::Int)],
        Some(ExpectedType::Scalar(ScalarKind::String)),
    ));
    let value = parse_with_chunk_size(r#"[1,"a","b"]"#, &ty, 1024).unwrap();
    let Value::Array(items) = value else { panic!("expected array") };
    assert_eq!(items, vec![Value::Int(1), Value::String("a".to_string()), Value::String("b".to_string())]);
}

#[test]
fn unicode_escape_decodes_bmp_character() {
    let value = parse_with_chunk_size(r#""café""#, &ExpectedType::Scalar(ScalarKind::String), 1024).unwrap();
    assert_eq!(value, Value::String("café".to_string()));
}

#[test]
fn whitespace_led_root_scalar_parses() {
    let value = parse_with_chunk_size("  \n  true  ", &ExpectedType::Scalar(ScalarKind::Bool), 1024).unwrap();
    assert_eq!(value, Value::Bool(true));
}
