//! A concrete [`tyjson_core::ValueBuilder`]: JSON in, a typed-or-dynamic
//! [`Value`] out.
//!
//! The engine stays generic over how values get built; this crate is one
//! concrete answer for callers who just want a `Value` back without writing
//! their own builder.

use std::collections::BTreeMap;

use tyjson_core::{LexemeKind, ValueBuilder};
use tyjson_types::ScalarKind;

/// A materialized JSON value. Distinguishes `Int`/`Float`/`Decimal` so a
/// caller that asked for `ScalarKind::Decimal` gets the lexeme preserved
/// verbatim instead of rounded through `f64`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// A JSON number lexeme preserved verbatim, for callers that asked for
    /// `ScalarKind::Decimal` and need exact precision `f64` cannot give.
    Decimal(String),
    String(String),
    Array(Vec<Value>),
    Record(BTreeMap<String, Value>),
}

/// Failure building a [`Value`]: a lexeme could not be coerced to the
/// expected scalar kind, or the driver asked for an operation (e.g.
/// `set_field` on something that is not a record) that cannot happen for a
/// well-formed parse — the latter only signals an engine/builder mismatch,
/// never a property of the input document.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum BuildError {
    #[error("cannot coerce {lexeme:?} to {expected:?}")]
    IncompatibleScalar { lexeme: String, expected: ScalarKind },

    #[error("cannot coerce {0:?} to an `Any` value")]
    IncompatibleAny(String),

    #[error("set_field called on a non-record value")]
    NotARecord,

    #[error("set_element called on a non-array value")]
    NotAnArray,
}

/// The reference [`ValueBuilder`]. Stateless: every method operates purely
/// on its arguments, so `DefaultBuilder` is `Copy`-cheap to construct and
/// safe to share as the type parameter of a cached `tyjson_core::Machine`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultBuilder;

impl ValueBuilder for DefaultBuilder {
    type Value = Value;
    type Error = BuildError;

    fn init_record_or_map(&mut self, _expected: &tyjson_types::ExpectedType) -> Result<Value, BuildError> {
        Ok(Value::Record(BTreeMap::new()))
    }

    fn init_array_or_tuple(&mut self, _expected: &tyjson_types::ExpectedType) -> Result<Value, BuildError> {
        Ok(Value::Array(Vec::new()))
    }

    fn set_field(&mut self, parent: &mut Value, name: &str, value: Value) -> Result<(), BuildError> {
        match parent {
            Value::Record(fields) => {
                fields.insert(name.to_string(), value);
                Ok(())
            }
            _ => Err(BuildError::NotARecord),
        }
    }

    fn set_element(
        &mut self,
        parent: &mut Value,
        index: usize,
        value: Value,
        _closed_capacity: Option<usize>,
    ) -> Result<(), BuildError> {
        match parent {
            Value::Array(items) => {
                if index >= items.len() {
                    items.resize(index + 1, Value::Null);
                }
                items[index] = value;
                Ok(())
            }
            _ => Err(BuildError::NotAnArray),
        }
    }

    fn coerce_scalar(&mut self, lexeme: &str, kind: LexemeKind, expected: &ScalarKind) -> Result<Value, BuildError> {
        let incompatible = || BuildError::IncompatibleScalar {
            lexeme: lexeme.to_string(),
            expected: *expected,
        };
        match (expected, kind) {
            (ScalarKind::Null, LexemeKind::Bareword) if lexeme == "null" => Ok(Value::Null),
            (ScalarKind::Bool, LexemeKind::Bareword) => match lexeme {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(incompatible()),
            },
            (ScalarKind::Int, LexemeKind::Bareword) => lexeme.parse::<i64>().map(Value::Int).map_err(|_| incompatible()),
            (ScalarKind::Float, LexemeKind::Bareword) => lexeme.parse::<f64>().map(Value::Float).map_err(|_| incompatible()),
            (ScalarKind::Decimal, LexemeKind::Bareword) => {
                if is_json_number_lexeme(lexeme) {
                    Ok(Value::Decimal(lexeme.to_string()))
                } else {
                    Err(incompatible())
                }
            }
            (ScalarKind::String, LexemeKind::QuotedString) => Ok(Value::String(lexeme.to_string())),
            _ => Err(incompatible()),
        }
    }

    fn coerce_any(&mut self, lexeme: &str, kind: LexemeKind) -> Result<Value, BuildError> {
        match kind {
            LexemeKind::QuotedString => Ok(Value::String(lexeme.to_string())),
            LexemeKind::Bareword => match lexeme {
                "null" => Ok(Value::Null),
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ if lexeme.contains(['.', 'e', 'E']) => lexeme
                    .parse::<f64>()
                    .map(Value::Float)
                    .map_err(|_| BuildError::IncompatibleAny(lexeme.to_string())),
                _ => lexeme
                    .parse::<i64>()
                    .map(Value::Int)
                    .map_err(|_| BuildError::IncompatibleAny(lexeme.to_string())),
            },
        }
    }
}

fn is_json_number_lexeme(lexeme: &str) -> bool {
    let mut chars = lexeme.chars().peekable();
    if chars.peek() == Some(&'-') {
        chars.next();
    }
    let mut saw_digit = false;
    while chars.peek().is_some_and(char::is_ascii_digit) {
        chars.next();
        saw_digit = true;
    }
    if !saw_digit {
        return false;
    }
    if chars.peek() == Some(&'.') {
        chars.next();
        let mut saw_frac_digit = false;
        while chars.peek().is_some_and(char::is_ascii_digit) {
            chars.next();
            saw_frac_digit = true;
        }
        if !saw_frac_digit {
            return false;
        }
    }
    if matches!(chars.peek(), Some('e') | Some('E')) {
        chars.next();
        if matches!(chars.peek(), Some('+') | Some('-')) {
            chars.next();
        }
        let mut saw_exp_digit = false;
        while chars.peek().is_some_and(char::is_ascii_digit) {
            chars.next();
            saw_exp_digit = true;
        }
        if !saw_exp_digit {
            return false;
        }
    }
    chars.next().is_none()
}
