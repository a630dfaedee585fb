//! `C4`: the external value-construction contract.
//!
//! The driver never inspects a concrete value representation; it only calls
//! through this trait, staying generic over a caller-supplied value type the
//! same way a visitor interface stays generic over what it's building.
//! `tyjson-value` ships one concrete implementation (`DefaultBuilder`) for
//! callers who just want a dynamic `Value` out.

use tyjson_types::{ExpectedType, ScalarKind};

/// Whether a lexeme handed to `coerce_scalar` came from inside quotes or was
/// a bareword (`true`, `false`, `null`, a number). Scalar kinds other than
/// `String` never accept a `QuotedString` lexeme: a quoted `"true"` must not
/// coerce to `Bool`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexemeKind {
    QuotedString,
    Bareword,
}

/// Constructs typed values as the driver recognizes them.
pub trait ValueBuilder {
    type Value;
    type Error: core::fmt::Debug;

    /// Allocate a record or map instance matching `expected`.
    fn init_record_or_map(&mut self, expected: &ExpectedType) -> Result<Self::Value, Self::Error>;

    /// Allocate an array/tuple instance matching `expected`.
    fn init_array_or_tuple(&mut self, expected: &ExpectedType) -> Result<Self::Value, Self::Error>;

    /// Store `value` under `name` in `parent` (a record or map value).
    fn set_field(
        &mut self,
        parent: &mut Self::Value,
        name: &str,
        value: Self::Value,
    ) -> Result<(), Self::Error>;

    /// Store `value` at position `index` in `parent` (an array/tuple value).
    /// `closed_capacity`, when `Some`, is the declared closed-array size;
    /// surplus elements beyond it are silently dropped rather than erroring
    /// (enforced by the caller, not this method, but passed through so a
    /// builder can pre-size its backing storage).
    fn set_element(
        &mut self,
        parent: &mut Self::Value,
        index: usize,
        value: Self::Value,
        closed_capacity: Option<usize>,
    ) -> Result<(), Self::Error>;

    /// Coerce a completed lexeme into a scalar of the given kind.
    fn coerce_scalar(
        &mut self,
        lexeme: &str,
        kind: LexemeKind,
        expected: &ScalarKind,
    ) -> Result<Self::Value, Self::Error>;

    /// Coerce a completed lexeme when the expected type is `Any`: the
    /// builder must infer null/bool/number/string from the lexeme's own
    /// shape since there is no declared scalar kind to defer to.
    fn coerce_any(&mut self, lexeme: &str, kind: LexemeKind) -> Result<Self::Value, Self::Error>;
}
